use rocket::form::Form;
use rocket::request::FlashMessage;
use rocket::State;
use rocket_dyn_templates::context;
use sea_orm::*;
use serde::Serialize;

use crate::controllers::auth::CSRF_FAILED;
use crate::controllers::{flash_redirect, recover_todo_error, PageResponse, PageResult, LISTING_URL};
use crate::csrf::CsrfToken;
use crate::entities::todo::{self, TodoStatus};
use crate::errors::AppError;
use crate::guards::auth::AuthenticatedUser;
use crate::services::todo_service::{StatusFilter, TodoDraft, TodoService};
use crate::validation::{FieldErrors, TodoInput};
use crate::views::app_template::{AppTemplate, FlashContext};

/// TODOフォームのデータ構造
/// Djangoの `forms.ModelForm` に相当
#[derive(FromForm)]
pub struct TodoForm<'r> {
    #[field(default = "")]
    pub title: &'r str,
    #[field(default = "")]
    pub description: &'r str,
    #[field(default = "")]
    pub status: &'r str,
    #[field(default = "")]
    pub csrf_token: &'r str,
}

/// `<select>` の選択肢
#[derive(Serialize)]
struct StatusChoice {
    value: &'static str,
    label: &'static str,
}

fn status_choices() -> Vec<StatusChoice> {
    TodoStatus::iter()
        .map(|status| StatusChoice {
            value: status.as_str(),
            label: status.label(),
        })
        .collect()
}

/// フォームの表示内容
#[derive(Serialize)]
struct FormValues<'a> {
    title: &'a str,
    description: &'a str,
    status: &'a str,
}

impl<'a> From<&'a todo::Model> for FormValues<'a> {
    fn from(model: &'a todo::Model) -> Self {
        FormValues {
            title: &model.title,
            description: model.description.as_deref().unwrap_or(""),
            status: model.status.as_str(),
        }
    }
}

fn form_page(heading: &str, action: String, values: FormValues<'_>, errors: &FieldErrors) -> AppTemplate {
    AppTemplate::new("todo/form", context! {
        title: heading,
        action: action,
        form: values,
        errors: errors,
        status_choices: status_choices(),
    })
}

/// TODO一覧を表示。
/// Djangoの `ListView` に相当します。
#[get("/todos?<status>")]
pub async fn list_todos(
    db: &State<DatabaseConnection>,
    auth: AuthenticatedUser,
    status: Option<String>,
    flash: Option<FlashMessage<'_>>,
) -> Result<AppTemplate, AppError> {
    let filter = StatusFilter::from_param(status.as_deref());
    let (todos, stats) = TodoService::list(db.inner(), &auth.user, filter).await?;

    Ok(AppTemplate::new("todo/list", context! {
        title: "My Todos",
        todos: todos,
        stats: stats,
        current_filter: filter.as_str(),
        status_choices: status_choices(),
        flash: FlashContext::from_flash(flash),
    }))
}

/// TODO作成フォーム (GET)
#[get("/todo/add")]
pub fn add_todo_form(_auth: AuthenticatedUser) -> AppTemplate {
    let values = FormValues {
        title: "",
        description: "",
        status: TodoStatus::default().as_str(),
    };
    form_page("Add New Todo", "/todo/add".to_string(), values, &FieldErrors::new())
}

/// TODO作成処理 (POST)
#[post("/todo/add", data = "<form>")]
pub async fn add_todo(
    db: &State<DatabaseConnection>,
    auth: AuthenticatedUser,
    csrf: CsrfToken,
    form: Form<TodoForm<'_>>,
) -> PageResult {
    let action = "/todo/add".to_string();
    let values = FormValues {
        title: form.title,
        description: form.description,
        status: form.status,
    };

    if !csrf.verify(form.csrf_token) {
        tracing::warn!(user_id = auth.user.id, "csrf verification failed on add_todo");
        let errors = FieldErrors::single("csrf_token", CSRF_FAILED);
        return Ok(PageResponse::Page(form_page("Add New Todo", action, values, &errors)));
    }

    let input = TodoInput::new(form.title, form.description, form.status);
    if let Err(errors) = input.validate_form() {
        return Ok(PageResponse::Page(form_page("Add New Todo", action, values, &errors)));
    }

    let draft = TodoDraft {
        title: &input.title,
        description: input.description.as_deref(),
        status: input.parsed_status(),
    };

    match TodoService::create(db.inner(), &auth.user, draft).await {
        Ok(_) => Ok(flash_redirect(LISTING_URL, "success", "Todo added successfully!")),
        Err(AppError::Validation(errors)) => {
            Ok(PageResponse::Page(form_page("Add New Todo", action, values, &errors)))
        }
        Err(e) => Err(e),
    }
}

/// TODO編集フォーム (GET)
#[get("/todo/edit/<id>")]
pub async fn edit_todo_form(
    db: &State<DatabaseConnection>,
    auth: AuthenticatedUser,
    id: i32,
) -> PageResult {
    let existing = match TodoService::get_owned(db.inner(), id, &auth.user).await {
        Ok(todo) => todo,
        Err(e) => return recover_todo_error(e),
    };

    Ok(PageResponse::Page(form_page(
        "Edit Todo",
        format!("/todo/edit/{}", id),
        FormValues::from(&existing),
        &FieldErrors::new(),
    )))
}

/// TODO編集処理 (POST)
#[post("/todo/edit/<id>", data = "<form>")]
pub async fn edit_todo(
    db: &State<DatabaseConnection>,
    auth: AuthenticatedUser,
    csrf: CsrfToken,
    id: i32,
    form: Form<TodoForm<'_>>,
) -> PageResult {
    // 他人のTODOにはフォームの再表示すら行わない
    if let Err(e) = TodoService::get_owned(db.inner(), id, &auth.user).await {
        return recover_todo_error(e);
    }

    let action = format!("/todo/edit/{}", id);
    let values = FormValues {
        title: form.title,
        description: form.description,
        status: form.status,
    };

    if !csrf.verify(form.csrf_token) {
        tracing::warn!(user_id = auth.user.id, todo_id = id, "csrf verification failed on edit_todo");
        let errors = FieldErrors::single("csrf_token", CSRF_FAILED);
        return Ok(PageResponse::Page(form_page("Edit Todo", action, values, &errors)));
    }

    let input = TodoInput::new(form.title, form.description, form.status);
    if let Err(errors) = input.validate_form() {
        return Ok(PageResponse::Page(form_page("Edit Todo", action, values, &errors)));
    }

    let draft = TodoDraft {
        title: &input.title,
        description: input.description.as_deref(),
        status: input.parsed_status(),
    };

    match TodoService::update(db.inner(), id, &auth.user, draft).await {
        Ok(_) => Ok(flash_redirect(LISTING_URL, "success", "Todo updated successfully!")),
        Err(AppError::Validation(errors)) => {
            Ok(PageResponse::Page(form_page("Edit Todo", action, values, &errors)))
        }
        Err(e) => recover_todo_error(e),
    }
}

/// TODO削除処理
#[get("/todo/delete/<id>")]
pub async fn delete_todo(
    db: &State<DatabaseConnection>,
    auth: AuthenticatedUser,
    id: i32,
) -> PageResult {
    match TodoService::delete(db.inner(), id, &auth.user).await {
        Ok(()) => Ok(flash_redirect(LISTING_URL, "success", "Todo deleted successfully!")),
        Err(e) => recover_todo_error(e),
    }
}

/// ステータスのみの変更 (一覧画面のクイック操作用)
#[get("/todo/status/<id>/<status>")]
pub async fn update_status(
    db: &State<DatabaseConnection>,
    auth: AuthenticatedUser,
    id: i32,
    status: &str,
) -> PageResult {
    match TodoService::update_status_only(db.inner(), id, &auth.user, status).await {
        Ok(updated) => Ok(flash_redirect(
            LISTING_URL,
            "success",
            format!("Status updated to {}!", updated.status.label()),
        )),
        Err(e) => recover_todo_error(e),
    }
}
