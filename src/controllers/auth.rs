use rocket::form::Form;
use rocket::http::CookieJar;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::{Request, State};
use rocket_dyn_templates::context;
use sea_orm::DatabaseConnection;

use crate::config::Settings;
use crate::controllers::{flash_redirect, PageResponse, PageResult, LISTING_URL, LOGIN_URL};
use crate::csrf::CsrfToken;
use crate::errors::AppError;
use crate::guards::auth::{AuthenticatedUser, CurrentUser};
use crate::services::user_service::UserService;
use crate::session::{remove_session_cookie, session_cookie_token, set_session_cookie, SessionService};
use crate::validation::{FieldErrors, LoginInput, RegistrationInput};
use crate::views::app_template::{AppTemplate, FlashContext};

pub const CSRF_FAILED: &str = "CSRF verification failed.";

#[derive(FromForm)]
pub struct RegisterForm<'r> {
    #[field(default = "")]
    pub username: &'r str,
    #[field(default = "")]
    pub email: &'r str,
    #[field(default = "")]
    pub password: &'r str,
    #[field(default = "")]
    pub confirm_password: &'r str,
    #[field(default = "")]
    pub csrf_token: &'r str,
}

#[derive(FromForm)]
pub struct LoginForm<'r> {
    #[field(default = "")]
    pub email: &'r str,
    #[field(default = "")]
    pub password: &'r str,
    #[field(default = "")]
    pub csrf_token: &'r str,
}

/// ログイン後の遷移先。
/// 同一サイト内の絶対パスのみ許可し、それ以外は一覧へ (オープンリダイレクト対策)。
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => LISTING_URL.to_string(),
    }
}

fn register_page(username: &str, email: &str, errors: &FieldErrors) -> AppTemplate {
    AppTemplate::new("auth/register", context! {
        title: "Register",
        form: context! { username: username, email: email },
        errors: errors,
    })
}

fn login_page(email: &str, next: Option<&str>, errors: &FieldErrors, flash: Option<FlashContext>) -> AppTemplate {
    AppTemplate::new("auth/login", context! {
        title: "Login",
        form: context! { email: email },
        next: next,
        errors: errors,
        flash: flash,
    })
}

/// 登録画面 (GET)
#[get("/register")]
pub fn register_form(current: CurrentUser) -> PageResponse {
    if current.is_authenticated() {
        return PageResponse::Redirect(Redirect::to(LISTING_URL));
    }
    PageResponse::Page(register_page("", "", &FieldErrors::new()))
}

/// ユーザー登録処理 (POST)
#[post("/register", data = "<form>")]
pub async fn register(
    db: &State<DatabaseConnection>,
    current: CurrentUser,
    csrf: CsrfToken,
    form: Form<RegisterForm<'_>>,
) -> PageResult {
    if current.is_authenticated() {
        return Ok(PageResponse::Redirect(Redirect::to(LISTING_URL)));
    }

    let input = RegistrationInput::new(form.username, form.email, form.password, form.confirm_password);

    if !csrf.verify(form.csrf_token) {
        tracing::warn!("csrf verification failed on register");
        let errors = FieldErrors::single("csrf_token", CSRF_FAILED);
        return Ok(PageResponse::Page(register_page(&input.username, &input.email, &errors)));
    }

    if let Err(errors) = input.validate_form() {
        return Ok(PageResponse::Page(register_page(&input.username, &input.email, &errors)));
    }

    match UserService::register(db.inner(), &input.username, &input.email, &input.password).await {
        Ok(_) => Ok(flash_redirect(LOGIN_URL, "success", "Registration successful! Please login.")),
        Err(AppError::Duplicate(errors)) | Err(AppError::Validation(errors)) => {
            Ok(PageResponse::Page(register_page(&input.username, &input.email, &errors)))
        }
        Err(e) => Err(e),
    }
}

/// ログイン画面 (GET)
#[get("/login?<next>")]
pub fn login_form(current: CurrentUser, next: Option<String>, flash: Option<FlashMessage<'_>>) -> PageResponse {
    if current.is_authenticated() {
        return PageResponse::Redirect(Redirect::to(LISTING_URL));
    }
    PageResponse::Page(login_page("", next.as_deref(), &FieldErrors::new(), FlashContext::from_flash(flash)))
}

/// ログイン処理を行うビュー。
/// Djangoの `LoginView` に相当します。
#[allow(clippy::too_many_arguments)]
#[post("/login?<next>", data = "<form>")]
pub async fn login(
    db: &State<DatabaseConnection>,
    settings: &State<Settings>,
    current: CurrentUser,
    csrf: CsrfToken,
    cookies: &CookieJar<'_>,
    next: Option<String>,
    form: Form<LoginForm<'_>>,
) -> PageResult {
    let next = next.as_deref();
    if current.is_authenticated() {
        return Ok(PageResponse::Redirect(Redirect::to(LISTING_URL)));
    }

    let input = LoginInput::new(form.email, form.password);

    if !csrf.verify(form.csrf_token) {
        tracing::warn!("csrf verification failed on login");
        let errors = FieldErrors::single("csrf_token", CSRF_FAILED);
        return Ok(PageResponse::Page(login_page(&input.email, next, &errors, None)));
    }

    if let Err(errors) = input.validate_form() {
        return Ok(PageResponse::Page(login_page(&input.email, next, &errors, None)));
    }

    let Some(user) = UserService::authenticate(db.inner(), &input.email, &input.password).await? else {
        tracing::info!("failed login attempt");
        let flash = FlashContext {
            kind: "danger".to_string(),
            message: "Invalid email or password!".to_string(),
        };
        return Ok(PageResponse::Page(login_page(&input.email, next, &FieldErrors::new(), Some(flash))));
    };

    // セッション開始 (Djangoの login(request, user) に相当)
    let ttl = settings.session_ttl();
    let token = SessionService::start_session(db.inner(), &user, ttl).await?;
    set_session_cookie(cookies, token, ttl);

    tracing::info!(user_id = user.id, "user logged in");
    Ok(flash_redirect(
        safe_next(next),
        "success",
        format!("Welcome back, {}!", user.username),
    ))
}

/// ログアウト処理。
/// Djangoの `LogoutView` に相当します。
#[get("/logout")]
pub async fn logout(
    db: &State<DatabaseConnection>,
    auth: AuthenticatedUser,
    cookies: &CookieJar<'_>,
) -> Result<Flash<Redirect>, AppError> {
    if let Some(token) = session_cookie_token(cookies) {
        SessionService::end_session(db.inner(), &token).await?;
    }
    remove_session_cookie(cookies);

    tracing::info!(user_id = auth.user.id, "user logged out");
    Ok(Flash::new(Redirect::to(LOGIN_URL), "info", "You have been logged out."))
}

/// 未ログインで保護されたページにアクセスした場合の処理。
/// Djangoの `LOGIN_URL` + `?next=` リダイレクトに相当します。
#[catch(401)]
pub fn unauthorized(request: &Request<'_>) -> Flash<Redirect> {
    let next = request.uri().to_string();
    Flash::warning(
        Redirect::to(uri!(login_form(next = Some(next.as_str())))),
        "Please log in to access this page.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_accepts_local_paths() {
        assert_eq!(safe_next(Some("/todo/add")), "/todo/add");
        assert_eq!(safe_next(Some("/todos?status=complete")), "/todos?status=complete");
    }

    #[test]
    fn test_safe_next_rejects_external_targets() {
        assert_eq!(safe_next(None), LISTING_URL);
        assert_eq!(safe_next(Some("")), LISTING_URL);
        assert_eq!(safe_next(Some("https://evil.example")), LISTING_URL);
        assert_eq!(safe_next(Some("//evil.example")), LISTING_URL);
        assert_eq!(safe_next(Some("/\\evil.example")), LISTING_URL);
    }
}
