use rocket::response::{Flash, Redirect};

use crate::errors::AppError;
use crate::views::app_template::AppTemplate;

pub mod auth;
pub mod home;
pub mod todo;

/// ハンドラの正常系レスポンス。
/// フォーム再表示 / リダイレクト / フラッシュ付きリダイレクトのいずれか。
/// 致命的なエラー（DB障害など）は `AppError` として 500 になります。
#[derive(Responder)]
pub enum PageResponse {
    Page(AppTemplate),
    Redirect(Redirect),
    Flash(Flash<Redirect>),
}

pub type PageResult = Result<PageResponse, AppError>;

pub const LISTING_URL: &str = "/todos";
pub const LOGIN_URL: &str = "/login";

/// Flaskの `flash(message, category)` + `redirect()` に相当
pub fn flash_redirect(to: impl Into<String>, kind: &str, message: impl Into<String>) -> PageResponse {
    let to: String = to.into();
    PageResponse::Flash(Flash::new(Redirect::to(to), kind, message.into()))
}

/// TODO操作で回復可能なエラーを一覧へのフラッシュ付きリダイレクトに変換します。
/// 存在しないIDはそのまま 404 (Djangoの `get_object_or_404` 相当)。
pub fn recover_todo_error(err: AppError) -> PageResult {
    match err {
        AppError::Forbidden => Ok(flash_redirect(LISTING_URL, "danger", "Access denied!")),
        AppError::InvalidStatus(_) => Ok(flash_redirect(LISTING_URL, "danger", "Invalid status!")),
        other => Err(other),
    }
}
