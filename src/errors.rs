use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::Request;
use sea_orm::DbErr;
use std::io::Cursor;

use crate::validation::FieldErrors;

/// アプリケーション全体で使用するエラー型。
/// Djangoの例外クラス (ValidationError, PermissionDenied, Http404 等) に相当します。
///
/// `Database` / `Internal` 以外はすべてユーザー側で回復可能なエラーで、
/// コントローラーでフォーム再表示かフラッシュ付きリダイレクトに変換されます。
#[derive(Debug)]
pub enum AppError {
    /// 入力値エラー (フィールド単位)
    Validation(FieldErrors),
    /// ユーザー名/メールアドレスの重複
    Duplicate(FieldErrors),
    /// リソースが見つからない (404 Not Found)
    NotFound,
    /// 他人のリソースへのアクセス (403 Forbidden)
    Forbidden,
    /// 未知のステータス値
    InvalidStatus(String),
    /// データベースエラー
    Database(DbErr),
    /// 内部エラー (500 Internal Server Error)
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> Status {
        match self {
            AppError::Validation(_) | AppError::InvalidStatus(_) => Status::BadRequest,
            AppError::Duplicate(_) => Status::Conflict,
            AppError::NotFound => Status::NotFound,
            AppError::Forbidden => Status::Forbidden,
            AppError::Database(_) | AppError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let message = match &self {
            AppError::Validation(errors) | AppError::Duplicate(errors) => errors.messages().join(", "),
            AppError::NotFound => "Not Found".to_string(),
            AppError::Forbidden => "Access denied!".to_string(),
            AppError::InvalidStatus(_) => "Invalid status!".to_string(),
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "Database Error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "Internal Server Error".to_string()
            }
        };

        Response::build()
            .status(status)
            .sized_body(message.len(), Cursor::new(message))
            .ok()
    }
}

impl From<DbErr> for AppError {
    fn from(e: DbErr) -> Self {
        AppError::Database(e)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(errors) => write!(f, "Validation error: {}", errors.messages().join(", ")),
            AppError::Duplicate(errors) => write!(f, "Duplicate: {}", errors.messages().join(", ")),
            AppError::NotFound => write!(f, "Not found"),
            AppError::Forbidden => write!(f, "Forbidden"),
            AppError::InvalidStatus(value) => write!(f, "Invalid status: {}", value),
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
