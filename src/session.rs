use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use rand::Rng;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::time;
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::*;

use crate::entities::{prelude::*, session, user};
use crate::errors::AppError;

/// セッショントークンを保持する private cookie の名前
pub const SESSION_COOKIE: &str = "session_token";

/// 32バイトの乱数をURLセーフなbase64にしたトークン (43文字)
pub fn generate_token() -> String {
    let random_bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// サーバー側セッションの管理。
/// Djangoの `django.contrib.sessions` + `login()` / `logout()` に相当します。
pub struct SessionService;

impl SessionService {
    /// ユーザーのセッションを開始し、トークンを返します。
    pub async fn start_session(
        db: &DatabaseConnection,
        user: &user::Model,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let token = generate_token();
        let now = Utc::now();

        // 期限切れの行はクッキー側でも失効済みで二度と送られてこないため、ここで掃除する
        let purged = Session::delete_many()
            .filter(session::Column::ExpiresAt.lte(DateTimeWithTimeZone::from(now)))
            .exec(db)
            .await?;
        if purged.rows_affected > 0 {
            tracing::debug!(removed = purged.rows_affected, "purged expired sessions");
        }

        let new_session = session::ActiveModel {
            token: Set(token.clone()),
            user_id: Set(user.id),
            created_at: Set(now.into()),
            expires_at: Set((now + ttl).into()),
            ..Default::default()
        };
        new_session.insert(db).await?;

        tracing::info!(user_id = user.id, "session started");
        Ok(token)
    }

    /// トークンからユーザーを解決します。
    /// 未知・期限切れのトークンは `None` (期限切れの行はこの時点で削除)。
    pub async fn resolve(db: &DatabaseConnection, token: &str) -> Result<Option<user::Model>, AppError> {
        let found = Session::find()
            .filter(session::Column::Token.eq(token))
            .find_also_related(User)
            .one(db)
            .await?;

        let Some((found_session, user)) = found else {
            return Ok(None);
        };

        if found_session.expires_at <= Utc::now() {
            tracing::debug!(user_id = found_session.user_id, "session expired");
            found_session.delete(db).await?;
            return Ok(None);
        }

        Ok(user)
    }

    /// セッションを失効させます。以後同じトークンは解決されません。
    pub async fn end_session(db: &DatabaseConnection, token: &str) -> Result<(), AppError> {
        let result = Session::delete_many()
            .filter(session::Column::Token.eq(token))
            .exec(db)
            .await?;
        tracing::info!(removed = result.rows_affected, "session ended");
        Ok(())
    }
}

/// セッションクッキーをセットします (暗号化 + 署名された private cookie)。
pub fn set_session_cookie(cookies: &CookieJar<'_>, token: String, ttl: Duration) {
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(ttl.num_seconds()));
    cookies.add_private(cookie);
}

pub fn session_cookie_token(cookies: &CookieJar<'_>) -> Option<String> {
    cookies
        .get_private(SESSION_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|token| !token.is_empty())
}

pub fn remove_session_cookie(cookies: &CookieJar<'_>) {
    cookies.remove_private(Cookie::build(SESSION_COOKIE).path("/"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation() {
        let token1 = generate_token();
        let token2 = generate_token();

        assert_ne!(token1, token2);
        assert_eq!(token1.len(), 43);
        assert!(token1.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
