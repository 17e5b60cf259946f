use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use sea_orm::DatabaseConnection;

use crate::entities::user;
use crate::session::{session_cookie_token, SessionService};

/// リクエストを送ってきたユーザー。
/// Djangoの `request.user` (AnonymousUser を含む) に相当します。
///
/// 解決結果はリクエスト単位でキャッシュされるので、同じリクエスト内で
/// 何度ガードを通してもDB問い合わせは1回です。
#[derive(Debug, Clone)]
pub enum CurrentUser {
    Authenticated(user::Model),
    Anonymous,
}

impl CurrentUser {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, CurrentUser::Authenticated(_))
    }
}

/// DBエラー時のみ `None`
async fn resolve_identity(request: &Request<'_>) -> Option<CurrentUser> {
    let db = request.guard::<&State<DatabaseConnection>>().await.succeeded()?;

    let Some(token) = session_cookie_token(request.cookies()) else {
        return Some(CurrentUser::Anonymous);
    };

    match SessionService::resolve(db.inner(), &token).await {
        Ok(Some(user)) => Some(CurrentUser::Authenticated(user)),
        Ok(None) => Some(CurrentUser::Anonymous),
        Err(e) => {
            tracing::error!(error = %e, "failed to resolve session");
            None
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request.local_cache_async(resolve_identity(request)).await {
            Some(current) => Outcome::Success(current.clone()),
            None => Outcome::Error((Status::InternalServerError, ())),
        }
    }
}

/// 認証済みユーザーを表すリクエストガード。
/// Djangoの `@login_required` に相当し、ビューの引数に含めるだけで自動的に認証チェックが行われます。
/// 未ログインの場合は 401 となり、catcher がログイン画面へリダイレクトします。
pub struct AuthenticatedUser {
    pub user: user::Model,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match CurrentUser::from_request(request).await {
            Outcome::Success(CurrentUser::Authenticated(user)) => {
                Outcome::Success(AuthenticatedUser { user })
            }
            Outcome::Success(CurrentUser::Anonymous) => Outcome::Error((Status::Unauthorized, ())),
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(status) => Outcome::Forward(status),
        }
    }
}
