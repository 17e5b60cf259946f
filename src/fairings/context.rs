use rocket::{fairing::{Fairing, Info, Kind}, Data, Request};

use rocket::serde::json::serde_json;
use crate::guards::auth::CurrentUser;
use crate::csrf::CsrfToken;

/// コンテキストプロセッサとしてのFairing。
/// リクエスト処理前に共通データ（ユーザー、CSRFトークン）を取得・キャッシュします。
pub struct ContextFairing;

#[rocket::async_trait]
impl Fairing for ContextFairing {
    fn info(&self) -> Info {
        Info {
            name: "Global Context Processor",
            kind: Kind::Request,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _data: &mut Data<'_>) {
        // 1. User Context
        // CurrentUser ガード自体がリクエスト単位でキャッシュするため、
        // 後続のハンドラのガードはDBを再度引かない
        if let rocket::outcome::Outcome::Success(CurrentUser::Authenticated(user)) =
            request.guard::<CurrentUser>().await
        {
            if let Ok(user_json) = serde_json::to_value(&user) {
                request.local_cache(|| Some(CachedUser(user_json)));
            }
        }

        // 2. CSRF Context
        if let rocket::outcome::Outcome::Success(csrf) = request.guard::<CsrfToken>().await {
            let token_str = csrf.token().to_string();
            request.local_cache(|| Some(CachedCsrf(token_str)));
        }
    }
}

// キャッシュ用の型
#[derive(Clone)]
pub struct CachedUser(pub serde_json::Value);

#[derive(Clone)]
pub struct CachedCsrf(pub String);
