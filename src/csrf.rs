use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::Rng;
use rocket::http::{Cookie, SameSite};
use rocket::request::{FromRequest, Outcome, Request};

/// CSRFトークンを保持するクッキー名
pub const CSRF_COOKIE: &str = "csrf_token";

/// CSRFトークンの有効期限（秒）
const CSRF_TOKEN_EXPIRY: i64 = 3600; // 1時間

/// CSRFトークン。
/// Djangoの {% csrf_token %} に相当します。
/// クッキーとフォームの hidden フィールドに同じ値を置く double-submit 方式です。
#[derive(Debug, Clone)]
pub struct CsrfToken(pub String);

impl CsrfToken {
    /// 新しいCSRFトークンを生成します。
    pub fn generate() -> Self {
        Self::generate_at(Utc::now().timestamp())
    }

    fn generate_at(timestamp: i64) -> Self {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();

        // 先頭8バイトに発行時刻を含めて有効期限を管理
        let mut token_data = timestamp.to_be_bytes().to_vec();
        token_data.extend_from_slice(&random_bytes);

        CsrfToken(URL_SAFE_NO_PAD.encode(&token_data))
    }

    fn issued_at(&self) -> Option<i64> {
        let decoded = URL_SAFE_NO_PAD.decode(&self.0).ok()?;
        let timestamp_bytes: [u8; 8] = decoded.get(..8)?.try_into().ok()?;
        Some(i64::from_be_bytes(timestamp_bytes))
    }

    pub fn is_expired(&self) -> bool {
        match self.issued_at() {
            Some(issued) => Utc::now().timestamp() - issued >= CSRF_TOKEN_EXPIRY,
            None => true,
        }
    }

    /// 送信されたトークンを検証します。
    pub fn verify(&self, submitted: &str) -> bool {
        !submitted.is_empty() && self.0 == submitted && !self.is_expired()
    }

    /// トークン文字列を取得
    pub fn token(&self) -> &str {
        &self.0
    }
}

/// リクエストからCSRFトークンを取得するガード。
/// Cookieの有効なトークンを使い、なければ（または期限切れなら）新規生成します。
/// 結果はリクエスト単位でキャッシュされ、fairing とハンドラで同じ値になります。
#[rocket::async_trait]
impl<'r> FromRequest<'r> for CsrfToken {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = request.local_cache(|| {
            let cookies = request.cookies();

            let existing = cookies
                .get(CSRF_COOKIE)
                .map(|cookie| CsrfToken(cookie.value().to_string()))
                .filter(|token| !token.is_expired());

            match existing {
                Some(token) => token,
                None => {
                    let new_token = CsrfToken::generate();

                    let cookie = Cookie::build((CSRF_COOKIE, new_token.0.clone()))
                        .path("/")
                        .same_site(SameSite::Strict)
                        .http_only(true);

                    cookies.add(cookie);
                    new_token
                }
            }
        });

        Outcome::Success(token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csrf_token_generation() {
        let token1 = CsrfToken::generate();
        let token2 = CsrfToken::generate();

        // 異なるトークンが生成される
        assert_ne!(token1.0, token2.0);

        // トークンは空でない
        assert!(!token1.0.is_empty());
    }

    #[test]
    fn test_csrf_token_verification() {
        let token = CsrfToken::generate();
        let token_string = token.0.clone();

        // 正しいトークンは検証成功
        assert!(token.verify(&token_string));

        // 不正なトークンは検証失敗
        assert!(!token.verify("invalid_token"));
        assert!(!token.verify(""));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = CsrfToken::generate_at(Utc::now().timestamp() - CSRF_TOKEN_EXPIRY - 1);
        assert!(token.is_expired());
        assert!(!token.verify(&token.0.clone()));
    }

    #[test]
    fn test_garbage_token_is_expired() {
        assert!(CsrfToken("not base64 !!".to_string()).is_expired());
    }
}
