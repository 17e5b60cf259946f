use std::env;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha512};

/// 開発用のデフォルト値。本番では必ず環境変数で上書きすること。
pub const DEFAULT_SECRET_KEY: &str = "my-super-secret-key-change-this";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://todo.db?mode=rwc";
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

/// アプリケーション設定。
/// Djangoの `settings.py` (SECRET_KEY, DATABASES など) に相当します。
#[derive(Debug, Clone)]
pub struct Settings {
    pub secret_key: String,
    pub database_url: String,
    pub session_ttl_hours: i64,
}

impl Settings {
    /// 環境変数から設定を読み込みます。未設定の項目は開発用デフォルトを使います。
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let session_ttl_hours = match non_empty("SESSION_TTL_HOURS").map(|v| v.parse::<i64>()) {
            Some(Ok(hours)) if hours > 0 => hours,
            Some(_) => {
                tracing::warn!("SESSION_TTL_HOURS is invalid, falling back to {}", DEFAULT_SESSION_TTL_HOURS);
                DEFAULT_SESSION_TTL_HOURS
            }
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        Settings {
            secret_key: non_empty("SECRET_KEY").unwrap_or_else(|| DEFAULT_SECRET_KEY.to_owned()),
            database_url: non_empty("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            session_ttl_hours,
        }
    }

    /// Rocketの `secret_key` (512bit, base64) を SECRET_KEY から導出します。
    /// private cookie の暗号化・署名に使われます。
    pub fn rocket_secret_key(&self) -> String {
        let digest = Sha512::digest(self.secret_key.as_bytes());
        STANDARD.encode(digest)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = settings_from(&[]);
        assert_eq!(settings.secret_key, DEFAULT_SECRET_KEY);
        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(settings.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
        assert!(settings.uses_default_secret());
    }

    #[test]
    fn test_env_overrides() {
        let settings = settings_from(&[
            ("SECRET_KEY", "another-secret"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("SESSION_TTL_HOURS", "2"),
        ]);
        assert_eq!(settings.secret_key, "another-secret");
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(settings.session_ttl(), chrono::Duration::hours(2));
        assert!(!settings.uses_default_secret());
    }

    #[test]
    fn test_invalid_ttl_falls_back() {
        let settings = settings_from(&[("SESSION_TTL_HOURS", "-3")]);
        assert_eq!(settings.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
        let settings = settings_from(&[("SESSION_TTL_HOURS", "soon")]);
        assert_eq!(settings.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
    }

    #[test]
    fn test_rocket_secret_key_is_512_bits() {
        let settings = settings_from(&[]);
        let decoded = STANDARD.decode(settings.rocket_secret_key()).unwrap();
        assert_eq!(decoded.len(), 64);
        // 同じ入力からは同じ鍵
        assert_eq!(settings.rocket_secret_key(), settings_from(&[]).rocket_secret_key());
    }
}
