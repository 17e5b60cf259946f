use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use anyhow::Result;
use lazy_static::lazy_static;

lazy_static! {
    /// 存在しないメールアドレスでのログイン時に検証するダミーハッシュ。
    /// 応答時間からメールアドレスの登録有無が推測されないようにする。
    static ref DUMMY_HASH: String = hash_password("dummy-password-for-timing").unwrap_or_default();
}

/// パスワードをArgon2でハッシュ化します。
/// Djangoの `make_password` に相当する機能です。
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

/// パスワードを検証します。
/// Djangoの `check_password` に相当する機能です。
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match argon2::PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// ダミーハッシュに対して検証だけ行い、常に `false` を返します。
pub fn verify_against_dummy(password: &str) -> bool {
    let _ = verify_password(password, &DUMMY_HASH);
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let password = "test_password_123";
        let hash = hash_password(password).expect("Failed to hash");

        assert!(verify_password(password, &hash));
        assert!(!verify_password("wrong_password", &hash));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        // ソルトが毎回異なる
        let hash1 = hash_password("secret1").unwrap();
        let hash2 = hash_password("secret1").unwrap();

        assert_ne!(hash1, hash2);
        assert!(hash1.starts_with("$argon2"));
        assert!(!hash1.contains("secret1"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("secret1", "secret1"));
        assert!(!verify_password("secret1", ""));
    }

    #[test]
    fn test_dummy_verification_is_always_false() {
        assert!(!verify_against_dummy("dummy-password-for-timing"));
    }
}
