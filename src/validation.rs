use std::collections::BTreeMap;

use serde::Serialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::entities::todo::TodoStatus;

pub const TITLE_MAX_CHARS: u64 = 200;

/// フィールド単位のエラーメッセージ。
/// Djangoの `form.errors` に相当し、テンプレートでは `errors.<field>` で参照します。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 全メッセージをフィールド名順に平坦化
    pub fn messages(&self) -> Vec<String> {
        self.0.values().flatten().cloned().collect()
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let msg = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                out.add(&field, msg);
            }
        }
        out
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("required"))
    } else {
        Ok(())
    }
}

/// 空文字は「未指定」として通します (作成時は既定値、編集時は現状維持)。
fn validate_status(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    value
        .parse::<TodoStatus>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_choice"))
}

/// メールアドレスの正規化 (前後の空白除去 + 小文字化)
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// ユーザー登録フォームのバリデーション。
/// Djangoの `UserCreationForm` + `clean_*` メソッドに相当。
/// 重複チェックはDBが必要なため `UserService::register` 側で行います。
#[derive(Debug, Validate)]
pub struct RegistrationInput {
    #[validate(length(min = 3, max = 80, message = "Username must be 3-80 characters"))]
    pub username: String,

    #[validate(
        email(message = "Please enter a valid email"),
        length(max = 254, message = "Email cannot exceed 254 characters")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords must match"))]
    pub confirm_password: String,
}

impl RegistrationInput {
    pub fn new(username: &str, email: &str, password: &str, confirm_password: &str) -> Self {
        Self {
            username: username.to_string(),
            email: normalize_email(email),
            password: password.to_string(),
            confirm_password: confirm_password.to_string(),
        }
    }

    pub fn validate_form(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }
}

/// ログインフォームのバリデーション
#[derive(Debug, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    #[validate(custom(function = "validate_not_blank", message = "This field is required."))]
    pub password: String,
}

impl LoginInput {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: normalize_email(email),
            password: password.to_string(),
        }
    }

    pub fn validate_form(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }
}

/// TODO作成/編集フォームのバリデーション。
/// Djangoの `forms.ModelForm` に相当。
#[derive(Debug, Validate)]
pub struct TodoInput {
    #[validate(
        custom(function = "validate_not_blank", message = "This field is required."),
        length(max = 200, message = "Title cannot exceed 200 characters")
    )]
    pub title: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_status", message = "Not a valid choice."))]
    pub status: String,
}

impl TodoInput {
    /// 空の説明は `None` として扱います。ステータスは空なら未指定です。
    pub fn new(title: &str, description: &str, status: &str) -> Self {
        let description = if description.trim().is_empty() {
            None
        } else {
            Some(description.to_string())
        };

        Self {
            title: title.to_string(),
            description,
            status: status.to_string(),
        }
    }

    pub fn validate_form(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }

    /// バリデーション済みのステータス。未指定なら `None`
    pub fn parsed_status(&self) -> Option<TodoStatus> {
        if self.status.is_empty() {
            return None;
        }
        self.status.parse().ok()
    }
}

/// リポジトリ層で再利用するタイトル単体の検証
pub fn validate_title(title: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if validate_not_blank(title).is_err() {
        errors.add("title", "This field is required.");
    }
    if title.chars().count() as u64 > TITLE_MAX_CHARS {
        errors.add("title", "Title cannot exceed 200 characters");
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_registration() {
        let form = RegistrationInput::new("alice", "a@x.com", "secret1", "secret1");
        assert!(form.validate_form().is_ok());
    }

    #[test]
    fn test_registration_normalizes_email() {
        let form = RegistrationInput::new("alice", "  A@X.Com ", "secret1", "secret1");
        assert_eq!(form.email, "a@x.com");
        assert!(form.validate_form().is_ok());
    }

    #[test]
    fn test_username_length_bounds() {
        let short = RegistrationInput::new("ab", "a@x.com", "secret1", "secret1");
        let errors = short.validate_form().unwrap_err();
        assert_eq!(errors.get("username"), ["Username must be 3-80 characters"]);

        let long = RegistrationInput::new(&"a".repeat(81), "a@x.com", "secret1", "secret1");
        assert!(long.validate_form().unwrap_err().has("username"));

        let max = RegistrationInput::new(&"a".repeat(80), "a@x.com", "secret1", "secret1");
        assert!(max.validate_form().is_ok());
    }

    #[test]
    fn test_invalid_email() {
        let form = RegistrationInput::new("alice", "not-an-email", "secret1", "secret1");
        let errors = form.validate_form().unwrap_err();
        assert_eq!(errors.get("email"), ["Please enter a valid email"]);
    }

    #[test]
    fn test_password_rules() {
        let short = RegistrationInput::new("alice", "a@x.com", "12345", "12345");
        assert!(short.validate_form().unwrap_err().has("password"));

        let mismatch = RegistrationInput::new("alice", "a@x.com", "secret1", "secret2");
        let errors = mismatch.validate_form().unwrap_err();
        assert_eq!(errors.get("confirm_password"), ["Passwords must match"]);
        assert!(!errors.has("password"));
    }

    #[test]
    fn test_login_requires_password() {
        assert!(LoginInput::new("a@x.com", "secret1").validate_form().is_ok());
        let errors = LoginInput::new("a@x.com", "   ").validate_form().unwrap_err();
        assert!(errors.has("password"));
        let errors = LoginInput::new("", "secret1").validate_form().unwrap_err();
        assert!(errors.has("email"));
    }

    #[test]
    fn test_todo_defaults() {
        let form = TodoInput::new("Buy milk", "", "");
        assert!(form.validate_form().is_ok());
        assert_eq!(form.description, None);
        assert_eq!(form.parsed_status(), None);

        let form = TodoInput::new("Buy milk", "", "complete");
        assert_eq!(form.parsed_status(), Some(TodoStatus::Complete));
    }

    #[test]
    fn test_todo_title_rules() {
        let blank = TodoInput::new("   ", "", "incomplete");
        assert_eq!(blank.validate_form().unwrap_err().get("title"), ["This field is required."]);

        let too_long = TodoInput::new(&"x".repeat(201), "", "incomplete");
        assert_eq!(
            too_long.validate_form().unwrap_err().get("title"),
            ["Title cannot exceed 200 characters"]
        );

        // 文字数で数える (バイト数ではない)
        let multibyte = TodoInput::new(&"あ".repeat(200), "", "incomplete");
        assert!(multibyte.validate_form().is_ok());
        assert!(validate_title(&"あ".repeat(200)).is_ok());
        assert!(validate_title(&"あ".repeat(201)).is_err());
    }

    #[test]
    fn test_email_length_matches_column() {
        // ローカル部60文字 + ドメイン 4x60文字ラベル: 形式は正しいが254文字を超える
        let domain = format!("{}com", format!("{}.", "b".repeat(60)).repeat(4));
        let email = format!("{}@{}", "a".repeat(60), domain);
        assert!(email.len() > 254);

        let form = RegistrationInput::new("alice", &email, "secret1", "secret1");
        let errors = form.validate_form().unwrap_err();
        assert_eq!(errors.get("email"), ["Email cannot exceed 254 characters"]);
    }

    #[test]
    fn test_todo_rejects_unknown_status() {
        let form = TodoInput::new("Buy milk", "", "done");
        let errors = form.validate_form().unwrap_err();
        assert_eq!(errors.get("status"), ["Not a valid choice."]);
        assert_eq!(form.parsed_status(), None);
    }

    #[test]
    fn test_field_errors_messages() {
        let mut errors = FieldErrors::single("username", "Username already taken. Please choose another.");
        errors.add("email", "Email already registered. Please use another.");
        assert_eq!(errors.messages().len(), 2);
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
