use chrono::Utc;
use sea_orm::*;

use crate::auth_utils::{hash_password, verify_against_dummy, verify_password};
use crate::entities::{prelude::*, user};
use crate::errors::AppError;
use crate::validation::{normalize_email, FieldErrors};

pub const USERNAME_TAKEN: &str = "Username already taken. Please choose another.";
pub const EMAIL_TAKEN: &str = "Email already registered. Please use another.";

/// ユーザー関連のビジネスロジックを集約するサービス。
/// Djangoの Manager やカスタム QuerySet メソッドに相当します。
pub struct UserService;

impl UserService {
    /// ユーザー名で検索 (完全一致)
    pub async fn find_by_username(db: &DatabaseConnection, username: &str) -> Result<Option<user::Model>, AppError> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await
            .map_err(AppError::Database)
    }

    /// メールアドレスで検索。入力は正規化してから比較します。
    pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>, AppError> {
        User::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(db)
            .await
            .map_err(AppError::Database)
    }

    /// 既存ユーザーと衝突するフィールド (username / email) を集めます。
    pub async fn find_conflicts(db: &DatabaseConnection, username: &str, email: &str) -> Result<FieldErrors, AppError> {
        let mut conflicts = FieldErrors::new();
        if Self::find_by_username(db, username).await?.is_some() {
            conflicts.add("username", USERNAME_TAKEN);
        }
        if Self::find_by_email(db, email).await?.is_some() {
            conflicts.add("email", EMAIL_TAKEN);
        }
        Ok(conflicts)
    }

    /// ユーザー登録 (Django: User.objects.create_user())
    ///
    /// ユーザー名・メールアドレスの重複は保存前にチェックし、両方の衝突をまとめて返します。
    /// チェック後に別リクエストが同じ値で登録した場合も、一意制約違反を同じ
    /// `AppError::Duplicate` に変換します。
    pub async fn register(
        db: &DatabaseConnection,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<user::Model, AppError> {
        let email = normalize_email(email);

        let conflicts = Self::find_conflicts(db, username, &email).await?;
        if !conflicts.is_empty() {
            return Err(AppError::Duplicate(conflicts));
        }

        let password_hash = hash_password(password)?;

        let new_user = user::ActiveModel {
            username: Set(username.to_owned()),
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        match new_user.insert(db).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, username = %user.username, "user registered");
                Ok(user)
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                // 事前チェック後に同時登録された。衝突したフィールドを引き直す
                tracing::debug!(error = %e, "unique constraint hit during registration");
                let conflicts = Self::find_conflicts(db, username, &email).await?;
                if conflicts.is_empty() {
                    Err(AppError::Database(e))
                } else {
                    Err(AppError::Duplicate(conflicts))
                }
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// 認証処理 (Django: authenticate())
    ///
    /// 該当するユーザーがいない場合とパスワードが違う場合は、どちらも `None` になります。
    pub async fn authenticate(
        db: &DatabaseConnection,
        email: &str,
        password: &str,
    ) -> Result<Option<user::Model>, AppError> {
        let user = match Self::find_by_email(db, email).await? {
            Some(user) => user,
            None => {
                verify_against_dummy(password);
                return Ok(None);
            }
        };

        if !verify_password(password, &user.password_hash) {
            return Ok(None);
        }

        Ok(Some(user))
    }
}
