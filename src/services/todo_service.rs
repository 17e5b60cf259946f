use std::str::FromStr;

use chrono::Utc;
use sea_orm::*;
use serde::Serialize;

use crate::entities::todo::{self, TodoStatus};
use crate::entities::{prelude::*, user};
use crate::errors::AppError;
use crate::validation::validate_title;

/// 一覧の絞り込み条件。`?status=` クエリに対応します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(TodoStatus),
}

impl StatusFilter {
    /// クエリパラメータから変換します。未指定や未知の値は `All` として扱います。
    pub fn from_param(param: Option<&str>) -> Self {
        param.and_then(|p| p.parse().ok()).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Only(status) => status.as_str(),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            other => other.parse::<TodoStatus>().map(StatusFilter::Only).map_err(|_| ()),
        }
    }
}

/// ステータス別の件数。絞り込み条件に関係なく、そのユーザーの全件を集計します。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodoStats {
    pub total: u64,
    pub incomplete: u64,
    pub in_progress: u64,
    pub complete: u64,
}

/// TODOの入力値 (作成/更新共通)
#[derive(Debug, Clone)]
pub struct TodoDraft<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub status: Option<TodoStatus>,
}

/// 所有者単位でスコープされたTODOリポジトリ。
///
/// すべての読み取り・更新・削除は `get_owned` を通り、所有者チェックを
/// 呼び出し側に任せることはありません。
pub struct TodoService;

impl TodoService {
    /// TODO一覧と集計を取得 (Django: `Todo.objects.filter(user=request.user)`)
    pub async fn list(
        db: &DatabaseConnection,
        owner: &user::Model,
        filter: StatusFilter,
    ) -> Result<(Vec<todo::Model>, TodoStats), AppError> {
        let mut query = Todo::find().filter(todo::Column::UserId.eq(owner.id));
        if let StatusFilter::Only(status) = filter {
            query = query.filter(todo::Column::Status.eq(status));
        }

        let todos = query
            .order_by_desc(todo::Column::CreatedAt)
            .order_by_desc(todo::Column::Id)
            .all(db)
            .await?;

        let stats = Self::stats(db, owner).await?;

        Ok((todos, stats))
    }

    /// ステータス別件数
    pub async fn stats(db: &DatabaseConnection, owner: &user::Model) -> Result<TodoStats, AppError> {
        let owned = || Todo::find().filter(todo::Column::UserId.eq(owner.id));

        let mut stats = TodoStats {
            total: owned().count(db).await?,
            ..Default::default()
        };
        for status in TodoStatus::iter() {
            let count = owned().filter(todo::Column::Status.eq(status)).count(db).await?;
            match status {
                TodoStatus::Incomplete => stats.incomplete = count,
                TodoStatus::InProgress => stats.in_progress = count,
                TodoStatus::Complete => stats.complete = count,
            }
        }

        Ok(stats)
    }

    /// TODO作成。所有者は常にリクエストしたユーザーです。
    pub async fn create(
        db: &DatabaseConnection,
        owner: &user::Model,
        draft: TodoDraft<'_>,
    ) -> Result<todo::Model, AppError> {
        validate_title(draft.title).map_err(AppError::Validation)?;

        let now = Utc::now().into();
        let new_todo = todo::ActiveModel {
            title: Set(draft.title.to_owned()),
            description: Set(normalize_description(draft.description)),
            status: Set(draft.status.unwrap_or_default()),
            user_id: Set(owner.id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = new_todo.insert(db).await?;
        tracing::info!(todo_id = created.id, user_id = owner.id, "todo created");
        Ok(created)
    }

    /// 所有者チェック付きの取得。
    ///
    /// 行が存在しなければ `NotFound`、存在するが所有者が違えば `Forbidden`。
    /// 画面上はどちらも同じ扱いですが、ログ上は区別します。
    pub async fn get_owned(
        db: &DatabaseConnection,
        id: i32,
        owner: &user::Model,
    ) -> Result<todo::Model, AppError> {
        let Some(found) = Todo::find_by_id(id).one(db).await? else {
            tracing::debug!(todo_id = id, user_id = owner.id, "todo not found");
            return Err(AppError::NotFound);
        };

        if found.user_id != owner.id {
            tracing::warn!(
                todo_id = id,
                user_id = owner.id,
                owner_id = found.user_id,
                "forbidden access to another user's todo"
            );
            return Err(AppError::Forbidden);
        }

        Ok(found)
    }

    /// タイトル・説明・ステータスのみ上書きします。所有者と作成日時は変更しません。
    pub async fn update(
        db: &DatabaseConnection,
        id: i32,
        owner: &user::Model,
        draft: TodoDraft<'_>,
    ) -> Result<todo::Model, AppError> {
        let existing = Self::get_owned(db, id, owner).await?;
        validate_title(draft.title).map_err(AppError::Validation)?;

        let status = draft.status.unwrap_or(existing.status);
        let mut active_model: todo::ActiveModel = existing.into();
        active_model.title = Set(draft.title.to_owned());
        active_model.description = Set(normalize_description(draft.description));
        active_model.status = Set(status);
        active_model.updated_at = Set(Utc::now().into());

        let updated = active_model.update(db).await?;
        tracing::info!(todo_id = id, user_id = owner.id, "todo updated");
        Ok(updated)
    }

    pub async fn delete(db: &DatabaseConnection, id: i32, owner: &user::Model) -> Result<(), AppError> {
        let existing = Self::get_owned(db, id, owner).await?;
        existing.delete(db).await?;
        tracing::info!(todo_id = id, user_id = owner.id, "todo deleted");
        Ok(())
    }

    /// ステータスのみの変更。未知の値はレコードを変更せずに `InvalidStatus` を返します。
    pub async fn update_status_only(
        db: &DatabaseConnection,
        id: i32,
        owner: &user::Model,
        new_status: &str,
    ) -> Result<todo::Model, AppError> {
        let existing = Self::get_owned(db, id, owner).await?;

        let status: TodoStatus = new_status
            .parse()
            .map_err(|_| AppError::InvalidStatus(new_status.to_owned()))?;

        let mut active_model: todo::ActiveModel = existing.into();
        active_model.status = Set(status);
        active_model.updated_at = Set(Utc::now().into());

        let updated = active_model.update(db).await?;
        tracing::info!(todo_id = id, user_id = owner.id, status = status.as_str(), "todo status changed");
        Ok(updated)
    }
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .filter(|d| !d.trim().is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter_from_param() {
        assert_eq!(StatusFilter::from_param(None), StatusFilter::All);
        assert_eq!(StatusFilter::from_param(Some("all")), StatusFilter::All);
        assert_eq!(
            StatusFilter::from_param(Some("in_progress")),
            StatusFilter::Only(TodoStatus::InProgress)
        );
        assert_eq!(StatusFilter::from_param(Some("bogus")), StatusFilter::All);
        assert_eq!(StatusFilter::Only(TodoStatus::Complete).as_str(), "complete");
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description(None), None);
        assert_eq!(normalize_description(Some("  ")), None);
        assert_eq!(normalize_description(Some("2 liters")), Some("2 liters".to_owned()));
    }
}
