use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// TODOの進捗状態。
/// DB上は snake_case の文字列として保存されます。
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    #[sea_orm(string_value = "incomplete")]
    Incomplete,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "complete")]
    Complete,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Incomplete => "incomplete",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Complete => "complete",
        }
    }

    /// 画面表示用のラベル (例: "In Progress")
    pub fn label(&self) -> &'static str {
        match self {
            TodoStatus::Incomplete => "Incomplete",
            TodoStatus::InProgress => "In Progress",
            TodoStatus::Complete => "Complete",
        }
    }
}

/// 未知のステータス文字列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl FromStr for TodoStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incomplete" => Ok(TodoStatus::Incomplete),
            "in_progress" => Ok(TodoStatus::InProgress),
            "complete" => Ok(TodoStatus::Complete),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// TODOモデル。
/// Djangoの `models.Model` に相当します。
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "todos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// TODOのタイトル (必須、最大200文字)
    pub title: String,

    /// 詳細な説明 (任意)
    pub description: Option<String>,

    pub status: TodoStatus,

    /// 所有者のユーザーID (外部キー)。作成後は変更しない
    pub user_id: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

/// リレーション定義
/// Djangoの `ForeignKey` に相当します。
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("incomplete".parse(), Ok(TodoStatus::Incomplete));
        assert_eq!("in_progress".parse(), Ok(TodoStatus::InProgress));
        assert_eq!("complete".parse(), Ok(TodoStatus::Complete));
    }

    #[test]
    fn test_status_parse_rejects_unknown_values() {
        assert!("bogus".parse::<TodoStatus>().is_err());
        // 大文字小文字は区別する
        assert!("Complete".parse::<TodoStatus>().is_err());
        assert!("".parse::<TodoStatus>().is_err());
    }

    #[test]
    fn test_status_default_and_labels() {
        assert_eq!(TodoStatus::default(), TodoStatus::Incomplete);
        assert_eq!(TodoStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TodoStatus::InProgress.label(), "In Progress");
    }
}
