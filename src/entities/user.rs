use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

// Djangoの `models.Model` に相当する構造体。
// SeaORMではマクロを使ってDBテーブルとのマッピング、リレーション、アクティブレコードパターンを定義します。
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    /// 小文字に正規化済みのメールアドレス
    #[sea_orm(unique)]
    pub email: String,
    /// テンプレートへ渡すことがあるためシリアライズ対象から外す
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::todo::Entity")]
    Todo,
    #[sea_orm(has_many = "super::session::Entity")]
    Session,
}

impl Related<super::todo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Todo.def()
    }
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
