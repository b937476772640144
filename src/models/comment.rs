use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub post_id: i32,
    /// `None` once the author account is deleted.
    pub author_id: Option<i32>,
    /// Always a top-level comment of the same post, see [`Model::reply_anchor`].
    pub parent_id: Option<i32>,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub active: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Author,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "Cascade"
    )]
    Parent,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Reader-facing moderation state, backed by the `active` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

impl From<bool> for Visibility {
    fn from(active: bool) -> Self {
        if active {
            Self::Visible
        } else {
            Self::Hidden
        }
    }
}

impl Model {
    pub fn visibility(&self) -> Visibility {
        Visibility::from(self.active)
    }

    /// Id that a reply to this comment must point at.
    ///
    /// Threads are two levels deep: answering a reply attaches to that reply's
    /// parent. Only one level is collapsed, which is enough as long as every
    /// stored reply already points at a top-level comment.
    pub fn reply_anchor(&self) -> i32 {
        self.parent_id.unwrap_or(self.id)
    }
}
