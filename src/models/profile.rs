use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub profile_picture: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub bio: String,
    pub website: String,
    pub social_twitter: String,
    pub location: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
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

impl Model {
    /// Uploaded picture, or `default_url` when none is set.
    pub fn avatar_url(&self, default_url: &str) -> String {
        match self.profile_picture.as_deref().map(str::trim) {
            Some(pic) if !pic.is_empty() => pic.to_string(),
            _ => default_url.to_string(),
        }
    }
}
