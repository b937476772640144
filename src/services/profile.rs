use crate::{
    error::{AppError, AppResult},
    models::{profile, user, Profile, ProfileModel, User, UserModel},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};

/// Editable account and profile fields.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub bio: String,
    pub website: String,
    pub social_twitter: String,
    pub location: String,
    pub profile_picture: Option<String>,
}

pub struct ProfileService {
    db: DatabaseConnection,
}

impl ProfileService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Accounts created outside `register` may lack a profile row; one is
    /// created on first access.
    pub async fn get_for_user(&self, user_id: i32) -> AppResult<(UserModel, ProfileModel)> {
        let user = User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let existing = Profile::find()
            .filter(profile::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;

        let profile = match existing {
            Some(p) => p,
            None => {
                profile::ActiveModel {
                    user_id: Set(user_id),
                    profile_picture: Set(None),
                    bio: Set(String::new()),
                    website: Set(String::new()),
                    social_twitter: Set(String::new()),
                    location: Set(String::new()),
                    ..Default::default()
                }
                .insert(&self.db)
                .await?
            }
        };

        Ok((user, profile))
    }

    pub async fn update(
        &self,
        user_id: i32,
        changes: ProfileUpdate,
    ) -> AppResult<(UserModel, ProfileModel)> {
        let (user, profile) = self.get_for_user(user_id).await?;

        let taken = User::find()
            .filter(user::Column::Id.ne(user_id))
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(changes.username.as_str()))
                    .add(user::Column::Email.eq(changes.email.as_str())),
            )
            .count(&self.db)
            .await?;
        if taken > 0 {
            return Err(AppError::Validation(
                "Username or email already exists".to_string(),
            ));
        }

        let now = chrono::Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        let mut active_user: user::ActiveModel = user.into();
        active_user.username = Set(changes.username);
        active_user.email = Set(changes.email);
        active_user.updated_at = Set(now);
        let user = active_user.update(&txn).await?;

        let mut active_profile: profile::ActiveModel = profile.into();
        active_profile.bio = Set(changes.bio);
        active_profile.website = Set(changes.website);
        active_profile.social_twitter = Set(changes.social_twitter);
        active_profile.location = Set(changes.location);
        active_profile.profile_picture = Set(changes.profile_picture);
        let profile = active_profile.update(&txn).await?;

        txn.commit().await?;

        Ok((user, profile))
    }
}
