use crate::{
    error::{AppError, AppResult},
    models::{profile, user, Role, User, UserModel},
    utils::{encode_access_token, hash_password, verify_password},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};

pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create the account and its empty profile, then issue a token.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AppResult<(UserModel, String)> {
        if self.user_exists(username, email).await? {
            return Err(AppError::Validation(
                "Username or email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(password)?;
        let now = chrono::Utc::now().naive_utc();

        let txn = self.db.begin().await?;

        let user = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            role: Set(Role::User.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        profile::ActiveModel {
            user_id: Set(user.id),
            profile_picture: Set(None),
            bio: Set(String::new()),
            website: Set(String::new()),
            social_twitter: Set(String::new()),
            location: Set(String::new()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!(user_id = user.id, "registered new user");

        let token = encode_access_token(user.id)?;
        Ok((user, token))
    }

    /// Authenticate by username or email.
    pub async fn login(&self, identifier: &str, password: &str) -> AppResult<(UserModel, String)> {
        let invalid = || AppError::Validation("Invalid credentials".to_string());

        let user = User::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(identifier))
                    .add(user::Column::Email.eq(identifier)),
            )
            .one(&self.db)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }

        let token = encode_access_token(user.id)?;
        Ok((user, token))
    }

    pub async fn get_user_by_id(&self, id: i32) -> AppResult<UserModel> {
        User::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn user_exists(&self, username: &str, email: &str) -> AppResult<bool> {
        let count = User::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(username))
                    .add(user::Column::Email.eq(email)),
            )
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }
}
