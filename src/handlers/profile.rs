use crate::config::blog::blog_config;
use crate::error::{AppError, AppResult};
use crate::handlers::auth::UserResponse;
use crate::handlers::post::{summarize, PostSummary};
use crate::middleware::AuthUser;
use crate::models::{ProfileModel, UserModel};
use crate::response::ApiResponse;
use crate::services::post::PostService;
use crate::services::profile::{ProfileService, ProfileUpdate};
use axum::{response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidateUrl, ValidationError};

/// Empty is allowed; anything else must be a URL.
fn optional_url(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || value.validate_url() {
        return Ok(());
    }
    let mut err = ValidationError::new("url");
    err.message = Some("Enter a valid URL.".into());
    Err(err)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub bio: String,
    #[validate(length(max = 200), custom(function = "optional_url"))]
    #[serde(default)]
    pub website: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub social_twitter: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub location: String,
    /// Picture URL or path; empty clears it
    #[validate(length(max = 500))]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub bio: String,
    pub website: String,
    pub social_twitter: String,
    pub location: String,
    pub profile_picture: Option<String>,
    /// Picture, or the site default when none is set
    pub avatar_url: String,
    /// Own posts, drafts included
    pub posts: Vec<PostSummary>,
}

impl ProfileResponse {
    fn new(user: UserModel, profile: ProfileModel, posts: Vec<PostSummary>) -> Self {
        let avatar_url = profile.avatar_url(&blog_config().default_avatar_url);
        Self {
            user: UserResponse::from(user),
            bio: profile.bio,
            website: profile.website,
            social_twitter: profile.social_twitter,
            location: profile.location,
            profile_picture: profile.profile_picture,
            avatar_url,
            posts,
        }
    }
}

async fn profile_response(
    db: DatabaseConnection,
    user: UserModel,
    profile: ProfileModel,
) -> AppResult<ProfileResponse> {
    let service = PostService::new(db);
    let posts = service.list_by_author(user.id).await?;
    let posts = summarize(&service, posts).await?;
    Ok(ProfileResponse::new(user, profile, posts))
}

#[utoipa::path(
    get,
    path = "/api/v1/account/profile",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Own profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "account"
)]
pub async fn get_profile(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let (user, profile) = ProfileService::new(db.clone())
        .get_for_user(auth_user.user_id)
        .await?;

    Ok(ApiResponse::ok(profile_response(db, user, profile).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/account/profile",
    security(("jwt_token" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "account"
)]
pub async fn update_profile(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate().map_err(|e| AppError::validation(&e))?;

    let changes = ProfileUpdate {
        username: payload.username.trim().to_string(),
        email: payload.email.trim().to_string(),
        bio: payload.bio,
        website: payload.website.trim().to_string(),
        social_twitter: payload.social_twitter.trim().to_string(),
        location: payload.location.trim().to_string(),
        profile_picture: payload
            .profile_picture
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
    };

    let (user, profile) = ProfileService::new(db.clone())
        .update(auth_user.user_id, changes)
        .await?;

    Ok(ApiResponse::with_message(
        profile_response(db, user, profile).await?,
        "Your profile has been updated!",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(website: &str) -> UpdateProfileRequest {
        UpdateProfileRequest {
            username: "reader".to_string(),
            email: "reader@example.com".to_string(),
            bio: String::new(),
            website: website.to_string(),
            social_twitter: String::new(),
            location: String::new(),
            profile_picture: None,
        }
    }

    #[test]
    fn website_may_be_empty() {
        assert!(request("").validate().is_ok());
    }

    #[test]
    fn website_must_be_a_url() {
        assert!(request("https://example.com/me").validate().is_ok());
        let errors = request("not a url").validate().unwrap_err();
        let map = crate::error::field_messages(&errors);
        assert_eq!(map["website"], vec!["Enter a valid URL.".to_string()]);
    }

    #[test]
    fn bio_is_limited() {
        let mut req = request("");
        req.bio = "x".repeat(501);
        assert!(req.validate().is_err());
    }
}
