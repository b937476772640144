use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::UserModel;
use crate::response::ApiResponse;
use crate::services::auth::AuthService;
use axum::{response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Username (3-50 characters)
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    /// Email address
    #[validate(email)]
    pub email: String,
    /// Password (min 8 characters)
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password1: String,
    /// Password confirmation
    #[validate(must_match(other = "password1", message = "Passwords do not match."))]
    pub password2: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Username or email
    #[validate(length(min = 1))]
    pub username: String,
    /// User password
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// JWT access token
    pub token: String,
    /// User ID
    pub user_id: i32,
    /// Username
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    /// User ID
    pub id: i32,
    /// Username
    pub username: String,
    /// Email address
    pub email: String,
    /// User role (user, moderator, admin)
    pub role: String,
    pub created_at: String,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at.to_string(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Validation error", body = AppError),
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate().map_err(|e| AppError::validation(&e))?;

    let service = AuthService::new(db);
    let (user, token) = service
        .register(payload.username.trim(), payload.email.trim(), &payload.password1)
        .await?;

    let response = AuthResponse {
        token,
        user_id: user.id,
        username: user.username,
    };
    Ok(ApiResponse::with_message(response, "Registration successful."))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = AppError),
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate().map_err(|e| AppError::validation(&e))?;

    let service = AuthService::new(db);
    let (user, token) = service
        .login(payload.username.trim(), &payload.password)
        .await?;

    Ok(ApiResponse::ok(AuthResponse {
        token,
        user_id: user.id,
        username: user.username,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Current user retrieved successfully", body = UserResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "auth"
)]
pub async fn get_current_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let service = AuthService::new(db);
    let user = service.get_user_by_id(auth_user.user_id).await?;

    Ok(ApiResponse::ok(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(password1: &str, password2: &str) -> RegisterRequest {
        RegisterRequest {
            username: "reader".to_string(),
            email: "reader@example.com".to_string(),
            password1: password1.to_string(),
            password2: password2.to_string(),
        }
    }

    #[test]
    fn matching_passwords_pass() {
        assert!(request("longenough", "longenough").validate().is_ok());
    }

    #[test]
    fn mismatched_passwords_are_reported_on_confirmation() {
        let errors = request("longenough", "different1").validate().unwrap_err();
        let map = crate::error::field_messages(&errors);
        assert_eq!(map["password2"], vec!["Passwords do not match.".to_string()]);
    }

    #[test]
    fn short_password_is_rejected() {
        let errors = request("short", "short").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password1"));
    }
}
