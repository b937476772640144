use crate::error::AppResult;
use crate::handlers::comment::CommentResponse;
use crate::middleware::auth::{require_moderator, AuthUser};
use crate::models::User;
use crate::response::{ApiResponse, PaginatedResponse};
use crate::services::comment::{CommentService, ModerationFilter};
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Deserialize;
use utoipa::ToSchema;

const DEFAULT_QUEUE_SIZE: u64 = 20;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ModerationQuery {
    /// Only visible (`true`) or only hidden (`false`) comments
    pub active: Option<bool>,
    /// Case-insensitive substring of the comment body
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/comments",
    security(("jwt_token" = [])),
    params(
        ("active" = Option<bool>, Query, description = "Filter by visibility"),
        ("q" = Option<String>, Query, description = "Body contains"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Comments across all posts, newest first", body = PaginatedResponse<CommentResponse>),
        (status = 403, description = "Moderators only", body = crate::error::AppError),
    ),
    tag = "moderation"
)]
pub async fn list_comments(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(params): Query<ModerationQuery>,
) -> AppResult<impl IntoResponse> {
    require_moderator(&auth_user)?;

    let (page, per_page) = crate::response::PaginationQuery {
        page: params.page,
        per_page: params.per_page,
    }
    .resolve(DEFAULT_QUEUE_SIZE);
    let filter = ModerationFilter {
        active: params.active,
        query: params.q,
    };

    let (entries, total) = CommentService::new(db)
        .list_for_moderation(&filter, page, per_page)
        .await?;
    let items = entries.into_iter().map(CommentResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/comments/{id}/active",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Comment ID")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Visibility updated", body = CommentResponse),
        (status = 403, description = "Moderators only", body = crate::error::AppError),
        (status = 404, description = "Comment not found", body = crate::error::AppError),
    ),
    tag = "moderation"
)]
pub async fn set_comment_active(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<SetActiveRequest>,
) -> AppResult<impl IntoResponse> {
    let moderator_id = require_moderator(&auth_user)?;

    let comment = CommentService::new(db.clone())
        .set_active(id, payload.active)
        .await?;
    let author = match comment.author_id {
        Some(author_id) => User::find_by_id(author_id).one(&db).await?,
        None => None,
    };
    tracing::debug!(comment_id = id, moderator_id, active = payload.active, "visibility set");

    let message = if comment.active {
        "Comment approved."
    } else {
        "Comment hidden."
    };
    Ok(ApiResponse::with_message(
        CommentResponse::new(comment, author.as_ref()),
        message,
    ))
}
