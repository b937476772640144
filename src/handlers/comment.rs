use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{CommentModel, UserModel, Visibility};
use crate::response::ApiResponse;
use crate::services::auth::AuthService;
use crate::services::comment::{
    CommentEntry, CommentService, CommentThread, LOGIN_REQUIRED_MESSAGE,
};
use crate::services::post::PostService;
use crate::utils::{escape_text, render_markdown};
use axum::{
    extract::{rejection::JsonRejection, Path},
    response::IntoResponse,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Shown in place of an author whose account was deleted.
pub const DELETED_USER: &str = "deleted user";

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("This field is required.".into());
        return Err(err);
    }
    Ok(())
}

/// `null` reads as an empty body so it fails validation like a blank one.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommentRequest {
    /// Comment text (Markdown supported)
    #[validate(
        custom(function = "not_blank"),
        length(max = 5000, message = "Ensure this value has at most 5000 characters.")
    )]
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
    /// Comment being answered; replies to replies attach to the thread root
    pub parent_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorSummary {
    /// `null` once the account is deleted
    pub id: Option<i32>,
    pub username: String,
}

impl AuthorSummary {
    pub fn from_user(user: Option<&UserModel>) -> Self {
        match user {
            Some(u) => Self {
                id: Some(u.id),
                username: u.username.clone(),
            },
            None => Self {
                id: None,
                username: DELETED_USER.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub post_id: i32,
    pub parent_id: Option<i32>,
    /// Comment text (Markdown)
    pub body: String,
    /// Rendered, sanitized HTML
    pub body_html: String,
    pub author: AuthorSummary,
    pub visibility: Visibility,
    pub created_at: String,
}

impl CommentResponse {
    pub fn new(c: CommentModel, author: Option<&UserModel>) -> Self {
        let body_html = render_markdown(&c.body);
        let visibility = c.visibility();
        Self {
            id: c.id,
            post_id: c.post_id,
            parent_id: c.parent_id,
            body: c.body,
            body_html,
            author: AuthorSummary::from_user(author),
            visibility,
            created_at: c.created_at.to_string(),
        }
    }

    /// Markup inserted into the page after a successful submission.
    pub fn to_html(&self) -> String {
        let parent = self
            .parent_id
            .map(|id| format!(" data-parent-id=\"{}\"", id))
            .unwrap_or_default();
        format!(
            "<div class=\"comment\" id=\"comment-{id}\"{parent}>\
             <div class=\"comment-meta\"><strong>{author}</strong> \
             <time datetime=\"{time}\">{time}</time></div>\
             <div class=\"comment-body\">{body}</div></div>",
            id = self.id,
            parent = parent,
            author = escape_text(&self.author.username),
            time = escape_text(&self.created_at),
            body = self.body_html,
        )
    }
}

impl From<CommentEntry> for CommentResponse {
    fn from(entry: CommentEntry) -> Self {
        Self::new(entry.comment, entry.author.as_ref())
    }
}

/// A visible top-level comment with its visible replies.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommentThreadResponse {
    pub comment: CommentResponse,
    pub replies: Vec<CommentResponse>,
}

impl From<CommentThread> for CommentThreadResponse {
    fn from(thread: CommentThread) -> Self {
        Self {
            comment: CommentResponse::from(thread.root),
            replies: thread.replies.into_iter().map(CommentResponse::from).collect(),
        }
    }
}

/// Body of a successful comment submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommentPostedResponse {
    pub success: bool,
    /// Rendered fragment for the new comment
    pub comment_html: String,
    pub message: String,
    pub data: CommentResponse,
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{slug}/comments",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Visible comment threads, newest first", body = Vec<CommentThreadResponse>),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn list_comments(
    Extension(db): Extension<DatabaseConnection>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let post = PostService::new(db.clone()).get_published(&slug).await?;
    let threads = CommentService::new(db).list_visible(post.id).await?;

    let items: Vec<CommentThreadResponse> =
        threads.into_iter().map(CommentThreadResponse::from).collect();
    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{slug}/comments",
    security((), ("jwt_token" = [])),
    params(("slug" = String, Path, description = "Post slug")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment posted", body = CommentPostedResponse),
        (status = 400, description = "Field errors", body = AppError),
        (status = 401, description = "Not logged in", body = AppError),
        (status = 404, description = "Post or parent comment not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn create_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: Option<AuthUser>,
    Path(slug): Path<String>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Some(auth_user) = auth_user else {
        return Err(AppError::LoginRequired(LOGIN_REQUIRED_MESSAGE.to_string()));
    };

    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "unreadable comment payload");
        AppError::Validation(rejection.body_text())
    })?;
    payload.validate()?;

    let post = PostService::new(db.clone()).get_published(&slug).await?;
    let comment = CommentService::new(db.clone())
        .create(
            post.id,
            Some(auth_user.user_id),
            &payload.body,
            payload.parent_id,
        )
        .await?;

    let author = AuthService::new(db).get_user_by_id(auth_user.user_id).await?;
    let data = CommentResponse::new(comment, Some(&author));

    Ok(Json(CommentPostedResponse {
        success: true,
        comment_html: data.to_html(),
        message: "Comment posted successfully!".to_string(),
        data,
    }))
}
