use crate::config::blog::blog_config;
use crate::error::{AppError, AppResult};
use crate::handlers::category::CategoryResponse;
use crate::handlers::comment::{AuthorSummary, CommentThreadResponse};
use crate::middleware::AuthUser;
use crate::models::{CategoryModel, PostModel, PostStatus, UserModel};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::auth::AuthService;
use crate::services::comment::CommentService;
use crate::services::post::{PostDraft, PostService};
use crate::utils::render_markdown;
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePostRequest {
    /// Post title (1-200 characters)
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// URL slug; derived from the title when omitted
    #[validate(length(max = 255))]
    pub slug: Option<String>,
    /// Post body (Markdown supported)
    #[validate(length(min = 1))]
    pub body: String,
    /// Featured image URL or path
    pub featured_image: Option<String>,
    /// DRAFT (default) or PUBLISHED
    pub status: Option<PostStatus>,
    /// Category IDs
    pub category_ids: Option<Vec<i32>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePostRequest {
    /// Post title (1-200 characters)
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Post body (Markdown supported)
    #[validate(length(min = 1))]
    pub body: String,
    pub featured_image: Option<String>,
    pub status: Option<PostStatus>,
    /// Replaces the current category set
    pub category_ids: Option<Vec<i32>>,
}

/// Post as shown in listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostSummary {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub author_id: Option<i32>,
    pub categories: Vec<CategoryResponse>,
    pub created_at: String,
    pub published_at: Option<String>,
}

impl PostSummary {
    pub fn new(p: PostModel, categories: Vec<CategoryModel>) -> Self {
        Self {
            id: p.id,
            title: p.title,
            slug: p.slug,
            featured_image: p.featured_image,
            status: p.status,
            author_id: p.author_id,
            categories: categories.into_iter().map(CategoryResponse::from).collect(),
            created_at: p.created_at.to_string(),
            published_at: p.published_at.map(|t| t.to_string()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: i32,
    pub title: String,
    pub slug: String,
    /// Post body (Markdown)
    pub body: String,
    /// Rendered, sanitized HTML body
    pub body_html: String,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub author: AuthorSummary,
    pub categories: Vec<CategoryResponse>,
    pub created_at: String,
    pub updated_at: String,
    pub published_at: Option<String>,
}

impl PostResponse {
    pub fn new(p: PostModel, author: Option<&UserModel>, categories: Vec<CategoryModel>) -> Self {
        let body_html = render_markdown(&p.body);
        Self {
            id: p.id,
            title: p.title,
            slug: p.slug,
            body: p.body,
            body_html,
            featured_image: p.featured_image,
            status: p.status,
            author: AuthorSummary::from_user(author),
            categories: categories.into_iter().map(CategoryResponse::from).collect(),
            created_at: p.created_at.to_string(),
            updated_at: p.updated_at.to_string(),
            published_at: p.published_at.map(|t| t.to_string()),
        }
    }
}

/// Post detail page: the post and its visible discussion.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostDetailResponse {
    pub post: PostResponse,
    pub comments: Vec<CommentThreadResponse>,
    /// Visible comments, replies included
    pub comment_count: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchPostsQuery {
    /// Search query
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Attach batch-loaded categories to a page of posts.
pub(crate) async fn summarize(
    service: &PostService,
    posts: Vec<PostModel>,
) -> AppResult<Vec<PostSummary>> {
    let post_ids: Vec<i32> = posts.iter().map(|p| p.id).collect();
    let mut categories = service.categories_for_posts(&post_ids).await?;

    Ok(posts
        .into_iter()
        .map(|p| {
            let cats = categories.remove(&p.id).unwrap_or_default();
            PostSummary::new(p, cats)
        })
        .collect())
}

async fn load_author(db: &DatabaseConnection, post: &PostModel) -> AppResult<Option<UserModel>> {
    let Some(author_id) = post.author_id else {
        return Ok(None);
    };
    match AuthService::new(db.clone()).get_user_by_id(author_id).await {
        Ok(user) => Ok(Some(user)),
        Err(AppError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

async fn post_response(
    db: &DatabaseConnection,
    service: &PostService,
    post: PostModel,
) -> AppResult<PostResponse> {
    let author = load_author(db, &post).await?;
    let categories = service
        .categories_for_posts(&[post.id])
        .await?
        .remove(&post.id)
        .unwrap_or_default();
    Ok(PostResponse::new(post, author.as_ref(), categories))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts",
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Published posts, newest first", body = PaginatedResponse<PostSummary>),
    ),
    tag = "posts"
)]
pub async fn list_posts(
    Extension(db): Extension<DatabaseConnection>,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.resolve(blog_config().posts_per_page);

    let service = PostService::new(db);
    let (posts, total) = service.list_published(page, per_page).await?;
    let items = summarize(&service, posts).await?;

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post with visible comments", body = PostDetailResponse),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn get_post(
    Extension(db): Extension<DatabaseConnection>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let service = PostService::new(db.clone());
    let post = service.get_published(&slug).await?;

    let threads = CommentService::new(db.clone()).list_visible(post.id).await?;
    let comments: Vec<CommentThreadResponse> =
        threads.into_iter().map(CommentThreadResponse::from).collect();
    let comment_count = comments.iter().map(|t| 1 + t.replies.len()).sum();

    let post = post_response(&db, &service, post).await?;
    Ok(ApiResponse::ok(PostDetailResponse {
        post,
        comments,
        comment_count,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts",
    security(("jwt_token" = [])),
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Post created", body = PostResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 404, description = "Unknown category", body = AppError),
        (status = 409, description = "Slug already taken", body = AppError),
    ),
    tag = "posts"
)]
pub async fn create_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate().map_err(|e| AppError::validation(&e))?;

    let draft = PostDraft {
        title: payload.title,
        slug: payload.slug,
        body: payload.body,
        featured_image: payload.featured_image,
        status: payload.status.unwrap_or_default(),
        category_ids: payload.category_ids.unwrap_or_default(),
    };

    let service = PostService::new(db.clone());
    let post = service.create(Some(auth_user.user_id), draft).await?;

    let response = post_response(&db, &service, post).await?;
    Ok(ApiResponse::with_message(response, "Post created."))
}

#[utoipa::path(
    put,
    path = "/api/v1/posts/{slug}",
    security(("jwt_token" = [])),
    params(("slug" = String, Path, description = "Post slug")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post updated", body = PostResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 403, description = "Not the author", body = AppError),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn update_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<UpdatePostRequest>,
) -> AppResult<impl IntoResponse> {
    payload.validate().map_err(|e| AppError::validation(&e))?;

    let draft = PostDraft {
        title: payload.title,
        slug: None,
        body: payload.body,
        featured_image: payload.featured_image,
        status: payload.status.unwrap_or_default(),
        category_ids: payload.category_ids.unwrap_or_default(),
    };

    let service = PostService::new(db.clone());
    let post = service.update(&slug, auth_user.user_id, draft).await?;

    let response = post_response(&db, &service, post).await?;
    Ok(ApiResponse::with_message(response, "Post updated."))
}

#[utoipa::path(
    get,
    path = "/api/v1/search",
    params(
        ("q" = Option<String>, Query, description = "Search query"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Search results", body = PaginatedResponse<PostSummary>),
    ),
    tag = "posts"
)]
pub async fn search_posts(
    Extension(db): Extension<DatabaseConnection>,
    Query(params): Query<SearchPostsQuery>,
) -> AppResult<impl IntoResponse> {
    let q = params.q.as_deref().unwrap_or("").trim();
    if q.chars().count() > 200 {
        return Err(AppError::Validation(
            "Search query must be at most 200 characters".to_string(),
        ));
    }

    let (page, per_page) = PaginationQuery {
        page: params.page,
        per_page: params.per_page,
    }
    .resolve(blog_config().posts_per_page);

    let service = PostService::new(db);
    let (posts, total) = service.search(q, page, per_page).await?;
    let items = summarize(&service, posts).await?;

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn make_post(id: i32, body: &str) -> PostModel {
        let now = NaiveDateTime::default();
        PostModel {
            id,
            author_id: None,
            title: format!("Post {}", id),
            slug: format!("post-{}", id),
            body: body.to_string(),
            featured_image: None,
            status: PostStatus::Published,
            created_at: now,
            updated_at: now,
            published_at: Some(now),
        }
    }

    #[test]
    fn body_html_is_rendered() {
        let resp = PostResponse::new(make_post(1, "**bold** text"), None, Vec::new());
        assert!(resp.body_html.contains("<strong>bold</strong>"));
        assert_eq!(resp.body, "**bold** text");
    }

    #[test]
    fn missing_author_uses_placeholder() {
        let resp = PostResponse::new(make_post(1, "x"), None, Vec::new());
        assert_eq!(resp.author.id, None);
        assert_eq!(resp.author.username, crate::handlers::comment::DELETED_USER);
    }

    #[test]
    fn status_deserializes_from_column_spelling() {
        let req: CreatePostRequest = serde_json::from_str(
            r#"{"title":"T","body":"B","status":"PUBLISHED","category_ids":[1,2]}"#,
        )
        .unwrap();
        assert_eq!(req.status, Some(PostStatus::Published));
        assert_eq!(req.category_ids, Some(vec![1, 2]));
    }
}
