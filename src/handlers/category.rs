use crate::config::blog::blog_config;
use crate::error::{AppError, AppResult};
use crate::handlers::post::{summarize, PostSummary};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::{CategoryColor, CategoryModel};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::category::CategoryService;
use crate::services::post::PostService;
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Derived from the name when omitted
    #[validate(length(max = 255))]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub color: Option<CategoryColor>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub color: Option<CategoryColor>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub color: CategoryColor,
}

impl From<CategoryModel> for CategoryResponse {
    fn from(c: CategoryModel) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            description: c.description,
            color: c.color,
        }
    }
}

/// A category page: the category and a page of its published posts.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryPostsResponse {
    pub category: CategoryResponse,
    pub posts: PaginatedResponse<PostSummary>,
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "All categories by name", body = Vec<CategoryResponse>),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    Extension(db): Extension<DatabaseConnection>,
) -> AppResult<impl IntoResponse> {
    let categories = CategoryService::new(db).list().await?;
    let items: Vec<CategoryResponse> = categories.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{slug}/posts",
    params(
        ("slug" = String, Path, description = "Category slug"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Published posts in the category", body = CategoryPostsResponse),
        (status = 404, description = "Category not found", body = AppError),
    ),
    tag = "categories"
)]
pub async fn list_category_posts(
    Extension(db): Extension<DatabaseConnection>,
    Path(slug): Path<String>,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.resolve(blog_config().posts_per_page);

    let service = PostService::new(db);
    let (category, posts, total) = service.list_by_category(&slug, page, per_page).await?;
    let items = summarize(&service, posts).await?;

    Ok(ApiResponse::ok(CategoryPostsResponse {
        category: category.into(),
        posts: PaginatedResponse::new(items, total, page, per_page),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/categories",
    security(("jwt_token" = [])),
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 409, description = "Name or slug taken", body = AppError),
    ),
    tag = "categories"
)]
pub async fn create_category(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    payload.validate().map_err(|e| AppError::validation(&e))?;

    let category = CategoryService::new(db)
        .create(
            &payload.name,
            payload.slug.as_deref(),
            &payload.description,
            payload.color.unwrap_or_default(),
        )
        .await?;

    Ok(ApiResponse::ok(CategoryResponse::from(category)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/categories/{slug}",
    security(("jwt_token" = [])),
    params(("slug" = String, Path, description = "Category slug")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Category not found", body = AppError),
    ),
    tag = "categories"
)]
pub async fn update_category(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    payload.validate().map_err(|e| AppError::validation(&e))?;

    let category = CategoryService::new(db)
        .update(
            &slug,
            &payload.name,
            &payload.description,
            payload.color.unwrap_or_default(),
        )
        .await?;

    Ok(ApiResponse::ok(CategoryResponse::from(category)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/categories/{slug}",
    security(("jwt_token" = [])),
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category deleted", body = String),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Category not found", body = AppError),
    ),
    tag = "categories"
)]
pub async fn delete_category(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    CategoryService::new(db).delete(&slug).await?;
    Ok(ApiResponse::ok("Category deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_defaults_when_omitted() {
        let req: CreateCategoryRequest = serde_json::from_str(r#"{"name":"Rust"}"#).unwrap();
        assert_eq!(req.color.unwrap_or_default(), CategoryColor::Primary);
        assert!(req.description.is_empty());
    }

    #[test]
    fn unknown_color_is_rejected() {
        let res: Result<CreateCategoryRequest, _> =
            serde_json::from_str(r#"{"name":"Rust","color":"purple"}"#);
        assert!(res.is_err());
    }
}
