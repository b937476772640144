use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use quillpress::{config, handlers, middleware, migration, routes, utils};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use std::env;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Auth routes
        handlers::register,
        handlers::login,
        handlers::get_current_user,
        // Account routes
        handlers::profile::get_profile,
        handlers::profile::update_profile,
        // Post routes
        handlers::post::list_posts,
        handlers::post::get_post,
        handlers::post::create_post,
        handlers::post::update_post,
        handlers::post::search_posts,
        // Category routes
        handlers::category::list_categories,
        handlers::category::list_category_posts,
        handlers::category::create_category,
        handlers::category::update_category,
        handlers::category::delete_category,
        // Comment routes
        handlers::comment::list_comments,
        handlers::comment::create_comment,
        // Moderation routes
        handlers::moderation::list_comments,
        handlers::moderation::set_comment_active,
    ),
    components(
        schemas(
            quillpress::response::ApiResponse<serde_json::Value>,
            quillpress::response::PaginatedResponse<serde_json::Value>,
            quillpress::response::PaginationQuery,
            quillpress::error::AppError,
            // Auth
            handlers::auth::RegisterRequest,
            handlers::auth::LoginRequest,
            handlers::auth::AuthResponse,
            handlers::auth::UserResponse,
            // Account
            handlers::profile::ProfileResponse,
            handlers::profile::UpdateProfileRequest,
            // Post
            handlers::post::PostSummary,
            handlers::post::PostResponse,
            handlers::post::PostDetailResponse,
            handlers::post::CreatePostRequest,
            handlers::post::UpdatePostRequest,
            handlers::post::SearchPostsQuery,
            // Category
            handlers::category::CategoryResponse,
            handlers::category::CategoryPostsResponse,
            handlers::category::CreateCategoryRequest,
            handlers::category::UpdateCategoryRequest,
            // Comment
            handlers::comment::AuthorSummary,
            handlers::comment::CommentResponse,
            handlers::comment::CommentThreadResponse,
            handlers::comment::CommentPostedResponse,
            handlers::comment::CreateCommentRequest,
            // Moderation
            handlers::moderation::ModerationQuery,
            handlers::moderation::SetActiveRequest,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Authentication operations"),
        (name = "account", description = "Own profile operations"),
        (name = "posts", description = "Post operations"),
        (name = "categories", description = "Category operations"),
        (name = "comments", description = "Comment threads on posts"),
        (name = "moderation", description = "Comment moderation"),
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    init_tracing();

    // Validate configuration before doing anything else
    let jwt_config = validate_config()?;

    // Initialize JWT config
    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!("Starting quillpress v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::database::get_database().await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let app = create_app().layer(Extension(db));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// `LOG_FORMAT=json` switches to structured output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quillpress=debug,tower_http=debug".into());
    let json = env::var("LOG_FORMAT")
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<config::jwt::JwtConfig> {
    // JWT config, validated and cached
    let jwt_config = config::jwt::JwtConfig::from_env()?;

    // DATABASE_URL is only checked here; the connection happens later
    if env::var("DATABASE_URL").is_err() {
        return Err(anyhow::anyhow!(
            "DATABASE_URL environment variable must be set"
        ));
    }

    if let Ok(raw) = env::var("BCRYPT_COST") {
        let cost: u32 = raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("BCRYPT_COST must be an integer, got '{}'", raw))?;
        if !(4..=31).contains(&cost) {
            return Err(anyhow::anyhow!("BCRYPT_COST must be between 4 and 31"));
        }
    }

    let blog = config::blog::blog_config();
    tracing::debug!(
        posts_per_page = blog.posts_per_page,
        default_avatar = %blog.default_avatar_url,
        "blog settings loaded"
    );

    Ok(jwt_config)
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app() -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors_layer())
                // CorsLayer requires a `Default` response body; re-box the trace body.
                .layer(MapResponseBodyLayer::new(axum::body::Body::new))
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(
                    middleware::security::security_headers_middleware,
                )),
        )
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db.ping().await.is_ok();
    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "quillpress",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
