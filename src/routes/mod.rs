use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::auth::{auth_middleware, optional_auth_middleware};
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new().nest("/api/v1", api_routes())
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let auth = auth_routes(&rate_limit_config);
    let public_read = public_read_routes(&rate_limit_config);
    let comment_form = comment_form_routes(&rate_limit_config)
        .layer(middleware::from_fn(optional_auth_middleware));
    let protected =
        protected_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));

    auth.merge(public_read).merge(comment_form).merge(protected)
}

/// Auth routes: register, login.
fn auth_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/auth/register", routing::post(handlers::register))
        .route("/auth/login", routing::post(handlers::login));

    with_optional_rate_limit(router, config.enabled, config.auth)
}

/// Public read routes: all public GETs + search.
fn public_read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Posts
        .route("/posts", routing::get(handlers::post::list_posts))
        .route("/posts/{slug}", routing::get(handlers::post::get_post))
        // Comments
        .route(
            "/posts/{slug}/comments",
            routing::get(handlers::comment::list_comments),
        )
        // Search
        .route("/search", routing::get(handlers::post::search_posts))
        // Categories
        .route(
            "/categories",
            routing::get(handlers::category::list_categories),
        )
        .route(
            "/categories/{slug}/posts",
            routing::get(handlers::category::list_category_posts),
        );

    with_optional_rate_limit(router, config.enabled, config.public_read)
}

/// Comment submission: anonymous callers reach the handler and get a 401
/// with a readable message instead of a bare auth failure.
fn comment_form_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new().route(
        "/posts/{slug}/comments",
        routing::post(handlers::comment::create_comment),
    );

    with_optional_rate_limit(router, config.enabled, config.protected)
}

/// Protected routes: all authenticated writes.
fn protected_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Account
        .route("/auth/me", routing::get(handlers::get_current_user))
        .route(
            "/account/profile",
            routing::get(handlers::profile::get_profile).put(handlers::profile::update_profile),
        )
        // Posts
        .route("/posts", routing::post(handlers::post::create_post))
        .route("/posts/{slug}", routing::put(handlers::post::update_post))
        // Categories (admin only - checked in handler)
        .route(
            "/admin/categories",
            routing::post(handlers::category::create_category),
        )
        .route(
            "/admin/categories/{slug}",
            routing::put(handlers::category::update_category)
                .delete(handlers::category::delete_category),
        )
        // Moderation (moderators and admins - checked in handler)
        .route(
            "/admin/comments",
            routing::get(handlers::moderation::list_comments),
        )
        .route(
            "/admin/comments/{id}/active",
            routing::put(handlers::moderation::set_comment_active),
        );

    with_optional_rate_limit(router, config.enabled, config.protected)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    match GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    {
        Some(governor_conf) => router.layer(GovernorLayer::new(governor_conf)),
        None => {
            tracing::warn!(?rule, "invalid rate limit rule, leaving group unthrottled");
            router
        }
    }
}
