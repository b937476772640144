#![allow(dead_code)]

use quillpress::models::{post, user, PostStatus, Role, User};
use reqwest::Client;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Once,
};

static INIT: Once = Once::new();
static USER_COUNTER: AtomicUsize = AtomicUsize::new(0);
static POST_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        // Cheap hashing and no throttling for the test suite
        std::env::set_var("BCRYPT_COST", "4");
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        std::env::set_var("ENABLE_HSTS", "false");
        let config = quillpress::config::jwt::JwtConfig::from_env().unwrap();
        let _ = quillpress::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }
}

/// Fresh in-memory database with the schema applied. Every call gets its own
/// database, so tests never see each other's rows.
pub async fn setup_db() -> DatabaseConnection {
    init_env();

    let db = quillpress::config::database::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    quillpress::migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn spawn_app() -> TestApp {
    let db = setup_db().await;

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "ok" }))
        .merge(quillpress::routes::create_routes())
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::Extension(db.clone()))
                .layer(axum::middleware::from_fn(
                    quillpress::middleware::security::security_headers_middleware,
                )),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client: Client::new(),
    }
}

/// Register a user and return (user_id, token).
pub async fn create_test_user(app: &TestApp, username_prefix: &str) -> (i32, String) {
    let counter = USER_COUNTER.fetch_add(1, Ordering::SeqCst);
    let username = format!("{}_{}", username_prefix, counter);

    let resp = app
        .client
        .post(app.url("/auth/register"))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@test.com", username),
            "password1": "test_password_123",
            "password2": "test_password_123"
        }))
        .send()
        .await
        .expect("Failed to register user");

    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse register response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!(
            "Failed to register user '{}': status={}, body={}",
            username, status, body
        );
    }

    let user_id = body["data"]["user_id"].as_i64().expect("missing user_id") as i32;
    let token = body["data"]["token"]
        .as_str()
        .expect("missing token")
        .to_string();
    (user_id, token)
}

pub async fn set_role(db: &DatabaseConnection, user_id: i32, role: Role) {
    let user = User::find_by_id(user_id)
        .one(db)
        .await
        .unwrap()
        .expect("user exists");
    let mut active: user::ActiveModel = user.into();
    active.role = Set(role.as_str().to_string());
    active.update(db).await.expect("Failed to update role");
}

pub async fn make_admin(db: &DatabaseConnection, user_id: i32) {
    set_role(db, user_id, Role::Admin).await;
}

pub async fn make_moderator(db: &DatabaseConnection, user_id: i32) {
    set_role(db, user_id, Role::Moderator).await;
}

/// Create a post over HTTP and return the response body's `data`.
pub async fn create_post(app: &TestApp, token: &str, payload: Value) -> Value {
    let resp = app
        .client
        .post(app.url("/posts"))
        .bearer_auth(token)
        .json(&payload)
        .send()
        .await
        .expect("Failed to create post");

    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse post response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!("Failed to create post: status={}, body={}", status, body);
    }
    body["data"].clone()
}

/// Create a published post and return its slug.
pub async fn create_published_post(app: &TestApp, token: &str) -> String {
    let counter = POST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let data = create_post(
        app,
        token,
        serde_json::json!({
            "title": format!("Published Post {}", counter),
            "body": "Some **markdown** body",
            "status": "PUBLISHED"
        }),
    )
    .await;
    data["slug"].as_str().expect("missing slug").to_string()
}

pub async fn post_comment(
    app: &TestApp,
    token: Option<&str>,
    slug: &str,
    body: &str,
    parent_id: Option<i64>,
) -> reqwest::Response {
    let mut req = app
        .client
        .post(app.url(&format!("/posts/{}/comments", slug)))
        .json(&serde_json::json!({
            "body": body,
            "parent_id": parent_id
        }));
    if let Some(token) = token {
        req = req.bearer_auth(token);
    }
    req.send().await.expect("Failed to post comment")
}

/// Post a comment that must succeed and return its id.
pub async fn comment_id(
    app: &TestApp,
    token: &str,
    slug: &str,
    body: &str,
    parent_id: Option<i64>,
) -> i64 {
    let resp = post_comment(app, Some(token), slug, body, parent_id).await;
    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse comment response");
    assert_eq!(status, 200, "comment failed: {}", body);
    body["data"]["id"].as_i64().expect("missing comment id")
}

/// Insert a user row directly, bypassing registration.
pub async fn insert_user(db: &DatabaseConnection, username: &str) -> i32 {
    let now = chrono::Utc::now().naive_utc();
    user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@test.com", username)),
        password_hash: Set("not-a-real-hash".to_string()),
        role: Set(Role::User.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
    .id
}

/// Insert a post row directly and return its id.
pub async fn insert_post(
    db: &DatabaseConnection,
    author_id: i32,
    slug: &str,
    status: PostStatus,
) -> i32 {
    let now = chrono::Utc::now().naive_utc();
    post::ActiveModel {
        author_id: Set(Some(author_id)),
        title: Set(slug.replace('-', " ")),
        slug: Set(slug.to_string()),
        body: Set("body".to_string()),
        featured_image: Set(None),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
        published_at: Set((status == PostStatus::Published).then_some(now)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert post")
    .id
}
