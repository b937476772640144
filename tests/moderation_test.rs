mod common;

use quillpress::models::Comment;
use sea_orm::EntityTrait;
use serde_json::{json, Value};

struct Thread {
    slug: String,
    a: i64,
    b: i64,
    c: i64,
}

/// A published post with comment A, reply B and reply-to-reply C.
async fn seed_thread(app: &common::TestApp, token: &str) -> Thread {
    let slug = common::create_published_post(app, token).await;
    let a = common::comment_id(app, token, &slug, "Comment A", None).await;
    let b = common::comment_id(app, token, &slug, "Reply B", Some(a)).await;
    let c = common::comment_id(app, token, &slug, "Reply C", Some(b)).await;
    Thread { slug, a, b, c }
}

async fn set_active(
    app: &common::TestApp,
    token: &str,
    id: i64,
    active: bool,
) -> reqwest::Response {
    app.client
        .put(app.url(&format!("/admin/comments/{}/active", id)))
        .bearer_auth(token)
        .json(&json!({ "active": active }))
        .send()
        .await
        .unwrap()
}

async fn visible_threads(app: &common::TestApp, slug: &str) -> Vec<Value> {
    let body: Value = app
        .client
        .get(app.url(&format!("/posts/{}/comments", slug)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["data"].as_array().unwrap().clone()
}

#[tokio::test]
async fn regular_user_cannot_moderate() {
    let app = common::spawn_app().await;
    let (_user_id, token) = common::create_test_user(&app, "plain").await;
    let thread = seed_thread(&app, &token).await;

    let resp = set_active(&app, &token, thread.a, false).await;
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .get(app.url("/admin/comments"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    assert_eq!(visible_threads(&app, &thread.slug).await.len(), 1);
}

#[tokio::test]
async fn hiding_root_hides_whole_thread() {
    let app = common::spawn_app().await;
    let (_user_id, token) = common::create_test_user(&app, "member").await;
    let (mod_id, mod_token) = common::create_test_user(&app, "mod").await;
    common::make_moderator(&app.db, mod_id).await;
    let thread = seed_thread(&app, &token).await;

    let resp = set_active(&app, &mod_token, thread.a, false).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Comment hidden.");
    assert_eq!(body["data"]["visibility"], "hidden");
    assert_ne!(body["data"]["author"]["username"], "deleted user");

    assert!(visible_threads(&app, &thread.slug).await.is_empty());

    for id in [thread.b, thread.c] {
        let stored = Comment::find_by_id(id as i32)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.active, "reply {} should keep its own flag", id);
    }

    let resp = set_active(&app, &mod_token, thread.a, true).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Comment approved.");

    let threads = visible_threads(&app, &thread.slug).await;
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0]["replies"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn hiding_reply_keeps_siblings() {
    let app = common::spawn_app().await;
    let (admin_id, token) = common::create_test_user(&app, "boss").await;
    common::make_admin(&app.db, admin_id).await;
    let thread = seed_thread(&app, &token).await;

    let resp = set_active(&app, &token, thread.b, false).await;
    assert_eq!(resp.status(), 200);

    let threads = visible_threads(&app, &thread.slug).await;
    let replies = threads[0]["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], thread.c);
}

#[tokio::test]
async fn moderation_queue_filters() {
    let app = common::spawn_app().await;
    let (mod_id, token) = common::create_test_user(&app, "queue").await;
    common::make_moderator(&app.db, mod_id).await;
    let thread = seed_thread(&app, &token).await;

    set_active(&app, &token, thread.c, false).await;

    let body: Value = app
        .client
        .get(app.url("/admin/comments"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["per_page"], 20);
    assert_eq!(body["data"]["items"][0]["id"], thread.c);

    let body: Value = app
        .client
        .get(app.url("/admin/comments?active=false"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], thread.c);

    let body: Value = app
        .client
        .get(app.url("/admin/comments?q=REPLY"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 2);

    let body: Value = app
        .client
        .get(app.url("/admin/comments?active=true&q=reply"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], thread.b);
}

#[tokio::test]
async fn unknown_comment_is_not_found() {
    let app = common::spawn_app().await;
    let (mod_id, token) = common::create_test_user(&app, "seeker").await;
    common::make_moderator(&app.db, mod_id).await;

    let resp = set_active(&app, &token, 424_242, false).await;
    assert_eq!(resp.status(), 404);
}

async fn queue_total(app: &common::TestApp, token: &str, query: &str) -> u64 {
    let body: Value = app
        .client
        .get(app.url("/admin/comments"))
        .query(&[("q", query)])
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["data"]["total"].as_u64().unwrap()
}

#[tokio::test]
async fn queue_search_treats_wildcards_literally() {
    let app = common::spawn_app().await;
    let (mod_id, token) = common::create_test_user(&app, "literal").await;
    common::make_moderator(&app.db, mod_id).await;
    let slug = common::create_published_post(&app, &token).await;

    common::comment_id(&app, &token, &slug, "plain text", None).await;
    common::comment_id(&app, &token, &slug, "100% sure", None).await;

    assert_eq!(queue_total(&app, &token, "%").await, 1);
    // "t_x" would match "text" if the underscore were a wildcard
    assert_eq!(queue_total(&app, &token, "t_x").await, 0);
    assert_eq!(queue_total(&app, &token, "0% s").await, 1);
}

#[tokio::test]
async fn queue_search_matches_author_username() {
    let app = common::spawn_app().await;
    let (mod_id, mod_token) = common::create_test_user(&app, "warden").await;
    common::make_moderator(&app.db, mod_id).await;
    let (_spammer_id, spammer) = common::create_test_user(&app, "zanzibar").await;
    let slug = common::create_published_post(&app, &mod_token).await;

    common::comment_id(&app, &spammer, &slug, "first pitch", None).await;
    common::comment_id(&app, &spammer, &slug, "second pitch", None).await;
    common::comment_id(&app, &mod_token, &slug, "unrelated remark", None).await;

    assert_eq!(queue_total(&app, &mod_token, "ZANZIBAR").await, 2);
    assert_eq!(queue_total(&app, &mod_token, "remark").await, 1);
}
