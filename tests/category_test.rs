mod common;

use serde_json::{json, Value};

#[tokio::test]
async fn admin_manages_categories() {
    let app = common::spawn_app().await;
    let (admin_id, token) = common::create_test_user(&app, "catadmin").await;
    common::make_admin(&app.db, admin_id).await;

    let resp = app
        .client
        .post(app.url("/admin/categories"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Web Development", "description": "Frontend and backend" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["slug"], "web-development");
    assert_eq!(body["data"]["color"], "primary");

    let resp = app
        .client
        .put(app.url("/admin/categories/web-development"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Web Dev", "color": "danger" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Web Dev");
    assert_eq!(body["data"]["slug"], "web-development");
    assert_eq!(body["data"]["color"], "danger");

    let body: Value = app
        .client
        .get(app.url("/categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Web Dev");

    let resp = app
        .client
        .delete(app.url("/admin/categories/web-development"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = app
        .client
        .get(app.url("/categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn non_admin_cannot_manage_categories() {
    let app = common::spawn_app().await;
    let (_user_id, token) = common::create_test_user(&app, "catuser").await;

    let resp = app
        .client
        .post(app.url("/admin/categories"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Sneaky" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .post(app.url("/admin/categories"))
        .json(&json!({ "name": "Anonymous" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn duplicate_category_conflicts() {
    let app = common::spawn_app().await;
    let (admin_id, token) = common::create_test_user(&app, "catdup").await;
    common::make_admin(&app.db, admin_id).await;

    let create = |name: &'static str| {
        app.client
            .post(app.url("/admin/categories"))
            .bearer_auth(&token)
            .json(&json!({ "name": name }))
            .send()
    };

    assert_eq!(create("Travel").await.unwrap().status(), 200);
    assert_eq!(create("Travel").await.unwrap().status(), 409);
    // Different name, same derived slug
    assert_eq!(create("travel!").await.unwrap().status(), 409);
}

#[tokio::test]
async fn deleting_category_keeps_posts() {
    let app = common::spawn_app().await;
    let (admin_id, token) = common::create_test_user(&app, "catdel").await;
    common::make_admin(&app.db, admin_id).await;

    let body: Value = app
        .client
        .post(app.url("/admin/categories"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Ephemeral" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let category_id = body["data"]["id"].as_i64().unwrap();

    common::create_post(
        &app,
        &token,
        json!({
            "title": "Survivor",
            "body": "still here",
            "status": "PUBLISHED",
            "category_ids": [category_id]
        }),
    )
    .await;

    let resp = app
        .client
        .delete(app.url("/admin/categories/ephemeral"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = app
        .client
        .get(app.url("/posts/survivor"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["data"]["post"]["categories"]
        .as_array()
        .unwrap()
        .is_empty());

    let resp = app
        .client
        .delete(app.url("/admin/categories/ephemeral"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
