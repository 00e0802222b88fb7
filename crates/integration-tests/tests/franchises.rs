//! Franchise visibility and store management.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use jwt_pizza_integration_tests::TestContext;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

#[tokio::test]
async fn test_other_users_franchises_are_empty() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;
    let (owner, owner_token) = ctx.register_diner().await;
    let (_, other_token) = ctx.register_diner().await;

    let resp = ctx
        .send(
            Method::POST,
            "/api/franchise",
            Some(&admin),
            Some(json!({"name": "pizzaPocket", "admins": [{"email": owner["email"]}]})),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let owner_id = owner["id"].as_i64().unwrap();
    let path = format!("/api/franchise/{owner_id}");

    let mine: Value = ctx
        .send(Method::GET, &path, Some(&owner_token), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let resp = ctx.send(Method::GET, &path, Some(&other_token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let theirs: Value = resp.json().await.unwrap();
    assert_eq!(theirs, json!([]));
}

#[tokio::test]
async fn test_diner_cannot_create_franchise() {
    let ctx = TestContext::new().await;
    let (_, token) = ctx.register_diner().await;

    let resp = ctx
        .send(
            Method::POST,
            "/api/franchise",
            Some(&token),
            Some(json!({"name": "rogue", "admins": []})),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "unable to create a franchise");
}

#[tokio::test]
async fn test_public_listing_paginates() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin_token().await;
    for name in ["alpha", "beta", "gamma"] {
        ctx.send(
            Method::POST,
            "/api/franchise",
            Some(&admin),
            Some(json!({"name": name, "admins": []})),
        )
        .await;
    }

    let page: Value = ctx
        .send(Method::GET, "/api/franchise?page=0&limit=2", None, None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(page["franchises"].as_array().unwrap().len(), 2);
    assert_eq!(page["more"], true);

    let filtered: Value = ctx
        .send(Method::GET, "/api/franchise?name=g*", None, None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(filtered["franchises"][0]["name"], "gamma");
    assert_eq!(filtered["more"], false);
}
