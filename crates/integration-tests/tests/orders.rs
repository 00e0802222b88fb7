//! Order placement against a stub pizza factory.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use jwt_pizza_integration_tests::{FactoryMode, TestContext};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

#[tokio::test]
async fn test_order_accepted_by_factory() {
    let ctx = TestContext::new().await;
    let (menu_id, franchise_id, store_id) = ctx.seed_shop().await;
    let (diner, token) = ctx.register_diner().await;

    let resp = ctx
        .send(
            Method::POST,
            "/api/order",
            Some(&token),
            Some(json!({
                "franchiseId": franchise_id,
                "storeId": store_id,
                "items": [{"menuId": menu_id, "description": "Veggie", "price": 0.0038}]
            })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["jwt"], "factory.signed.token");
    assert_eq!(body["followLinkToEndChaos"], "https://factory.test/report/ok");
    assert_eq!(body["order"]["dinerId"], diner["id"]);
    assert_eq!(body["order"]["items"][0]["price"], 0.0038);

    let sent = ctx.factory_orders.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["diner"]["id"], diner["id"]);
    assert_eq!(sent[0]["order"]["storeId"], store_id);

    let resp = ctx.send(Method::GET, "/api/order", Some(&token), None).await;
    let history: Value = resp.json().await.unwrap();
    assert_eq!(history["dinerId"], diner["id"]);
    assert_eq!(history["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_rejected_by_factory() {
    let ctx = TestContext::with_factory(FactoryMode::Reject).await;
    let (menu_id, franchise_id, store_id) = ctx.seed_shop().await;
    let (_, token) = ctx.register_diner().await;

    let resp = ctx
        .send(
            Method::POST,
            "/api/order",
            Some(&token),
            Some(json!({
                "franchiseId": franchise_id,
                "storeId": store_id,
                "items": [{"menuId": menu_id, "description": "Veggie", "price": 0.0038}]
            })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Failed to fulfill order at factory");
    assert_eq!(body["followLinkToEndChaos"], "https://factory.test/report/fire");

    let resp = ctx.send(Method::GET, "/api/order", Some(&token), None).await;
    let history: Value = resp.json().await.unwrap();
    assert_eq!(history["orders"], json!([]));
}

#[tokio::test]
async fn test_order_requires_token() {
    let ctx = TestContext::new().await;
    let resp = ctx
        .send(
            Method::POST,
            "/api/order",
            None,
            Some(json!({"franchiseId": 1, "storeId": 1, "items": []})),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
