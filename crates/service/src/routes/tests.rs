//! Router-level tests over the in-memory store.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

use crate::config::{FactoryConfig, JwtConfig, PizzaConfig};
use crate::db::{MemoryStore, PizzaStore, SessionStore};
use crate::services::AuthService;
use crate::state::AppState;

const SECRET: &str = "k9#Qv2!xR7@mZ4$wT1^pL8&nB5*cY3%d";

struct TestApp {
    router: Router,
    state: AppState,
    store: Arc<MemoryStore>,
}

impl TestApp {
    async fn new(factory_url: &str) -> Self {
        Self::with_ttl(factory_url, Duration::from_secs(3600)).await
    }

    async fn with_ttl(factory_url: &str, ttl: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        AuthService::new(store.as_ref())
            .ensure_admin("admin", "a@jwt.com", "admin")
            .await
            .unwrap();

        let config = PizzaConfig::new(
            JwtConfig {
                secret: SecretString::from(SECRET),
                ttl,
            },
            FactoryConfig {
                url: Url::parse(factory_url).unwrap(),
                api_key: SecretString::from("factory-key"),
            },
        );
        let shared: Arc<dyn PizzaStore> = store.clone();
        let state = AppState::new(config, shared).unwrap();

        Self {
            router: crate::app(state.clone()),
            state,
            store,
        }
    }

    async fn offline() -> Self {
        Self::new("http://127.0.0.1:9").await
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> (i64, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth",
                None,
                Some(json!({"name": name, "email": email, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (
            body["user"]["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::PUT,
                "/api/auth",
                None,
                Some(json!({"email": email, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login("a@jwt.com", "admin").await
    }
}

#[tokio::test]
async fn test_register_missing_fields() {
    let app = TestApp::offline().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth",
            None,
            Some(json!({"name": "pizza diner", "email": "d@jwt.com"})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "name, email, and password are required");
}

#[tokio::test]
async fn test_login_missing_fields() {
    let app = TestApp::offline().await;
    let (status, body) = app
        .call(Method::PUT, "/api/auth", None, Some(json!({"email": "a@jwt.com"})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "email and password are required");
}

#[tokio::test]
async fn test_register_token_works_immediately() {
    let app = TestApp::offline().await;
    let (id, token) = app.register("pizza diner", "d@jwt.com", "diner").await;

    let (status, me) = app.call(Method::GET, "/api/user/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], id);
    assert_eq!(me["roles"], json!([{"role": "diner"}]));
    assert!(me.get("password").is_none());
}

#[tokio::test]
async fn test_bad_login_is_unauthorized() {
    let app = TestApp::offline().await;
    let (status, body) = app
        .call(
            Method::PUT,
            "/api/auth",
            None,
            Some(json!({"email": "a@jwt.com", "password": "wrong"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "unauthorized");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::offline().await;
    app.register("one", "d@jwt.com", "diner").await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth",
            None,
            Some(json!({"name": "two", "email": "d@jwt.com", "password": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::offline().await;
    let (_, token) = app.register("pizza diner", "d@jwt.com", "diner").await;

    let (status, body) = app.call(Method::DELETE, "/api/auth", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "logout successful");

    let (status, body) = app.call(Method::GET, "/api/user/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "unauthorized");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::offline().await;
    let (status, _) = app.call(Method::GET, "/api/user/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/api/user/me", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_self_rotates_token() {
    let app = TestApp::offline().await;
    let (id, old_token) = app.register("pizza diner", "d@jwt.com", "diner").await;

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/user/{id}"),
            Some(&old_token),
            Some(json!({"name": "renamed", "email": "d2@jwt.com", "password": "new"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["name"], "renamed");
    let new_token = body["token"].as_str().unwrap().to_string();

    let (status, _) = app.call(Method::GET, "/api/user/me", Some(&old_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = app.call(Method::GET, "/api/user/me", Some(&new_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "d2@jwt.com");

    app.login("d2@jwt.com", "new").await;
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = TestApp::with_ttl("http://127.0.0.1:9", Duration::ZERO).await;
    let (_, token) = app.register("pizza diner", "d@jwt.com", "diner").await;

    let (status, body) = app.call(Method::GET, "/api/user/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "unauthorized");
}

#[tokio::test]
async fn test_admin_update_returns_target_token() {
    let app = TestApp::offline().await;
    let admin = app.admin_token().await;
    let (diner_id, diner_token) = app.register("pizza diner", "d@jwt.com", "diner").await;

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/user/{diner_id}"),
            Some(&admin),
            Some(json!({"name": "renamed by admin"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["id"], diner_id);
    let fresh = body["token"].as_str().unwrap().to_string();

    let (status, me) = app.call(Method::GET, "/api/user/me", Some(&fresh), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], diner_id);
    assert_eq!(me["name"], "renamed by admin");

    let (status, _) = app
        .call(Method::GET, "/api/user/me", Some(&diner_token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = app.call(Method::GET, "/api/user/me", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "a@jwt.com");
}

#[tokio::test]
async fn test_email_is_case_insensitive() {
    let app = TestApp::offline().await;
    app.register("one", "dup@jwt.com", "diner").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth",
            None,
            Some(json!({"name": "two", "email": "DUP@jwt.com", "password": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let token = app.login("Dup@JWT.com", "diner").await;
    let (_, me) = app.call(Method::GET, "/api/user/me", Some(&token), None).await;
    assert_eq!(me["email"], "dup@jwt.com");
}

#[tokio::test]
async fn test_update_other_user_forbidden() {
    let app = TestApp::offline().await;
    let (victim, _) = app.register("victim", "v@jwt.com", "v").await;
    let (_, token) = app.register("mallory", "m@jwt.com", "m").await;

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/user/{victim}"),
            Some(&token),
            Some(json!({"name": "pwned"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_non_admin_gets_403() {
    let app = TestApp::offline().await;
    let (_, token) = app.register("pizza diner", "d@jwt.com", "diner").await;

    let checks = [
        (Method::GET, "/api/user", None),
        (Method::DELETE, "/api/user/1", None),
        (
            Method::PUT,
            "/api/order/menu",
            Some(json!({"title": "x", "description": "y", "image": "z.png", "price": 0.01})),
        ),
        (
            Method::POST,
            "/api/franchise",
            Some(json!({"name": "pizzaPocket", "admins": []})),
        ),
    ];
    for (method, uri, body) in checks {
        let (status, _) = app.call(method.clone(), uri, Some(&token), body).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_admin_lists_and_deletes_users() {
    let app = TestApp::offline().await;
    let admin = app.admin_token().await;
    let (id, _) = app.register("pizza diner", "d@jwt.com", "diner").await;
    app.register("other diner", "o@jwt.com", "diner").await;

    let (status, body) = app
        .call(Method::GET, "/api/user?page=0&limit=1&name=pizza*", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
    assert_eq!(body["users"][0]["id"], id);
    assert_eq!(body["more"], false);

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/user/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (_, body) = app
        .call(Method::GET, "/api/user?limit=100", Some(&admin), None)
        .await;
    assert!(
        body["users"]
            .as_array()
            .unwrap()
            .iter()
            .all(|u| u["id"] != id)
    );

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/user/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_franchise_lifecycle() {
    let app = TestApp::offline().await;
    let admin = app.admin_token().await;
    let (owner_id, owner) = app.register("franchisee", "f@jwt.com", "f").await;
    let (_, stranger) = app.register("stranger", "s@jwt.com", "s").await;

    let (status, franchise) = app
        .call(
            Method::POST,
            "/api/franchise",
            Some(&admin),
            Some(json!({"name": "pizzaPocket", "admins": [{"email": "f@jwt.com"}]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{franchise}");
    let fid = franchise["id"].as_i64().unwrap();
    assert_eq!(franchise["admins"][0]["id"], owner_id);

    // The owner's token predates the role, but store rights come from the franchise.
    let (status, store) = app
        .call(
            Method::POST,
            &format!("/api/franchise/{fid}/store"),
            Some(&owner),
            Some(json!({"name": "SLC"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{store}");
    assert_eq!(store["franchiseId"], fid);
    let sid = store["id"].as_i64().unwrap();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/franchise/{fid}/store"),
            Some(&stranger),
            Some(json!({"name": "Provo"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "unable to create a store");

    let (status, body) = app
        .call(Method::GET, &format!("/api/franchise/{owner_id}"), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (_, body) = app
        .call(Method::GET, &format!("/api/franchise/{owner_id}"), Some(&owner), None)
        .await;
    assert_eq!(body[0]["id"], fid);

    let (status, public) = app.call(Method::GET, "/api/franchise", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(public["franchises"][0].get("admins").is_none());

    let (_, detailed) = app
        .call(Method::GET, "/api/franchise", Some(&admin), None)
        .await;
    assert_eq!(detailed["franchises"][0]["admins"][0]["email"], "f@jwt.com");

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/franchise/{fid}/store/{sid}"),
            Some(&stranger),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "unable to delete a store");

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/franchise/{fid}/store/{sid}"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/franchise/{fid}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.call(Method::GET, "/api/franchise", None, None).await;
    assert_eq!(body["franchises"], json!([]));
}

#[tokio::test]
async fn test_create_franchise_unknown_admin() {
    let app = TestApp::offline().await;
    let admin = app.admin_token().await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/franchise",
            Some(&admin),
            Some(json!({"name": "ghost", "admins": [{"email": "nobody@jwt.com"}]})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_menu_is_public_and_admin_extends_it() {
    let app = TestApp::offline().await;
    let admin = app.admin_token().await;

    let (status, menu) = app.call(Method::GET, "/api/order/menu", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(menu, json!([]));

    let (status, menu) = app
        .call(
            Method::PUT,
            "/api/order/menu",
            Some(&admin),
            Some(json!({"title": "Student", "description": "No topping, no sauce, just carbs", "image": "pizza9.png", "price": 0.0001})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{menu}");
    assert_eq!(menu[0]["title"], "Student");
    assert_eq!(menu[0]["price"], 0.0001);
}

#[tokio::test]
async fn test_order_fails_cleanly_when_factory_unreachable() {
    let app = TestApp::offline().await;
    let admin = app.admin_token().await;
    let (_, diner) = app.register("pizza diner", "d@jwt.com", "diner").await;

    app.call(
        Method::PUT,
        "/api/order/menu",
        Some(&admin),
        Some(json!({"title": "Veggie", "description": "A garden", "image": "pizza1.png", "price": 0.0038})),
    )
    .await;
    let (_, franchise) = app
        .call(
            Method::POST,
            "/api/franchise",
            Some(&admin),
            Some(json!({"name": "pizzaPocket", "admins": []})),
        )
        .await;
    let fid = franchise["id"].as_i64().unwrap();
    let (_, store) = app
        .call(
            Method::POST,
            &format!("/api/franchise/{fid}/store"),
            Some(&admin),
            Some(json!({"name": "SLC"})),
        )
        .await;

    let order = json!({
        "franchiseId": fid,
        "storeId": store["id"],
        "items": [{"menuId": 1, "description": "Veggie", "price": 0.0038}]
    });
    let (status, body) = app
        .call(Method::POST, "/api/order", Some(&diner), Some(order))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to fulfill order at factory");

    let (_, history) = app.call(Method::GET, "/api/order", Some(&diner), None).await;
    assert_eq!(history["orders"], json!([]));
    assert_eq!(history["page"], 1);
}

#[tokio::test]
async fn test_order_for_unknown_store_rejected() {
    let app = TestApp::offline().await;
    let (_, diner) = app.register("pizza diner", "d@jwt.com", "diner").await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/order",
            Some(&diner),
            Some(json!({"franchiseId": 9, "storeId": 9, "items": []})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_with_out_of_range_price_rejected() {
    let app = TestApp::offline().await;
    let (_, diner) = app.register("pizza diner", "d@jwt.com", "diner").await;
    let order = json!({
        "franchiseId": 1,
        "storeId": 1,
        "items": [{"menuId": 1, "description": "Veggie", "price": 1e21}]
    });

    let (status, _) = app
        .call(Method::POST, "/api/order", Some(&diner), Some(order))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.call(Method::GET, "/api/franchise", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.state.metrics().snapshot(0).pizzas_sold, 0);
}

#[tokio::test]
async fn test_unknown_endpoint() {
    let app = TestApp::offline().await;
    for (method, uri) in [(Method::GET, "/api/nope"), (Method::PATCH, "/api/auth")] {
        let (status, body) = app.call(method, uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "unknown endpoint");
    }
}

#[tokio::test]
async fn test_welcome_docs_and_health() {
    let app = TestApp::offline().await;

    let (status, body) = app.call(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "welcome to JWT Pizza");

    let (status, body) = app.call(Method::GET, "/api/docs", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["db"], "memory");
    assert!(!body["endpoints"].as_array().unwrap().is_empty());

    let (status, _) = app.call(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_count_requests_and_logins() {
    let app = TestApp::offline().await;
    app.admin_token().await;
    app.call(
        Method::PUT,
        "/api/auth",
        None,
        Some(json!({"email": "a@jwt.com", "password": "nope"})),
    )
    .await;

    let snapshot = app.state.metrics().snapshot(app.store.count_active_users().await.unwrap());
    assert_eq!(snapshot.auth_success, 1);
    assert_eq!(snapshot.auth_failure, 1);
    assert_eq!(snapshot.requests_put, 2);
    assert_eq!(snapshot.active_users, 1);
}
