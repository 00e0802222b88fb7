//! Integration test harness for the JWT Pizza service.
//!
//! Each [`TestContext`] starts the real router on an ephemeral port, backed
//! by the in-memory store, next to a stub pizza factory and a stub log
//! collector. Tests then drive it over HTTP with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p jwt-pizza-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use reqwest::{Client, Response};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

use jwt_pizza_service::config::{FactoryConfig, JwtConfig, PizzaConfig, TelemetryConfig};
use jwt_pizza_service::db::{MemoryStore, PizzaStore};
use jwt_pizza_service::services::AuthService;
use jwt_pizza_service::state::AppState;

/// Key the stub factory expects.
pub const FACTORY_API_KEY: &str = "factory-test-key";

/// Default admin seeded into every context.
pub const ADMIN_EMAIL: &str = "a@jwt.com";
pub const ADMIN_PASSWORD: &str = "admin";

/// How the stub factory answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryMode {
    /// Bake every order.
    Accept,
    /// Refuse every order with a report link.
    Reject,
}

#[derive(Clone)]
struct FactoryStub {
    mode: FactoryMode,
    received: Arc<Mutex<Vec<Value>>>,
}

async fn factory_order(
    State(stub): State<FactoryStub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let expected = format!("Bearer {FACTORY_API_KEY}");
    if headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        != Some(expected.as_str())
    {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "bad api key"})),
        );
    }

    stub.received.lock().unwrap().push(body);
    match stub.mode {
        FactoryMode::Accept => (
            StatusCode::OK,
            Json(json!({"jwt": "factory.signed.token", "reportUrl": "https://factory.test/report/ok"})),
        ),
        FactoryMode::Reject => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "oven on fire", "reportUrl": "https://factory.test/report/fire"})),
        ),
    }
}

async fn collect(State(sink): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>) {
    sink.lock().unwrap().push(body);
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A running service plus its collaborators.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    /// Bodies the stub factory received.
    pub factory_orders: Arc<Mutex<Vec<Value>>>,
    /// Entries the stub log collector received.
    pub log_entries: Arc<Mutex<Vec<Value>>>,
}

impl TestContext {
    /// Start a service whose factory accepts every order.
    pub async fn new() -> Self {
        Self::with_factory(FactoryMode::Accept).await
    }

    /// Start a service with the given factory behaviour.
    pub async fn with_factory(mode: FactoryMode) -> Self {
        let factory_orders: Arc<Mutex<Vec<Value>>> = Arc::default();
        let factory = Router::new()
            .route("/api/order", post(factory_order))
            .with_state(FactoryStub {
                mode,
                received: Arc::clone(&factory_orders),
            });
        let factory_addr = spawn(factory).await;

        let log_entries: Arc<Mutex<Vec<Value>>> = Arc::default();
        let collector = Router::new()
            .route("/logs", post(collect))
            .with_state(Arc::clone(&log_entries));
        let collector_addr = spawn(collector).await;

        let store = MemoryStore::new();
        AuthService::new(&store)
            .ensure_admin("常用名字", ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .unwrap();

        let mut config = PizzaConfig::new(
            JwtConfig {
                secret: SecretString::from("k9#Qv2!xR7@mZ4$wT1^pL8&nB5*cY3%d"),
                ttl: Duration::from_secs(3600),
            },
            FactoryConfig {
                url: Url::parse(&format!("http://{factory_addr}")).unwrap(),
                api_key: SecretString::from(FACTORY_API_KEY),
            },
        );
        config.telemetry = TelemetryConfig {
            log_url: Some(Url::parse(&format!("http://{collector_addr}/logs")).unwrap()),
            ..TelemetryConfig::default()
        };

        let store: Arc<dyn PizzaStore> = Arc::new(store);
        let state = AppState::new(config, store).unwrap();
        let addr = spawn(jwt_pizza_service::app(state)).await;

        Self {
            client: Client::new(),
            base_url: format!("http://{addr}"),
            factory_orders,
            log_entries,
        }
    }

    /// Absolute URL for a path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a JSON request, optionally with a bearer token.
    pub async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.unwrap()
    }

    /// Register a diner with a unique email. Returns `(user, token)`.
    pub async fn register_diner(&self) -> (Value, String) {
        let email = format!("{}@test.com", Uuid::new_v4().simple());
        let resp = self
            .send(
                reqwest::Method::POST,
                "/api/auth",
                None,
                Some(json!({"name": "pizza diner", "email": email, "password": "diner"})),
            )
            .await;
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        let token = body["token"].as_str().unwrap().to_string();
        (body["user"].clone(), token)
    }

    /// Login as the seeded admin.
    pub async fn admin_token(&self) -> String {
        let resp = self
            .send(
                reqwest::Method::PUT,
                "/api/auth",
                None,
                Some(json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD})),
            )
            .await;
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Create a menu item, a franchise and a store. Returns
    /// `(menu_id, franchise_id, store_id)`.
    pub async fn seed_shop(&self) -> (i64, i64, i64) {
        let admin = self.admin_token().await;

        let menu: Value = self
            .send(
                reqwest::Method::PUT,
                "/api/order/menu",
                Some(&admin),
                Some(json!({"title": "Veggie", "description": "A garden of delight", "image": "pizza1.png", "price": 0.0038})),
            )
            .await
            .json()
            .await
            .unwrap();
        let menu_id = menu[0]["id"].as_i64().unwrap();

        let franchise: Value = self
            .send(
                reqwest::Method::POST,
                "/api/franchise",
                Some(&admin),
                Some(json!({"name": format!("pizzaPocket-{}", Uuid::new_v4().simple()), "admins": []})),
            )
            .await
            .json()
            .await
            .unwrap();
        let franchise_id = franchise["id"].as_i64().unwrap();

        let store: Value = self
            .send(
                reqwest::Method::POST,
                &format!("/api/franchise/{franchise_id}/store"),
                Some(&admin),
                Some(json!({"name": "SLC"})),
            )
            .await
            .json()
            .await
            .unwrap();

        (menu_id, franchise_id, store["id"].as_i64().unwrap())
    }

    /// Wait until the log collector has seen at least `count` entries.
    pub async fn wait_for_logs(&self, count: usize) -> Vec<Value> {
        for _ in 0..100 {
            {
                let entries = self.log_entries.lock().unwrap();
                if entries.len() >= count {
                    return entries.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.log_entries.lock().unwrap().clone()
    }
}
