#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};
use serde_json::{json, Value};
use uniform_store_api::{
    auth::RegisterAdminRequest,
    config::AppConfig,
    db,
    entities::admin::{self, AdminRole, AdminStatus},
    events::{self, EventSender},
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const SUPER_ADMIN_EMAIL: &str = "owner@uniformstore.test";
pub const SUPER_ADMIN_PASSWORD: &str = "owner-password";

/// Helper harness for spinning up the application over an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state and a signed-in super-admin.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.password_hash_memory_kib = 64;
        cfg.password_hash_iterations = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender)
            .expect("valid auth configuration for tests");
        let router = uniform_store_api::app(state.clone());

        let mut app = Self {
            router,
            state,
            token: String::new(),
            _event_task: event_task,
        };

        app.create_admin(
            "Store Owner",
            SUPER_ADMIN_EMAIL,
            SUPER_ADMIN_PASSWORD,
            AdminRole::SuperAdmin,
        )
        .await;
        app.token = app.login(SUPER_ADMIN_EMAIL, SUPER_ADMIN_PASSWORD).await;
        app
    }

    /// Bearer token of the seeded super-admin.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body bytes");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    /// Convenience helper for requests as the seeded super-admin.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.request(method, uri, body, Some(self.token())).await
    }

    pub async fn create_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: AdminRole,
    ) -> Uuid {
        self.state
            .auth
            .register_admin(RegisterAdminRequest {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role: Some(role),
            })
            .await
            .expect("seed admin")
            .id
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/admin/login",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    pub async fn disable_admin(&self, email: &str) {
        let model = admin::Entity::find()
            .filter(admin::Column::Email.eq(email))
            .one(&*self.state.db)
            .await
            .expect("query admin")
            .expect("admin exists");
        let mut active = model.into_active_model();
        active.status = Set(AdminStatus::Disabled);
        active.update(&*self.state.db).await.expect("disable admin");
    }

    pub async fn seed_school(&self, name: &str) -> Value {
        let (status, body) = self
            .request_authenticated(
                Method::POST,
                "/api/schools",
                Some(json!({ "name": name, "category": ["primary", "secondary"] })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed school failed: {body}");
        body["data"].clone()
    }

    /// Creates a product with one `M`/`Default` stock line.
    pub async fn seed_product(
        &self,
        sku: &str,
        price: i64,
        quantity: i32,
        school: Option<&str>,
    ) -> Value {
        let mut payload = json!({
            "name": format!("Product {sku}"),
            "sku": sku,
            "description": "Cotton blend, machine washable",
            "category": "uniforms",
            "price": price,
            "images": [format!("/img/{sku}-front.jpg"), format!("/img/{sku}-back.jpg")],
            "sizes": ["M"],
            "colors": ["Default"],
            "stock": [{ "size": "M", "quantity": quantity }],
        });
        if let Some(school) = school {
            payload["school"] = Value::String(school.to_string());
        }
        let (status, body) = self
            .request_authenticated(Method::POST, "/api/products", Some(payload))
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed product failed: {body}");
        body["data"].clone()
    }

    /// Quantity of one stock line as seen by the back office.
    pub async fn stock_of(&self, product_id: &str, size: &str, color: &str) -> i64 {
        let (status, body) = self
            .request_authenticated(
                Method::GET,
                &format!("/api/products/admin/{product_id}"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin product lookup failed: {body}");
        body["data"]["stock"]
            .as_array()
            .expect("stock lines")
            .iter()
            .find(|line| line["size"] == size && line["color"] == color)
            .and_then(|line| line["quantity"].as_i64())
            .unwrap_or(0)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Shipping address accepted by checkout.
pub fn shipping_address() -> Value {
    json!({
        "name": "Asha Verma",
        "phone": "9876543210",
        "email": "asha@example.com",
        "address": "12 Lake Road",
        "city": "Pune",
        "state": "Maharashtra",
        "pincode": "411001"
    })
}

/// Reads a money field that may be serialized as a string or a number.
pub fn money(value: &Value) -> Decimal {
    match value {
        Value::String(raw) => Decimal::from_str(raw).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected a money value, got {other}"),
    }
}
