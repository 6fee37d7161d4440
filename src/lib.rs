//! Uniform Store API Library
//!
//! Storefront and back office for school-uniform and corporate apparel
//! retail: the catalog (schools, products, stock), the order engine and the
//! admin access gate.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod services;
pub mod tracing;

use axum::{
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{AuthRouterExt, AuthService, SUPER_ADMIN_ONLY};
use crate::services::Page;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Wires every service over one connection pool and event channel.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Arc<events::EventSender>,
    ) -> Result<Self, auth::AuthError> {
        let auth = Arc::new(AuthService::new(
            auth::AuthConfig::from(&config),
            db.clone(),
            event_sender.clone(),
        )?);
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), &config);
        Ok(Self {
            db,
            config,
            event_sender,
            services,
            auth,
        })
    }
}

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl<T> ApiResponse<T> {
    fn empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            count: None,
            total: None,
            page: None,
            pages: None,
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
        }
    }

    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::empty()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// Envelope carrying only a message, e.g. after a delete.
    pub fn message(message: impl Into<String>) -> Self {
        Self::empty().with_message(message)
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len() as u64;
        Self {
            count: Some(count),
            ..Self::success(items)
        }
    }

    pub fn page(page: Page<T>) -> Self {
        let pages = page.pages();
        let (total, current) = (page.total, page.page);
        Self {
            total: Some(total),
            page: Some(current),
            pages: Some(pages),
            ..Self::list(page.items)
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

fn school_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::schools::list_schools))
        .route("/:id", get(handlers::schools::get_school));

    let admin = Router::new()
        .route("/admin/all", get(handlers::schools::list_all_schools))
        .route("/", post(handlers::schools::create_school))
        .route(
            "/:id",
            put(handlers::schools::update_school).delete(handlers::schools::delete_school),
        )
        .with_auth();

    public.merge(admin)
}

fn product_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::products::list_products))
        .route("/:id", get(handlers::products::get_product));

    let admin = Router::new()
        .route("/admin/all", get(handlers::products::list_all_products))
        .route("/admin/:id", get(handlers::products::get_admin_product))
        .route("/admin/:id/stock", put(handlers::products::update_stock))
        .route("/", post(handlers::products::create_product))
        .route(
            "/:id",
            put(handlers::products::update_product).delete(handlers::products::delete_product),
        )
        .with_auth();

    public.merge(admin)
}

fn order_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/", post(handlers::orders::create_order))
        .route(
            "/number/:order_number",
            get(handlers::orders::get_order_by_number),
        );

    let admin = Router::new()
        .route("/admin/all", get(handlers::orders::list_orders))
        .route("/admin/stats", get(handlers::orders::order_stats))
        .route(
            "/admin/:id",
            get(handlers::orders::get_order).put(handlers::orders::update_order),
        )
        .with_auth();

    public.merge(admin)
}

fn inquiry_routes() -> Router<AppState> {
    let public = Router::new().route("/", post(handlers::inquiries::create_inquiry));

    let admin = Router::new()
        .route("/admin/all", get(handlers::inquiries::list_inquiries))
        .route("/admin/stats", get(handlers::inquiries::inquiry_stats))
        .route(
            "/admin/:id",
            get(handlers::inquiries::get_inquiry).put(handlers::inquiries::update_inquiry),
        )
        .with_auth();

    public.merge(admin)
}

fn admin_routes() -> Router<AppState> {
    let public = Router::new().route("/login", post(handlers::admins::login));

    let any_admin = Router::new()
        .route("/me", get(handlers::admins::me))
        .with_auth();

    let super_admin = Router::new()
        .route("/register", post(handlers::admins::register))
        .route("/", get(handlers::admins::list_admins))
        .with_roles(SUPER_ADMIN_ONLY);

    public.merge(any_admin).merge(super_admin)
}

/// Every `/api` route. Gated routers re-check the bearer token per request.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/schools", school_routes())
        .nest("/products", product_routes())
        .nest("/orders", order_routes())
        .nest("/inquiries", inquiry_routes())
        .nest("/admin", admin_routes())
}

/// Full application: routes, auth service extension, HTTP tracing and request ids.
pub fn app(state: AppState) -> Router {
    let auth = state.auth.clone();
    Router::new()
        .nest("/api", api_routes())
        .with_state(state)
        .layer(Extension(auth))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use crate::services::PageRequest;

    #[tokio::test]
    async fn success_response_echoes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;
        assert_eq!(response.request_id.as_deref(), Some("meta-123"));
        assert!(response.success);
    }

    #[test]
    fn paged_envelope_carries_totals() {
        let page = Page::new(vec![1, 2], 45, PageRequest::new(Some(2), Some(20), 20));
        let json = serde_json::to_value(ApiResponse::page(page)).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["total"], 45);
        assert_eq!(json["page"], 2);
        assert_eq!(json["pages"], 3);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn message_envelope_has_no_data() {
        let json = serde_json::to_value(ApiResponse::message("School deleted successfully")).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("data").is_none());
    }
}
