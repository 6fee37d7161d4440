//! In-memory database and catalog fixtures for service tests.

use std::sync::Arc;

use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, Database};
use tokio::sync::mpsc;

use crate::{
    config::CatalogConfig,
    db::DbPool,
    entities::product::ProductCategory,
    events::{Event, EventSender},
    services::products::{CreateProductRequest, ProductService, StockLineInput},
};

/// Migrated single-connection SQLite pool plus an event sender whose
/// receiver is kept alive by the caller.
pub(crate) async fn memory_db() -> (Arc<DbPool>, Arc<EventSender>, mpsc::Receiver<Event>) {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    crate::db::run_migrations(&db).await.unwrap();

    let (tx, rx) = mpsc::channel(64);
    (Arc::new(db), Arc::new(EventSender::new(tx)), rx)
}

pub(crate) fn product_service(db: &Arc<DbPool>, events: &Arc<EventSender>) -> ProductService {
    ProductService::new(db.clone(), events.clone(), CatalogConfig::default())
}

/// Uniform product with a single `M`/`Default` line holding `quantity`.
pub(crate) fn pinafore(sku: &str, quantity: i32) -> CreateProductRequest {
    CreateProductRequest {
        name: format!("Pinafore {sku}"),
        sku: sku.to_string(),
        description: String::new(),
        category: ProductCategory::Uniforms,
        school: None,
        institution: None,
        price: dec!(450),
        original_price: None,
        images: vec![format!("/img/{sku}.jpg")],
        sizes: vec!["M".into()],
        colors: vec!["Default".into()],
        stock: vec![StockLineInput {
            size: "M".into(),
            color: None,
            quantity,
        }],
        rating: None,
        reviews: None,
    }
}
