pub mod admins;
pub mod common;
pub mod health;
pub mod inquiries;
pub mod orders;
pub mod products;
pub mod schools;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        inquiries::InquiryService, orders::OrderService, products::ProductService,
        schools::SchoolService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub schools: Arc<SchoolService>,
    pub products: Arc<ProductService>,
    pub orders: Arc<OrderService>,
    pub inquiries: Arc<InquiryService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let catalog = config.catalog();
        Self {
            schools: Arc::new(SchoolService::new(db_pool.clone(), event_sender.clone())),
            products: Arc::new(ProductService::new(
                db_pool.clone(),
                event_sender.clone(),
                catalog,
            )),
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                event_sender.clone(),
                catalog,
                config.pricing(),
            )),
            inquiries: Arc::new(InquiryService::new(db_pool, event_sender)),
        }
    }
}
