use crate::{
    common::{base36_digit, to_base36, DateRangeParams},
    config::{CatalogConfig, PricingPolicy},
    db::DbPool,
    entities::{
        order::{
            self, DeliveryType, OrderItem, OrderItems, OrderStatus, OrderView, PaymentStatus,
            ShippingAddress, DEFAULT_PAYMENT_METHOD,
        },
        product::{self, color_or_default, ProductReference},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{products::write_versioned, Page, PageRequest},
};
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

pub const ORDER_PAGE_SIZE: u64 = 50;
const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// One cart line as submitted at checkout
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(alias = "product")]
    pub product_id: Uuid,
    pub size: String,
    pub color: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<CartLine>,
    pub shipping_address: ShippingAddress,
    #[serde(default = "default_delivery_type")]
    pub delivery_type: DeliveryType,
    pub pickup_time: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

fn default_delivery_type() -> DeliveryType {
    DeliveryType::Delivery
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: u64,
    pub pending_orders: u64,
    pub completed_orders: u64,
    pub total_revenue: Decimal,
}

/// `ORD-<base36 millis>-<4 random base36>`, uppercase
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4).map(|_| base36_digit(rng.gen_range(0..36))).collect();
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    format!("ORD-{}-{}", to_base36(millis), suffix)
}

/// Subtotal, shipping and total for a set of snapshot lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_charges: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    pub fn compute(items: &OrderItems, pricing: &PricingPolicy) -> Self {
        let subtotal = items.subtotal();
        let shipping_charges = pricing.shipping_charge(subtotal);
        Self {
            subtotal,
            shipping_charges,
            total: subtotal + shipping_charges,
        }
    }
}

fn validate_cart(request: &PlaceOrderRequest) -> Result<(), ServiceError> {
    if request.items.is_empty() {
        return Err(ServiceError::ValidationError(
            "Order must have at least one item".to_string(),
        ));
    }
    for line in &request.items {
        if line.size.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Each item requires a size".to_string(),
            ));
        }
        if line.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }
    }
    request.shipping_address.validate()?;
    if request.delivery_type == DeliveryType::StorePickup && request.pickup_time.is_none() {
        return Err(ServiceError::ValidationError(
            "Pickup time is required for store pickup".to_string(),
        ));
    }
    Ok(())
}

/// Reserved products plus the inserted order, before commit
#[derive(Debug)]
struct RecordedOrder {
    order: order::Model,
    products: Vec<product::Model>,
}

fn product_unavailable(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Product {} not found or inactive", id))
}

/// Loads each distinct product named by `items`. Missing or retired products
/// fail the whole cart.
async fn load_cart_products<C>(
    db: &C,
    items: &[CartLine],
) -> Result<HashMap<Uuid, product::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let mut products = HashMap::new();
    for line in items {
        if products.contains_key(&line.product_id) {
            continue;
        }
        let loaded = product::Entity::find_by_id(line.product_id)
            .one(db)
            .await?
            .filter(product::Model::is_active)
            .ok_or_else(|| product_unavailable(line.product_id))?;
        products.insert(line.product_id, loaded);
    }
    Ok(products)
}

/// Picks an order number not yet present in `orders`.
async fn unused_order_number<C>(db: &C) -> Result<String, ServiceError>
where
    C: ConnectionTrait,
{
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let candidate = generate_order_number(Utc::now());
        let taken = order::Entity::find()
            .filter(order::Column::OrderNumber.eq(candidate.as_str()))
            .count(db)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
    }
    Err(ServiceError::InternalError(
        "Could not allocate a unique order number".to_string(),
    ))
}

/// Order engine: checkout plus back-office order management
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    catalog: CatalogConfig,
    pricing: PricingPolicy,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        catalog: CatalogConfig,
        pricing: PricingPolicy,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            catalog,
            pricing,
        }
    }

    /// Validates the cart, reserves stock and records the order in a single
    /// transaction. Any failure leaves neither an order nor a stock change.
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<OrderView, ServiceError> {
        validate_cart(&request)?;

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order placement");
            ServiceError::DatabaseError(e)
        })?;

        let products = load_cart_products(&txn, &request.items).await?;
        let recorded = self.record_order(&txn, request, products).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit order placement");
            ServiceError::DatabaseError(e)
        })?;

        let RecordedOrder { order, products } = recorded;
        info!(order_id = %order.id, order_number = %order.order_number, total = %order.total, "order placed");
        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id: order.id,
                order_number: order.order_number.clone(),
                total: order.total,
            })
            .await;
        for product in products.iter().filter(|p| p.low_stock_alert) {
            self.event_sender
                .send_or_log(Event::LowStock {
                    product_id: product.id,
                    sku: product.sku.clone(),
                })
                .await;
        }

        let references: HashMap<Uuid, ProductReference> = products
            .iter()
            .map(|p| (p.id, ProductReference::from(p)))
            .collect();
        Ok(OrderView::from(order).with_products(&references))
    }

    /// Reserves every cart line against `working`, writes the touched products
    /// under their version guard and inserts the order. `working` holds the
    /// products as read at the start of placement.
    async fn record_order<C>(
        &self,
        db: &C,
        request: PlaceOrderRequest,
        mut working: HashMap<Uuid, product::Model>,
    ) -> Result<RecordedOrder, ServiceError>
    where
        C: ConnectionTrait,
    {
        let threshold = self.catalog.low_stock_threshold;
        let mut touched: Vec<Uuid> = Vec::new();
        let mut snapshot = Vec::with_capacity(request.items.len());

        // Repeated lines for one product reserve against the same working copy.
        for line in &request.items {
            let product = working
                .get_mut(&line.product_id)
                .ok_or_else(|| product_unavailable(line.product_id))?;
            if !touched.contains(&line.product_id) {
                touched.push(line.product_id);
            }

            let size = line.size.trim();
            let color = color_or_default(line.color.as_deref());
            product.reserve_stock(size, &color, line.quantity, threshold)?;

            snapshot.push(OrderItem {
                product_id: product.id,
                name: product.name.clone(),
                sku: product.sku.clone(),
                price: product.price,
                size: size.to_string(),
                color,
                quantity: line.quantity,
                image: product.thumbnail().unwrap_or_default().to_string(),
            });
        }

        let items = OrderItems(snapshot);
        let totals = OrderTotals::compute(&items, &self.pricing);

        let mut saved = Vec::with_capacity(touched.len());
        for id in &touched {
            if let Some(product) = working.remove(id) {
                saved.push(write_versioned(db, product).await?);
            }
        }

        let order_number = unused_order_number(db).await?;
        let now = Utc::now();
        let pickup_time = match request.delivery_type {
            DeliveryType::StorePickup => request.pickup_time,
            DeliveryType::Delivery => None,
        };

        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(order_number),
            user_id: Set(None),
            items: Set(items),
            shipping_address: Set(request.shipping_address),
            delivery_type: Set(request.delivery_type),
            pickup_time: Set(pickup_time),
            subtotal: Set(totals.subtotal),
            shipping_charges: Set(totals.shipping_charges),
            total: Set(totals.total),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            payment_method: Set(request
                .payment_method
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string())),
            notes: Set(request.notes.unwrap_or_default()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| ServiceError::from_write(e, "Order number collision, please retry"))?;

        Ok(RecordedOrder {
            order,
            products: saved,
        })
    }

    /// Order views with each line's current product attached.
    async fn expand(&self, orders: Vec<order::Model>) -> Result<Vec<OrderView>, ServiceError> {
        let ids = OrderView::referenced_products(&orders);
        let references: HashMap<Uuid, ProductReference> = if ids.is_empty() {
            HashMap::new()
        } else {
            product::Entity::find()
                .filter(product::Column::Id.is_in(ids))
                .all(&*self.db_pool)
                .await?
                .iter()
                .map(|p| (p.id, ProductReference::from(p)))
                .collect()
        };
        Ok(orders
            .into_iter()
            .map(|o| OrderView::from(o).with_products(&references))
            .collect())
    }

    async fn expand_one(&self, order: order::Model) -> Result<OrderView, ServiceError> {
        self.expand(vec![order])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get_order_by_number(&self, order_number: &str) -> Result<OrderView, ServiceError> {
        let order = order::Entity::find()
            .filter(order::Column::OrderNumber.eq(order_number.trim().to_uppercase()))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        self.expand_one(order).await
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, id: Uuid) -> Result<OrderView, ServiceError> {
        let order = order::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        self.expand_one(order).await
    }

    /// Newest first, filtered by status and creation date.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, filter: OrderFilter) -> Result<Page<OrderView>, ServiceError> {
        let request = PageRequest::new(filter.page, filter.limit, ORDER_PAGE_SIZE);
        let (start, end) = DateRangeParams {
            start_date: filter.start_date,
            end_date: filter.end_date,
        }
        .to_datetime_range()?;

        let mut query = order::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(start) = start {
            query = query.filter(order::Column::CreatedAt.gte(start));
        }
        if let Some(end) = end {
            query = query.filter(order::Column::CreatedAt.lte(end));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db_pool, request.limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(request.index()).await?;
        let views = self.expand(orders).await?;
        Ok(Page::new(views, total, request))
    }

    /// Status moves follow the fulfilment state machine; re-applying the
    /// current status is a no-op.
    #[instrument(skip(self, request))]
    pub async fn update_order(
        &self,
        id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<OrderView, ServiceError> {
        let existing = order::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let old_status = existing.status;
        let mut active = existing.into_active_model();
        let mut status_change = None;

        if let Some(next) = request.status {
            if next != old_status {
                if !old_status.can_transition_to(next) {
                    return Err(ServiceError::ValidationError(format!(
                        "Cannot change order status from {} to {}",
                        old_status, next
                    )));
                }
                active.status = Set(next);
                status_change = Some(next);
            }
        }
        if let Some(payment_status) = request.payment_status {
            active.payment_status = Set(payment_status);
        }
        if let Some(notes) = request.notes {
            active.notes = Set(notes);
        }

        let updated = active.update(&*self.db_pool).await?;

        if let Some(new_status) = status_change {
            info!(order_id = %id, from = %old_status, to = %new_status, "order status changed");
            self.event_sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id: id,
                    old_status: old_status.to_string(),
                    new_status: new_status.to_string(),
                })
                .await;
        }
        self.expand_one(updated).await
    }

    #[instrument(skip(self))]
    pub async fn order_stats(&self) -> Result<OrderStats, ServiceError> {
        let db = &*self.db_pool;
        let total_orders = order::Entity::find().count(db).await?;
        let pending_orders = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .count(db)
            .await?;
        let completed_orders = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::Delivered))
            .count(db)
            .await?;
        let total_revenue = order::Entity::find()
            .select_only()
            .column(order::Column::Total)
            .filter(order::Column::PaymentStatus.eq(PaymentStatus::Paid))
            .into_tuple::<Decimal>()
            .all(db)
            .await?
            .into_iter()
            .sum();

        Ok(OrderStats {
            total_orders,
            pending_orders,
            completed_orders,
            total_revenue,
        })
    }
}
