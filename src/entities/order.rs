use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{FromJsonQueryResult, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use std::collections::HashMap;
use validator::Validate;

use super::product::ProductReference;

pub const DEFAULT_PAYMENT_METHOD: &str = "cash-on-delivery";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub user_id: Option<Uuid>,
    #[sea_orm(column_type = "Json")]
    pub items: OrderItems,
    #[sea_orm(column_type = "Json")]
    pub shipping_address: ShippingAddress,
    pub delivery_type: DeliveryType,
    pub pickup_time: Option<DateTime<Utc>>,
    pub subtotal: Decimal,
    pub shipping_charges: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    #[sea_orm(column_type = "Text")]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            self.updated_at = Set(Utc::now());
        }
        Ok(self)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    fn rank(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Processing => Some(2),
            OrderStatus::Shipped => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Forward moves along the fulfilment chain (skipping allowed) or to
    /// `Cancelled` before delivery. Terminal states accept nothing.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, _) => false,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryType {
    #[sea_orm(string_value = "delivery")]
    Delivery,
    #[sea_orm(string_value = "store-pickup")]
    StorePickup,
}

/// Product fields frozen into the order at placement time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub size: String,
    pub color: String,
    pub quantity: i32,
    pub image: String,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct OrderItems(pub Vec<OrderItem>);

impl OrderItems {
    pub fn subtotal(&self) -> Decimal {
        self.0.iter().map(OrderItem::line_total).sum()
    }
}

#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate, FromJsonQueryResult,
)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "Shipping name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone: String,
    #[validate(email(message = "Invalid email address"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "Pincode is required"))]
    pub pincode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
}

/// Snapshot line plus the product it was taken from, when that still exists
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductReference>,
}

/// Wire representation of an order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub items: Vec<OrderItemView>,
    pub shipping_address: ShippingAddress,
    pub delivery_type: DeliveryType,
    pub pickup_time: Option<DateTime<Utc>>,
    pub subtotal: Decimal,
    pub shipping_charges: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for OrderView {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            order_number: model.order_number,
            user_id: model.user_id,
            items: model
                .items
                .0
                .into_iter()
                .map(|item| OrderItemView {
                    item,
                    product: None,
                })
                .collect(),
            shipping_address: model.shipping_address,
            delivery_type: model.delivery_type,
            pickup_time: model.pickup_time,
            subtotal: model.subtotal,
            shipping_charges: model.shipping_charges,
            total: model.total,
            status: model.status,
            payment_status: model.payment_status,
            payment_method: model.payment_method,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl OrderView {
    /// Attaches the referenced products found in `products`.
    pub fn with_products(mut self, products: &HashMap<Uuid, ProductReference>) -> Self {
        for line in &mut self.items {
            line.product = products.get(&line.item.product_id).cloned();
        }
        self
    }

    /// Distinct product ids referenced by the lines of `orders`.
    pub fn referenced_products(orders: &[Model]) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = orders
            .iter()
            .flat_map(|order| order.items.0.iter().map(|item| item.product_id))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[rstest]
    #[case(OrderStatus::Pending, OrderStatus::Confirmed, true)]
    #[case(OrderStatus::Pending, OrderStatus::Shipped, true)]
    #[case(OrderStatus::Shipped, OrderStatus::Processing, false)]
    #[case(OrderStatus::Shipped, OrderStatus::Cancelled, true)]
    #[case(OrderStatus::Delivered, OrderStatus::Cancelled, false)]
    #[case(OrderStatus::Cancelled, OrderStatus::Pending, false)]
    #[case(OrderStatus::Confirmed, OrderStatus::Confirmed, false)]
    fn order_status_transitions(
        #[case] from: OrderStatus,
        #[case] to: OrderStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn status_strings_round_trip_through_strum() {
        assert_eq!(OrderStatus::Processing.to_string(), "processing");
        assert_eq!(
            PaymentStatus::from_str("refunded").unwrap(),
            PaymentStatus::Refunded
        );
    }

    #[test]
    fn delivery_type_wire_names() {
        let parsed: DeliveryType = serde_json::from_str("\"store-pickup\"").unwrap();
        assert_eq!(parsed, DeliveryType::StorePickup);
    }

    #[test]
    fn subtotal_sums_line_totals() {
        let item = |price, quantity| OrderItem {
            product_id: Uuid::nil(),
            name: "Blazer".into(),
            sku: "BLZ-1".into(),
            price,
            size: "M".into(),
            color: "Navy".into(),
            quantity,
            image: String::new(),
        };
        let items = OrderItems(vec![item(dec!(1200), 2), item(dec!(350.50), 1)]);
        assert_eq!(items.subtotal(), dec!(2750.50));
    }
}
