use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{school::SchoolSummary, Lifecycle, StringList};
use crate::errors::ServiceError;

/// Color assumed when a cart line or stock adjustment names none
pub const DEFAULT_COLOR: &str = "Default";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub sku: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: ProductCategory,
    pub school_id: Option<Uuid>,
    pub institution: Option<String>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    #[sea_orm(column_type = "Json")]
    pub images: StringList,
    #[sea_orm(column_type = "Json")]
    pub sizes: StringList,
    #[sea_orm(column_type = "Json")]
    pub colors: StringList,
    #[sea_orm(column_type = "Json")]
    pub stock: StockLines,
    pub low_stock_alert: bool,
    pub is_out_of_stock: bool,
    pub rating: Decimal,
    pub reviews: i32,
    pub lifecycle: Lifecycle,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::school::Entity",
        from = "Column::SchoolId",
        to = "super::school::Column::Id"
    )]
    School,
}

impl Related<super::school::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::School.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    #[sea_orm(string_value = "uniforms")]
    Uniforms,
    #[sea_orm(string_value = "sportswear")]
    Sportswear,
    #[sea_orm(string_value = "footwear")]
    Footwear,
    #[sea_orm(string_value = "accessories")]
    Accessories,
    #[sea_orm(string_value = "outerwear")]
    Outerwear,
}

/// Inventory for one size/color variant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub size: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub quantity: i32,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl StockLine {
    fn matches(&self, size: &str, color: &str) -> bool {
        self.size == size && self.color == color
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("Stock item not found for size {size}, color {color}")]
    LineNotFound { size: String, color: String },

    #[error("Insufficient stock. Available: {available}")]
    Insufficient { available: i32 },
}

/// Stock lines of a product. At most one line exists per (size, color).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct StockLines(pub Vec<StockLine>);

impl StockLines {
    /// Builds a line list from untrusted input: negative quantities clamp to
    /// zero and a repeated (size, color) keeps the last entry in place of the first.
    pub fn from_entries(entries: Vec<StockLine>) -> Self {
        let mut lines = StockLines::default();
        for entry in entries {
            lines.set(&entry.size, &entry.color, entry.quantity);
        }
        lines
    }

    pub fn lines(&self) -> &[StockLine] {
        &self.0
    }

    fn position(&self, size: &str, color: &str) -> Option<usize> {
        self.0.iter().position(|line| line.matches(size, color))
    }

    /// Quantity on hand; a line that was never provisioned counts as zero.
    pub fn quantity_of(&self, size: &str, color: &str) -> i32 {
        self.position(size, color)
            .map(|idx| self.0[idx].quantity)
            .unwrap_or(0)
    }

    /// Replaces the matching line's quantity or appends a new line.
    pub fn set(&mut self, size: &str, color: &str, quantity: i32) {
        let quantity = quantity.max(0);
        match self.position(size, color) {
            Some(idx) => self.0[idx].quantity = quantity,
            None => self.0.push(StockLine {
                size: size.to_string(),
                color: color.to_string(),
                quantity,
            }),
        }
    }

    /// Decrements the matching line, flooring at zero. Returns the new quantity.
    pub fn reduce(&mut self, size: &str, color: &str, quantity: i32) -> Result<i32, StockError> {
        let idx = self
            .position(size, color)
            .ok_or_else(|| StockError::LineNotFound {
                size: size.to_string(),
                color: color.to_string(),
            })?;
        let line = &mut self.0[idx];
        line.quantity = line.quantity.saturating_sub(quantity).max(0);
        Ok(line.quantity)
    }

    /// Decrements the matching line only when it holds at least `quantity`.
    pub fn reserve(&mut self, size: &str, color: &str, quantity: i32) -> Result<i32, StockError> {
        let available = self.quantity_of(size, color);
        if quantity > available {
            return Err(StockError::Insufficient { available });
        }
        self.reduce(size, color, quantity)
    }

    pub fn has_low_stock(&self, threshold: i32) -> bool {
        self.0
            .iter()
            .any(|line| line.quantity > 0 && line.quantity <= threshold)
    }

    /// True when no line has units left, including when there are no lines.
    pub fn is_out_of_stock(&self) -> bool {
        self.0.iter().all(|line| line.quantity == 0)
    }
}

/// Color of a cart line or adjustment, falling back to `Default`.
pub fn color_or_default(color: Option<&str>) -> String {
    match color.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => DEFAULT_COLOR.to_string(),
    }
}

impl Model {
    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    pub fn get_stock(&self, size: &str, color: &str) -> i32 {
        self.stock.quantity_of(size, color)
    }

    pub fn set_stock(&mut self, size: &str, color: &str, quantity: i32, low_stock_threshold: i32) {
        self.stock.set(size, color, quantity);
        self.recompute_stock_flags(low_stock_threshold);
    }

    /// Clamping decrement; a missing line is a `NotFound`.
    pub fn reduce_stock(
        &mut self,
        size: &str,
        color: &str,
        quantity: i32,
        low_stock_threshold: i32,
    ) -> Result<i32, ServiceError> {
        let remaining = self
            .stock
            .reduce(size, color, quantity)
            .map_err(|e| ServiceError::NotFound(e.to_string()))?;
        self.recompute_stock_flags(low_stock_threshold);
        Ok(remaining)
    }

    /// Checked decrement used by order placement.
    pub fn reserve_stock(
        &mut self,
        size: &str,
        color: &str,
        quantity: i32,
        low_stock_threshold: i32,
    ) -> Result<i32, ServiceError> {
        let remaining = self
            .stock
            .reserve(size, color, quantity)
            .map_err(|e| match e {
                StockError::Insufficient { available } => {
                    ServiceError::ValidationError(format!(
                        "Insufficient stock for {} - Size: {}, Color: {}. Available: {}",
                        self.name, size, color, available
                    ))
                }
                other => ServiceError::NotFound(other.to_string()),
            })?;
        self.recompute_stock_flags(low_stock_threshold);
        Ok(remaining)
    }

    pub fn recompute_stock_flags(&mut self, low_stock_threshold: i32) {
        self.low_stock_alert = self.stock.has_low_stock(low_stock_threshold);
        self.is_out_of_stock = self.stock.is_out_of_stock();
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first()
    }

    /// Whole-percent markdown from `original_price`, when there is one.
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price?;
        if original <= Decimal::ZERO || original <= self.price {
            return None;
        }
        ((original - self.price) / original * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
    }
}

/// Availability of one variant without its quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockStatus {
    pub size: String,
    pub color: String,
    pub in_stock: bool,
}

/// Storefront view: exposes availability, never quantities or the alert flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProductView {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub description: String,
    pub category: ProductCategory,
    pub school: Option<SchoolSummary>,
    pub institution: Option<String>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub discount_percent: Option<u32>,
    pub images: Vec<String>,
    pub thumbnail: Option<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub stock_status: Vec<StockStatus>,
    pub is_out_of_stock: bool,
    pub rating: Decimal,
    pub reviews: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PublicProductView {
    pub fn new(model: &Model, school: Option<SchoolSummary>) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            sku: model.sku.clone(),
            description: model.description.clone(),
            category: model.category,
            school,
            institution: model.institution.clone(),
            price: model.price,
            original_price: model.original_price,
            discount_percent: model.discount_percent(),
            images: model.images.0.clone(),
            thumbnail: model.thumbnail().map(str::to_string),
            sizes: model.sizes.0.clone(),
            colors: model.colors.0.clone(),
            stock_status: model
                .stock
                .lines()
                .iter()
                .map(|line| StockStatus {
                    size: line.size.clone(),
                    color: line.color.clone(),
                    in_stock: line.quantity > 0,
                })
                .collect(),
            is_out_of_stock: model.stock.is_out_of_stock(),
            rating: model.rating,
            reviews: model.reviews,
            is_active: model.is_active(),
            created_at: model.created_at,
        }
    }
}

/// Back-office view with full stock quantities
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProductView {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub description: String,
    pub category: ProductCategory,
    pub school: Option<SchoolSummary>,
    pub institution: Option<String>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub discount_percent: Option<u32>,
    pub images: Vec<String>,
    pub thumbnail: Option<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub stock: Vec<StockLine>,
    pub low_stock_alert: bool,
    pub is_out_of_stock: bool,
    pub rating: Decimal,
    pub reviews: i32,
    pub is_active: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminProductView {
    pub fn new(model: &Model, school: Option<SchoolSummary>) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            sku: model.sku.clone(),
            description: model.description.clone(),
            category: model.category,
            school,
            institution: model.institution.clone(),
            price: model.price,
            original_price: model.original_price,
            discount_percent: model.discount_percent(),
            images: model.images.0.clone(),
            thumbnail: model.thumbnail().map(str::to_string),
            sizes: model.sizes.0.clone(),
            colors: model.colors.0.clone(),
            stock: model.stock.0.clone(),
            low_stock_alert: model.low_stock_alert,
            is_out_of_stock: model.is_out_of_stock,
            rating: model.rating,
            reviews: model.reviews,
            is_active: model.is_active(),
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Current catalog entry behind an order line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReference {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: ProductCategory,
    pub price: Decimal,
    pub images: Vec<String>,
    pub is_active: bool,
}

impl From<&Model> for ProductReference {
    fn from(model: &Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            sku: model.sku.clone(),
            category: model.category,
            price: model.price,
            images: model.images.0.clone(),
            is_active: model.is_active(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    const THRESHOLD: i32 = 5;

    fn line(size: &str, color: &str, quantity: i32) -> StockLine {
        StockLine {
            size: size.into(),
            color: color.into(),
            quantity,
        }
    }

    pub(crate) fn sample_product(stock: Vec<StockLine>) -> Model {
        let now = Utc::now();
        let mut model = Model {
            id: Uuid::new_v4(),
            name: "House T-Shirt".into(),
            sku: "HTS-001".into(),
            description: String::new(),
            category: ProductCategory::Uniforms,
            school_id: None,
            institution: Some("corporate".into()),
            price: dec!(450),
            original_price: None,
            images: StringList(vec!["front.jpg".into(), "back.jpg".into()]),
            sizes: StringList(vec!["S".into(), "M".into()]),
            colors: StringList::default(),
            stock: StockLines(stock),
            low_stock_alert: false,
            is_out_of_stock: false,
            rating: Decimal::ZERO,
            reviews: 0,
            lifecycle: Lifecycle::Active,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        model.recompute_stock_flags(THRESHOLD);
        model
    }

    #[test]
    fn get_stock_of_unknown_line_is_zero() {
        let product = sample_product(vec![line("M", DEFAULT_COLOR, 5)]);
        assert_eq!(product.get_stock("M", DEFAULT_COLOR), 5);
        assert_eq!(product.get_stock("XL", DEFAULT_COLOR), 0);
        assert_eq!(product.get_stock("M", "Navy"), 0);
    }

    #[test]
    fn set_stock_replaces_instead_of_appending() {
        let mut product = sample_product(vec![line("M", DEFAULT_COLOR, 5)]);
        product.set_stock("M", DEFAULT_COLOR, 12, THRESHOLD);
        product.set_stock("L", DEFAULT_COLOR, -3, THRESHOLD);

        assert_eq!(
            product.stock.lines(),
            &[line("M", DEFAULT_COLOR, 12), line("L", DEFAULT_COLOR, 0)]
        );
        assert!(!product.low_stock_alert);
        assert!(!product.is_out_of_stock);
    }

    #[test]
    fn reduce_stock_clamps_at_zero() {
        let mut product = sample_product(vec![line("M", DEFAULT_COLOR, 2)]);
        let remaining = product.reduce_stock("M", DEFAULT_COLOR, 5, THRESHOLD).unwrap();
        assert_eq!(remaining, 0);
        assert!(product.is_out_of_stock);
        assert!(!product.low_stock_alert);
    }

    #[test]
    fn reduce_stock_on_missing_line_is_not_found() {
        let mut product = sample_product(vec![line("M", DEFAULT_COLOR, 2)]);
        assert_matches!(
            product.reduce_stock("S", DEFAULT_COLOR, 1, THRESHOLD),
            Err(ServiceError::NotFound(_))
        );
    }

    #[test]
    fn reserve_stock_refuses_oversell() {
        let mut product = sample_product(vec![line("M", DEFAULT_COLOR, 2)]);
        let err = product
            .reserve_stock("M", DEFAULT_COLOR, 5, THRESHOLD)
            .unwrap_err();
        assert_matches!(&err, ServiceError::ValidationError(msg) if msg.contains("Available: 2"));
        assert_eq!(product.get_stock("M", DEFAULT_COLOR), 2);

        assert_eq!(product.reserve_stock("M", DEFAULT_COLOR, 2, THRESHOLD).unwrap(), 0);
    }

    #[test]
    fn reserve_stock_on_unprovisioned_line_reports_zero_available() {
        let mut product = sample_product(vec![]);
        let err = product.reserve_stock("M", "Navy", 1, THRESHOLD).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.ends_with("Available: 0"));
    }

    #[test]
    fn empty_stock_is_out_of_stock() {
        let product = sample_product(vec![]);
        assert!(product.is_out_of_stock);
        assert!(!product.low_stock_alert);
    }

    #[test]
    fn from_entries_keeps_last_duplicate() {
        let lines = StockLines::from_entries(vec![
            line("M", DEFAULT_COLOR, 3),
            line("L", DEFAULT_COLOR, 1),
            line("M", DEFAULT_COLOR, 9),
        ]);
        assert_eq!(
            lines.lines(),
            &[line("M", DEFAULT_COLOR, 9), line("L", DEFAULT_COLOR, 1)]
        );
    }

    #[test]
    fn discount_percent_rounds_to_whole_number() {
        let mut product = sample_product(vec![]);
        product.price = dec!(600);
        product.original_price = Some(dec!(900));
        assert_eq!(product.discount_percent(), Some(33));

        product.original_price = Some(dec!(500));
        assert_eq!(product.discount_percent(), None);
    }

    #[test]
    fn public_view_hides_quantities() {
        let product = sample_product(vec![line("M", DEFAULT_COLOR, 3), line("L", DEFAULT_COLOR, 0)]);
        let view = serde_json::to_value(PublicProductView::new(&product, None)).unwrap();

        assert!(view.get("stock").is_none());
        assert!(view.get("lowStockAlert").is_none());
        assert_eq!(view["stockStatus"][0]["inStock"], true);
        assert_eq!(view["stockStatus"][1]["inStock"], false);
        assert_eq!(view["isOutOfStock"], false);
        assert_eq!(view["thumbnail"], "front.jpg");
    }

    #[test]
    fn color_defaults_when_blank() {
        assert_eq!(color_or_default(None), DEFAULT_COLOR);
        assert_eq!(color_or_default(Some("  ")), DEFAULT_COLOR);
        assert_eq!(color_or_default(Some("Navy")), "Navy");
    }

    fn stock_strategy() -> impl Strategy<Value = Vec<StockLine>> {
        prop::collection::vec(
            (
                prop::sample::select(vec!["S", "M", "L"]),
                prop::sample::select(vec!["Default", "Navy"]),
                -5i32..20,
            )
                .prop_map(|(size, color, quantity)| line(size, color, quantity)),
            0..12,
        )
    }

    proptest! {
        #[test]
        fn flags_follow_stock_lines(entries in stock_strategy(), threshold in 0i32..10) {
            let mut product = sample_product(vec![]);
            product.stock = StockLines::from_entries(entries);
            product.recompute_stock_flags(threshold);

            let lines = product.stock.lines();
            prop_assert_eq!(product.is_out_of_stock, lines.iter().all(|l| l.quantity == 0));
            prop_assert_eq!(
                product.low_stock_alert,
                lines.iter().any(|l| l.quantity > 0 && l.quantity <= threshold)
            );
        }

        #[test]
        fn at_most_one_line_per_variant(entries in stock_strategy()) {
            let lines = StockLines::from_entries(entries);
            let mut keys: Vec<_> = lines.lines().iter().map(|l| (l.size.clone(), l.color.clone())).collect();
            let before = keys.len();
            keys.sort();
            keys.dedup();
            prop_assert_eq!(before, keys.len());
        }

        #[test]
        fn reduce_never_goes_negative(start in 0i32..50, take in 0i32..200) {
            let mut product = sample_product(vec![line("M", DEFAULT_COLOR, start)]);
            let remaining = product.reduce_stock("M", DEFAULT_COLOR, take, THRESHOLD).unwrap();
            prop_assert!(remaining >= 0);
            prop_assert_eq!(remaining, (start - take).max(0));
        }
    }
}
