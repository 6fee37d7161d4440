use crate::{
    common::{double_option, validate_non_negative_price},
    config::CatalogConfig,
    db::DbPool,
    entities::{
        product::{
            self, color_or_default, AdminProductView, ProductCategory, PublicProductView,
            StockLine, StockLines,
        },
        school::{self, SchoolSummary},
        Lifecycle, StringList,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{Page, PageRequest},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

pub const PUBLIC_PAGE_SIZE: u64 = 20;
pub const ADMIN_PAGE_SIZE: u64 = 50;

const DUPLICATE_SKU: &str = "A product with this SKU already exists";

/// Stock line as submitted by the back office; color defaults to `Default`.
#[derive(Debug, Clone, Deserialize)]
pub struct StockLineInput {
    pub size: String,
    pub color: Option<String>,
    pub quantity: i32,
}

impl StockLineInput {
    fn into_line(self) -> Result<StockLine, ServiceError> {
        let size = self.size.trim().to_string();
        if size.is_empty() {
            return Err(ServiceError::ValidationError(
                "Stock lines require a size".to_string(),
            ));
        }
        Ok(StockLine {
            size,
            color: color_or_default(self.color.as_deref()),
            quantity: self.quantity,
        })
    }
}

fn stock_from_input(input: Vec<StockLineInput>) -> Result<StockLines, ServiceError> {
    let lines = input
        .into_iter()
        .map(StockLineInput::into_line)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(StockLines::from_entries(lines))
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "SKU is required"))]
    pub sku: String,
    #[serde(default)]
    pub description: String,
    pub category: ProductCategory,
    #[serde(alias = "schoolId")]
    pub school: Option<Uuid>,
    pub institution: Option<String>,
    #[validate(custom = "validate_non_negative_price")]
    pub price: Decimal,
    #[validate(custom = "validate_non_negative_price")]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub stock: Vec<StockLineInput>,
    pub rating: Option<Decimal>,
    #[validate(range(min = 0, message = "Reviews must not be negative"))]
    pub reviews: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64, message = "SKU is required"))]
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    #[serde(default, alias = "schoolId", deserialize_with = "double_option")]
    pub school: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub institution: Option<Option<String>>,
    #[validate(custom = "validate_non_negative_price")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub original_price: Option<Option<Decimal>>,
    pub images: Option<Vec<String>>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub stock: Option<Vec<StockLineInput>>,
    pub rating: Option<Decimal>,
    #[validate(range(min = 0, message = "Reviews must not be negative"))]
    pub reviews: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: Option<i32>,
}

/// Storefront listing filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub school: Option<String>,
    pub category: Option<ProductCategory>,
    pub institution: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Back-office listing filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProductFilter {
    pub school: Option<String>,
    pub category: Option<ProductCategory>,
    pub search: Option<String>,
    pub low_stock: Option<bool>,
    pub out_of_stock: Option<bool>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

fn normalize_sku(sku: &str) -> String {
    sku.trim().to_uppercase()
}

fn validate_rating(rating: Option<Decimal>) -> Result<(), ServiceError> {
    match rating {
        Some(r) if r < Decimal::ZERO || r > Decimal::from(5) => Err(
            ServiceError::ValidationError("Rating must be between 0 and 5".to_string()),
        ),
        _ => Ok(()),
    }
}

fn ensure_single_owner(school_id: Option<Uuid>, institution: Option<&str>) -> Result<(), ServiceError> {
    if school_id.is_some() && institution.is_some_and(|i| !i.trim().is_empty()) {
        return Err(ServiceError::ValidationError(
            "A product belongs to either a school or an institution, not both".to_string(),
        ));
    }
    Ok(())
}

fn search_condition(term: &str) -> Condition {
    let pattern = format!("%{}%", term.trim().to_lowercase());
    let lower_like = |column: product::Column| {
        Expr::expr(Func::lower(Expr::col((product::Entity, column)))).like(pattern.as_str())
    };
    Condition::any()
        .add(lower_like(product::Column::Name))
        .add(lower_like(product::Column::Description))
        .add(lower_like(product::Column::Sku))
}

/// Writes `model` only if its stored version still matches, bumping the version.
/// Zero affected rows means another writer got there first.
pub(crate) async fn write_versioned<C>(
    db: &C,
    mut model: product::Model,
) -> Result<product::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let expected = model.version;
    model.version = expected + 1;
    model.updated_at = Utc::now();

    let changes = product::ActiveModel::from(model.clone()).reset_all();
    let result = product::Entity::update_many()
        .set(changes)
        .filter(product::Column::Id.eq(model.id))
        .filter(product::Column::Version.eq(expected))
        .exec(db)
        .await
        .map_err(|e| ServiceError::from_write(e, DUPLICATE_SKU))?;

    if result.rows_affected == 0 {
        warn!(product_id = %model.id, version = expected, "stale product write rejected");
        return Err(ServiceError::ConcurrentModification(model.id));
    }
    Ok(model)
}

/// Products side of the catalog, including stock adjustments
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    catalog: CatalogConfig,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, catalog: CatalogConfig) -> Self {
        Self {
            db_pool,
            event_sender,
            catalog,
        }
    }

    async fn find_model(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    async fn school_summaries(
        &self,
        products: &[product::Model],
    ) -> Result<HashMap<Uuid, SchoolSummary>, ServiceError> {
        let mut ids: Vec<Uuid> = products.iter().filter_map(|p| p.school_id).collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let schools = school::Entity::find()
            .filter(school::Column::Id.is_in(ids))
            .all(&*self.db_pool)
            .await?;
        Ok(schools
            .iter()
            .map(|s| (s.id, SchoolSummary::from(s)))
            .collect())
    }

    async fn admin_view(&self, model: product::Model) -> Result<AdminProductView, ServiceError> {
        let summaries = self.school_summaries(std::slice::from_ref(&model)).await?;
        let school = model.school_id.and_then(|id| summaries.get(&id).cloned());
        Ok(AdminProductView::new(&model, school))
    }

    async fn ensure_school_exists(&self, school_id: Uuid) -> Result<(), ServiceError> {
        let found = school::Entity::find_by_id(school_id)
            .filter(school::Column::Lifecycle.eq(Lifecycle::Active))
            .count(&*self.db_pool)
            .await?;
        if found == 0 {
            return Err(ServiceError::NotFound("School not found".to_string()));
        }
        Ok(())
    }

    /// Resolves a school filter given as id or slug. `None` means the school
    /// does not exist, so the listing is empty.
    async fn resolve_school_filter(&self, raw: &str) -> Result<Option<Uuid>, ServiceError> {
        if let Ok(id) = Uuid::parse_str(raw) {
            return Ok(Some(id));
        }
        Ok(school::Entity::find()
            .filter(school::Column::Slug.eq(raw))
            .one(&*self.db_pool)
            .await?
            .map(|s| s.id))
    }

    async fn fetch_page(
        &self,
        query: Select<product::Entity>,
        request: PageRequest,
    ) -> Result<Page<product::Model>, ServiceError> {
        let paginator = query
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db_pool, request.limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(request.index()).await?;
        Ok(Page::new(items, total, request))
    }

    async fn with_schools<V>(
        &self,
        page: Page<product::Model>,
        view: impl Fn(&product::Model, Option<SchoolSummary>) -> V,
    ) -> Result<Page<V>, ServiceError> {
        let summaries = self.school_summaries(&page.items).await?;
        Ok(page.map(|model| {
            let school = model.school_id.and_then(|id| summaries.get(&id).cloned());
            view(&model, school)
        }))
    }

    /// Active products for the storefront, newest first. Quantities are never exposed.
    #[instrument(skip(self))]
    pub async fn list_public_products(
        &self,
        filter: ProductFilter,
    ) -> Result<Page<PublicProductView>, ServiceError> {
        let request = PageRequest::new(filter.page, filter.limit, PUBLIC_PAGE_SIZE);
        let mut query = product::Entity::find()
            .filter(product::Column::Lifecycle.eq(Lifecycle::Active));

        if let Some(raw) = filter.school.as_deref().filter(|s| !s.is_empty()) {
            match self.resolve_school_filter(raw).await? {
                Some(id) => query = query.filter(product::Column::SchoolId.eq(id)),
                None => {
                    return Ok(Page::new(Vec::new(), 0, request));
                }
            }
        }
        if let Some(category) = filter.category {
            query = query.filter(product::Column::Category.eq(category));
        }
        if let Some(institution) = filter.institution.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(product::Column::Institution.eq(institution));
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(search_condition(term));
        }
        if let Some(min) = filter.min_price {
            query = query.filter(product::Column::Price.gte(min));
        }
        if let Some(max) = filter.max_price {
            query = query.filter(product::Column::Price.lte(max));
        }

        let page = self.fetch_page(query, request).await?;
        self.with_schools(page, PublicProductView::new).await
    }

    #[instrument(skip(self))]
    pub async fn get_public_product(&self, id: Uuid) -> Result<PublicProductView, ServiceError> {
        let model = self.find_model(id).await?;
        if !model.is_active() {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }
        let summaries = self.school_summaries(std::slice::from_ref(&model)).await?;
        let school = model.school_id.and_then(|id| summaries.get(&id).cloned());
        Ok(PublicProductView::new(&model, school))
    }

    #[instrument(skip(self))]
    pub async fn get_admin_product(&self, id: Uuid) -> Result<AdminProductView, ServiceError> {
        let model = self.find_model(id).await?;
        self.admin_view(model).await
    }

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<AdminProductView, ServiceError> {
        request.validate()?;
        validate_rating(request.rating)?;
        let institution = request
            .institution
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty());
        ensure_single_owner(request.school, institution.as_deref())?;
        if let Some(school_id) = request.school {
            self.ensure_school_exists(school_id).await?;
        }

        let stock = stock_from_input(request.stock)?;
        let now = Utc::now();
        let mut model = product::Model {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            sku: normalize_sku(&request.sku),
            description: request.description,
            category: request.category,
            school_id: request.school,
            institution,
            price: request.price,
            original_price: request.original_price,
            images: StringList(request.images),
            sizes: StringList(request.sizes),
            colors: StringList(request.colors),
            stock,
            low_stock_alert: false,
            is_out_of_stock: true,
            rating: request.rating.unwrap_or(Decimal::ZERO),
            reviews: request.reviews.unwrap_or(0),
            lifecycle: Lifecycle::Active,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        model.recompute_stock_flags(self.catalog.low_stock_threshold);

        let created = product::ActiveModel::from(model)
            .reset_all()
            .insert(&*self.db_pool)
            .await
            .map_err(|e| ServiceError::from_write(e, DUPLICATE_SKU))?;

        info!(product_id = %created.id, sku = %created.sku, "product created");
        self.admin_view(created).await
    }

    /// Partial update. A replaced stock list is deduplicated and the flags recomputed.
    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<AdminProductView, ServiceError> {
        request.validate()?;
        validate_rating(request.rating)?;
        let mut model = self.find_model(id).await?;

        if let Some(name) = request.name {
            model.name = name.trim().to_string();
        }
        if let Some(sku) = request.sku {
            model.sku = normalize_sku(&sku);
        }
        if let Some(description) = request.description {
            model.description = description;
        }
        if let Some(category) = request.category {
            model.category = category;
        }
        if let Some(school_id) = request.school {
            if let Some(school_id) = school_id {
                self.ensure_school_exists(school_id).await?;
            }
            model.school_id = school_id;
        }
        if let Some(institution) = request.institution {
            model.institution = institution
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty());
        }
        ensure_single_owner(model.school_id, model.institution.as_deref())?;

        if let Some(price) = request.price {
            model.price = price;
        }
        if let Some(original_price) = request.original_price {
            if let Some(value) = original_price {
                validate_non_negative_price(&value).map_err(|_| {
                    ServiceError::ValidationError("Price must not be negative".to_string())
                })?;
            }
            model.original_price = original_price;
        }
        if let Some(images) = request.images {
            model.images = StringList(images);
        }
        if let Some(sizes) = request.sizes {
            model.sizes = StringList(sizes);
        }
        if let Some(colors) = request.colors {
            model.colors = StringList(colors);
        }
        if let Some(stock) = request.stock {
            model.stock = stock_from_input(stock)?;
        }
        if let Some(rating) = request.rating {
            model.rating = rating;
        }
        if let Some(reviews) = request.reviews {
            model.reviews = reviews;
        }
        if let Some(is_active) = request.is_active {
            model.lifecycle = Lifecycle::from_active_flag(is_active);
        }
        model.recompute_stock_flags(self.catalog.low_stock_threshold);

        let updated = write_versioned(&*self.db_pool, model).await?;
        self.admin_view(updated).await
    }

    /// Soft delete under the version guard, so a writer holding an older read
    /// cannot bring the product back.
    #[instrument(skip(self))]
    pub async fn retire_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut model = self.find_model(id).await?;
        model.lifecycle = Lifecycle::Retired;
        write_versioned(&*self.db_pool, model).await?;

        info!(product_id = %id, "product retired");
        self.event_sender.send_or_log(Event::ProductRetired(id)).await;
        Ok(())
    }

    /// Every product regardless of lifecycle, with full stock detail
    #[instrument(skip(self))]
    pub async fn list_admin_products(
        &self,
        filter: AdminProductFilter,
    ) -> Result<Page<AdminProductView>, ServiceError> {
        let request = PageRequest::new(filter.page, filter.limit, ADMIN_PAGE_SIZE);
        let mut query = product::Entity::find();

        if let Some(raw) = filter.school.as_deref().filter(|s| !s.is_empty()) {
            match self.resolve_school_filter(raw).await? {
                Some(id) => query = query.filter(product::Column::SchoolId.eq(id)),
                None => {
                    return Ok(Page::new(Vec::new(), 0, request));
                }
            }
        }
        if let Some(category) = filter.category {
            query = query.filter(product::Column::Category.eq(category));
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(search_condition(term));
        }
        if filter.low_stock == Some(true) {
            query = query.filter(product::Column::LowStockAlert.eq(true));
        }
        if filter.out_of_stock == Some(true) {
            query = query.filter(product::Column::IsOutOfStock.eq(true));
        }

        let page = self.fetch_page(query, request).await?;
        self.with_schools(page, AdminProductView::new).await
    }

    /// Sets the quantity of one stock line, creating the line when absent.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        id: Uuid,
        adjustment: StockAdjustment,
    ) -> Result<AdminProductView, ServiceError> {
        let (size, quantity) = match (
            adjustment.size.as_deref().map(str::trim),
            adjustment.quantity,
        ) {
            (Some(size), Some(quantity)) if !size.is_empty() => (size.to_string(), quantity),
            _ => {
                return Err(ServiceError::ValidationError(
                    "Please provide size and quantity".to_string(),
                ))
            }
        };
        let color = color_or_default(adjustment.color.as_deref());

        let mut model = self.find_model(id).await?;
        let was_low = model.low_stock_alert;
        model.set_stock(&size, &color, quantity, self.catalog.low_stock_threshold);
        let updated = write_versioned(&*self.db_pool, model).await?;

        info!(product_id = %id, size = %size, color = %color, quantity, "stock adjusted");
        self.event_sender
            .send_or_log(Event::StockAdjusted {
                product_id: id,
                size,
                color,
                quantity: quantity.max(0),
            })
            .await;
        if updated.low_stock_alert && !was_low {
            self.event_sender
                .send_or_log(Event::LowStock {
                    product_id: id,
                    sku: updated.sku.clone(),
                })
                .await;
        }

        self.admin_view(updated).await
    }
}
