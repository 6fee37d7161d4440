use crate::{
    entities::product::{AdminProductView, PublicProductView},
    handlers::common::{created, parse_id, CreatedResult},
    services::products::{
        AdminProductFilter, CreateProductRequest, ProductFilter, StockAdjustment,
        UpdateProductRequest,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};

/// Storefront listing; stock is reported per line as in/out only.
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Vec<PublicProductView>> {
    let page = state.services.products.list_public_products(filter).await?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PublicProductView> {
    let id = parse_id(&id, "product")?;
    let product = state.services.products.get_public_product(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn list_all_products(
    State(state): State<AppState>,
    Query(filter): Query<AdminProductFilter>,
) -> ApiResult<Vec<AdminProductView>> {
    let page = state.services.products.list_admin_products(filter).await?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn get_admin_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AdminProductView> {
    let id = parse_id(&id, "product")?;
    let product = state.services.products.get_admin_product(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> CreatedResult<AdminProductView> {
    let product = state.services.products.create_product(payload).await?;
    Ok(created(ApiResponse::success(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<AdminProductView> {
    let id = parse_id(&id, "product")?;
    let product = state.services.products.update_product(id, payload).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id, "product")?;
    state.services.products.retire_product(id).await?;
    Ok(Json(ApiResponse::message("Product deleted successfully")))
}

pub async fn update_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<StockAdjustment>,
) -> ApiResult<AdminProductView> {
    let id = parse_id(&id, "product")?;
    let product = state.services.products.adjust_stock(id, payload).await?;
    Ok(Json(
        ApiResponse::success(product).with_message("Stock updated successfully"),
    ))
}
