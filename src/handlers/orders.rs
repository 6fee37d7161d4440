use crate::{
    entities::order::OrderView,
    handlers::common::{created, parse_id, CreatedResult},
    services::orders::{OrderFilter, OrderStats, PlaceOrderRequest, UpdateOrderRequest},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};

/// Guest checkout
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<PlaceOrderRequest>,
) -> CreatedResult<OrderView> {
    let order = state.services.orders.place_order(payload).await?;
    Ok(created(
        ApiResponse::success(order).with_message("Order placed successfully"),
    ))
}

pub async fn get_order_by_number(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> ApiResult<OrderView> {
    let order = state
        .services
        .orders
        .get_order_by_number(&order_number)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> ApiResult<Vec<OrderView>> {
    let page = state.services.orders.list_orders(filter).await?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<OrderView> {
    let id = parse_id(&id, "order")?;
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOrderRequest>,
) -> ApiResult<OrderView> {
    let id = parse_id(&id, "order")?;
    let order = state.services.orders.update_order(id, payload).await?;
    Ok(Json(
        ApiResponse::success(order).with_message("Order updated successfully"),
    ))
}

pub async fn order_stats(State(state): State<AppState>) -> ApiResult<OrderStats> {
    let stats = state.services.orders.order_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}
