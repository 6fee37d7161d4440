use crate::{
    entities::corporate_inquiry::InquiryView,
    handlers::common::{created, parse_id, CreatedResult},
    services::inquiries::{CreateInquiryRequest, InquiryFilter, InquiryStats, UpdateInquiryRequest},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};

pub async fn create_inquiry(
    State(state): State<AppState>,
    Json(payload): Json<CreateInquiryRequest>,
) -> CreatedResult<InquiryView> {
    let inquiry = state.services.inquiries.create_inquiry(payload).await?;
    Ok(created(
        ApiResponse::success(inquiry).with_message("Inquiry submitted successfully"),
    ))
}

pub async fn list_inquiries(
    State(state): State<AppState>,
    Query(filter): Query<InquiryFilter>,
) -> ApiResult<Vec<InquiryView>> {
    let page = state.services.inquiries.list_inquiries(filter).await?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn get_inquiry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<InquiryView> {
    let id = parse_id(&id, "inquiry")?;
    let inquiry = state.services.inquiries.get_inquiry(id).await?;
    Ok(Json(ApiResponse::success(inquiry)))
}

pub async fn update_inquiry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateInquiryRequest>,
) -> ApiResult<InquiryView> {
    let id = parse_id(&id, "inquiry")?;
    let inquiry = state.services.inquiries.update_inquiry(id, payload).await?;
    Ok(Json(ApiResponse::success(inquiry)))
}

pub async fn inquiry_stats(State(state): State<AppState>) -> ApiResult<InquiryStats> {
    let stats = state.services.inquiries.inquiry_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}
