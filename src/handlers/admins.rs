use crate::{
    auth::{AuthenticatedAdmin, LoginRequest, LoginResponse, RegisterAdminRequest},
    entities::admin::AdminView,
    handlers::common::{created, CreatedResult},
    ApiResponse, ApiResult, AppState,
};
use axum::{extract::State, Json};

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let session = state.auth.login(payload).await?;
    Ok(Json(ApiResponse::success(session)))
}

/// Super-admin only
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterAdminRequest>,
) -> CreatedResult<AdminView> {
    let admin = state.auth.register_admin(payload).await?;
    Ok(created(
        ApiResponse::success(admin).with_message("Admin registered successfully"),
    ))
}

pub async fn me(State(state): State<AppState>, admin: AuthenticatedAdmin) -> ApiResult<AdminView> {
    Ok(Json(ApiResponse::success(state.auth.me(&admin))))
}

/// Super-admin only
pub async fn list_admins(State(state): State<AppState>) -> ApiResult<Vec<AdminView>> {
    let admins = state.auth.list_admins().await?;
    Ok(Json(ApiResponse::list(admins)))
}
