use crate::{
    entities::school::{SchoolCategory, SchoolView},
    handlers::common::{created, parse_id, CreatedResult},
    services::schools::{CreateSchoolRequest, UpdateSchoolRequest},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct SchoolListQuery {
    pub category: Option<SchoolCategory>,
}

pub async fn list_schools(
    State(state): State<AppState>,
    Query(query): Query<SchoolListQuery>,
) -> ApiResult<Vec<SchoolView>> {
    let schools = match query.category {
        Some(category) => {
            state
                .services
                .schools
                .list_schools_in_category(category)
                .await?
        }
        None => state.services.schools.list_schools().await?,
    };
    Ok(Json(ApiResponse::list(schools)))
}

/// Accepts either the school id or its slug.
pub async fn get_school(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> ApiResult<SchoolView> {
    let school = state.services.schools.get_school(&id_or_slug).await?;
    Ok(Json(ApiResponse::success(school)))
}

pub async fn list_all_schools(State(state): State<AppState>) -> ApiResult<Vec<SchoolView>> {
    let schools = state.services.schools.list_schools_with_stats().await?;
    Ok(Json(ApiResponse::list(schools)))
}

pub async fn create_school(
    State(state): State<AppState>,
    Json(payload): Json<CreateSchoolRequest>,
) -> CreatedResult<SchoolView> {
    let school = state.services.schools.create_school(payload).await?;
    Ok(created(ApiResponse::success(school)))
}

pub async fn update_school(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateSchoolRequest>,
) -> ApiResult<SchoolView> {
    let id = parse_id(&id, "school")?;
    let school = state.services.schools.update_school(id, payload).await?;
    Ok(Json(ApiResponse::success(school)))
}

pub async fn delete_school(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id, "school")?;
    state.services.schools.retire_school(id).await?;
    Ok(Json(ApiResponse::message("School deleted successfully")))
}
