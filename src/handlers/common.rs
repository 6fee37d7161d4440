use crate::{errors::ServiceError, ApiResponse};
use axum::{http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

/// Result type for endpoints answering `201 Created`
pub type CreatedResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServiceError>;

/// Standard created response
pub fn created<T>(response: ApiResponse<T>) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(response))
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(ServiceError::from)
}

/// Parses a path id, reporting malformed ids with the envelope instead of a bare rejection.
pub fn parse_id(raw: &str, resource: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ServiceError::ValidationError(format!("Invalid {} id", resource)))
}
