//! Handler errors and their HTTP mapping

use crate::types::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dnp3_core::DataError;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Upstream data error: {0}")]
    Upstream(#[from] DataError),

    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Upstream(err) => {
                error!(error = %err, "Data service request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "upstream_error",
                    "The data service could not complete the request".to_string(),
                )
            }
            ApiError::ValidationError(errors) => {
                let message = format!("Validation failed: {}", errors);
                (StatusCode::BAD_REQUEST, "validation_error", message)
            }
        };

        let body = Json(ErrorResponse::new(error_code, message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let upstream = ApiError::from(DataError::unavailable("offline")).into_response();
        assert_eq!(upstream.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let errors = validator::ValidationErrors::new();
        let invalid = ApiError::from(errors).into_response();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let unauthorized = ApiError::Unauthorized("who".to_string()).into_response();
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
