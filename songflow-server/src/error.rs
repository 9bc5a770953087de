//! HTTP error mapping for songflow-server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use songflow_common::Error;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Engine or storage error
    #[error(transparent)]
    Flow(#[from] Error),

    /// Missing or wrong admin credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Client exceeded a rate limit (429)
    #[error("Too many requests")]
    RateLimited,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Flow(Error::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Flow(Error::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
            }
            ApiError::Flow(Error::SelfVote(msg)) => (StatusCode::BAD_REQUEST, "SELF_VOTE", msg),
            ApiError::Flow(Error::Phase(msg)) => (StatusCode::CONFLICT, "PHASE_ERROR", msg),
            ApiError::Flow(Error::Duplicate(msg)) => (StatusCode::CONFLICT, "DUPLICATE", msg),
            ApiError::Flow(err) => {
                error!("Request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Too many requests, please try again later".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_domain_errors_map_to_client_statuses() {
        assert_eq!(
            status_of(Error::Validation("x".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::SelfVote("x".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(Error::Phase("x".into()).into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(Error::Duplicate("x".into()).into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_gate_errors() {
        assert_eq!(
            status_of(ApiError::Unauthorized("no".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(ApiError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_internal_error_is_not_echoed() {
        let response = ApiError::Flow(Error::Internal("secret detail".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("secret detail"));
        assert!(body.contains("INTERNAL_ERROR"));
    }
}
