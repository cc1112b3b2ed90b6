//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use concord_engine::{Conflict, Error as EngineError};
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("If-Match header is required")]
    PreconditionRequired,

    /// The stored revision no longer carries the expected tag.
    #[error("Precondition failed")]
    PreconditionFailed(Option<Box<Conflict>>),
}

impl AppError {
    pub fn conflict(conflict: Conflict) -> Self {
        AppError::PreconditionFailed(Some(Box::new(conflict)))
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn engine_status(error: &EngineError) -> StatusCode {
    match error {
        EngineError::EmptyKey
        | EngineError::InvalidMaxAttempts(_)
        | EngineError::MissingPartitionKey { .. }
        | EngineError::PartitionKeyMismatch { .. }
        | EngineError::UnexpectedPartitionKey(_)
        | EngineError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        EngineError::CollectionNotFound(_) | EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::AlreadyExists(_) => StatusCode::CONFLICT,
        EngineError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Cancelled(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match self {
            AppError::Engine(e) => {
                let status = engine_status(&e);
                match &e {
                    EngineError::Transport(_) => tracing::error!("Store unavailable: {}", e),
                    EngineError::Cancelled(_) => tracing::warn!("Store call cancelled: {}", e),
                    _ => tracing::debug!("Rejected request: {}", e),
                }
                (status, e.to_string(), None)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::PreconditionRequired => (
                StatusCode::PRECONDITION_REQUIRED,
                "If-Match header is required".to_string(),
                None,
            ),
            AppError::PreconditionFailed(conflict) => (
                StatusCode::PRECONDITION_FAILED,
                "Document was modified by another writer".to_string(),
                conflict.and_then(|c| serde_json::to_value(*c).ok()),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_statuses() {
        let cases = [
            (EngineError::EmptyKey, StatusCode::BAD_REQUEST),
            (EngineError::InvalidMaxAttempts(0), StatusCode::BAD_REQUEST),
            (EngineError::UnexpectedPartitionKey("Driver".into()), StatusCode::BAD_REQUEST),
            (EngineError::CollectionNotFound("Nope".into()), StatusCode::NOT_FOUND),
            (EngineError::NotFound("Address/Address-1".into()), StatusCode::NOT_FOUND),
            (EngineError::AlreadyExists("Address/Address-1".into()), StatusCode::CONFLICT),
            (EngineError::Transport("connection reset".into()), StatusCode::SERVICE_UNAVAILABLE),
            (EngineError::Cancelled("deadline".into()), StatusCode::GATEWAY_TIMEOUT),
        ];

        for (error, expected) in cases {
            assert_eq!(AppError::from(error).into_response().status(), expected);
        }
    }

    #[test]
    fn precondition_statuses() {
        assert_eq!(
            AppError::PreconditionRequired.into_response().status(),
            StatusCode::PRECONDITION_REQUIRED
        );
        assert_eq!(
            AppError::PreconditionFailed(None).into_response().status(),
            StatusCode::PRECONDITION_FAILED
        );
    }
}
