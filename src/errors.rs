use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::workflow::TransitionRejection;

/// Standard error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional detail (validation specifics), when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    /// The acting role may not execute the requested transition. The message
    /// enumerates the role's permitted workflow states.
    #[error("{0}")]
    AuthorizationError(String),

    /// The requested transition is not currently executable: structurally
    /// illegal, leaving a terminal state, or missing required evidence.
    #[error("{0}")]
    TransitionRejected(#[from] TransitionRejection),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Single source of truth for the error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthorizationError(_) => StatusCode::FORBIDDEN,
            Self::TransitionRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AuthError(_) => StatusCode::UNAUTHORIZED,
            Self::DatabaseError(_)
            | Self::EventError(_)
            | Self::StorageError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message suitable for HTTP responses. Infrastructure failures return
    /// generic text so internals never leak to clients.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::StorageError(_) => "Storage error".to_string(),
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Infrastructure failures are safe to retry; business-rule rejections
    /// are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_) | Self::StorageError(_) | Self::EventError(_)
        )
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::OrderStatus;

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        assert_eq!(
            ServiceError::ValidationError("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::AuthorizationError("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::NotFound("order".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        let rejection = TransitionRejection::TerminalState {
            current: OrderStatus::Completed,
        };
        assert_eq!(
            ServiceError::TransitionRejected(rejection).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn infrastructure_failures_hide_details_and_are_retryable() {
        let err = ServiceError::DatabaseError(sea_orm::DbErr::Custom("secret dsn".into()));
        assert_eq!(err.response_message(), "Database error");
        assert!(err.is_retryable());
        assert!(!ServiceError::ValidationError("x".into()).is_retryable());
    }

    #[test]
    fn transition_rejections_surface_their_reason_verbatim() {
        let rejection = TransitionRejection::NotAdjacent {
            from: OrderStatus::Created,
            to: OrderStatus::Processing,
        };
        let err = ServiceError::TransitionRejected(rejection.clone());
        assert_eq!(err.response_message(), rejection.to_string());
    }
}
