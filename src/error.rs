/// Unified error types for the moderation service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for moderation operations
#[derive(Error, Debug)]
pub enum ModError {
    /// Target account does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Target account is not in a role this subsystem may moderate
    #[error("Ineligible target: {0}")]
    IneligibleTarget(String),

    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Audit detail could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage read/write failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Actor identity could not be verified
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Actor is verified but lacks the required privilege
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Internal server errors (bootstrap, migrations, listener)
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ModError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ModError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            ModError::IneligibleTarget(_) => (
                StatusCode::CONFLICT,
                "IneligibleTarget",
                self.to_string(),
            ),
            ModError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            ModError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            ModError::Authorization(_) => (StatusCode::FORBIDDEN, "Forbidden", self.to_string()),
            ModError::Serialization(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SerializationError",
                "Failed to encode audit record".to_string(),
            ),
            ModError::Persistence(_) | ModError::Internal(_) | ModError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for moderation operations
pub type ModResult<T> = Result<T, ModError>;
