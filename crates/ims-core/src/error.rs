//! Error types for the IMS backend.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// A single field-level validation failure.
///
/// The shape is fixed (field + message) so validation errors carry a
/// known set of attributes all the way to the response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImsError {
    /// Missing, malformed, expired, or revoked credentials.
    ///
    /// Carries no reason: clients must not be able to distinguish why
    /// authentication failed. The reason goes to the security log at
    /// the point of failure instead.
    #[error("authentication required")]
    AuthenticationRequired,

    #[error("authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    /// Absent, or outside the caller's site scope — the two cases are
    /// indistinguishable by contract.
    #[error("not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Field-level validation failures, collected rather than
    /// first-wins so a client can fix everything in one round trip.
    #[error("validation failed")]
    Validation { errors: Vec<FieldError> },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("database error: {0}")]
    Database(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ImsResult<T> = Result<T, ImsError>;

/// Stable error codes exposed in the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    AuthenticationRequired,
    AuthorizationDenied,
    ResourceNotFound,
    ResourceConflict,
    ValidationFailed,
    RateLimited,
    Internal,
}

impl ImsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImsError::AuthenticationRequired => ErrorKind::AuthenticationRequired,
            ImsError::AuthorizationDenied { .. } => ErrorKind::AuthorizationDenied,
            ImsError::NotFound { .. } => ErrorKind::ResourceNotFound,
            ImsError::Conflict { .. } => ErrorKind::ResourceConflict,
            ImsError::Validation { .. } => ErrorKind::ValidationFailed,
            ImsError::RateLimited { .. } => ErrorKind::RateLimited,
            ImsError::Database(_) | ImsError::Crypto(_) | ImsError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// HTTP status the boundary layer maps this error to.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::AuthenticationRequired => 401,
            ErrorKind::AuthorizationDenied => 403,
            ErrorKind::ResourceNotFound => 404,
            ErrorKind::ResourceConflict => 409,
            ErrorKind::ValidationFailed => 400,
            ErrorKind::RateLimited => 429,
            ErrorKind::Internal => 500,
        }
    }
}

/// Uniform JSON error envelope:
/// `{"error": {"code", "message", "requestId", "details"}}`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorKind,
    pub message: String,
    #[serde(rename = "requestId")]
    pub request_id: Uuid,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

impl ErrorEnvelope {
    /// Build the client-facing envelope for an error.
    ///
    /// Internal error detail (database/crypto/unexpected) is replaced
    /// by a generic message unless `debug` is set.
    pub fn from_error(err: &ImsError, request_id: Uuid, debug: bool) -> Self {
        let message = match err.kind() {
            ErrorKind::Internal if !debug => "An internal error occurred".to_string(),
            _ => err.to_string(),
        };

        let details = match err {
            ImsError::Validation { errors } => errors.clone(),
            _ => Vec::new(),
        };

        Self {
            error: ErrorBody {
                code: err.kind(),
                message,
                request_id,
                details,
            },
        }
    }
}
