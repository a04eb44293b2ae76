//! Database-specific error types and conversions.

use ims_core::error::ImsError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },
}

impl From<DbError> for ImsError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ImsError::NotFound { entity, id },
            DbError::Conflict { message } => ImsError::Conflict { message },
            other => ImsError::Database(other.to_string()),
        }
    }
}

/// True when a SurrealDB error is a unique-index violation, so repos
/// can surface duplicates as conflicts instead of opaque store errors.
pub(crate) fn is_unique_violation(err: &surrealdb::Error) -> bool {
    err.to_string().contains("already contains")
}
