//! Error types for ld-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Fixture table could not be created (D004)
    #[error("[D004] Invalid fixture table '{table}': {message}")]
    InvalidFixture { table: String, message: String },

    /// Not implemented (D005)
    #[error("[D005] Feature not implemented for {backend}: {feature}")]
    NotImplemented { backend: String, feature: String },

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Result set could not be converted (D007)
    #[error("[D007] Failed to read query result: {0}")]
    ResultError(String),

    /// Unrecognized backend tag (D008)
    #[error("[D008] Unsupported backend: {backend}. Must be one of: {valid}")]
    UnsupportedBackend { backend: String, valid: String },
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants, so classify by
        // message with narrow patterns.
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("View with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

impl From<ld_core::CoreError> for DbError {
    fn from(err: ld_core::CoreError) -> Self {
        match err {
            ld_core::CoreError::UnsupportedBackend { backend, valid } => {
                DbError::UnsupportedBackend { backend, valid }
            }
            other => DbError::ResultError(other.to_string()),
        }
    }
}
