//! Error types for ld-sql

use thiserror::Error;

/// SQL parsing errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,

    /// Statement is not a query (S003)
    #[error("[S003] Expected a single query, found: {0}")]
    NotAQuery(String),
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
