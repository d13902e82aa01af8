//! Error types for ld-core

use thiserror::Error;

/// Core error type for ldbt
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: The `.env` file does not exist
    #[error("[C001] Env file not found: {path}")]
    EnvFileNotFound { path: String },

    /// C002: The `.env` file could not be parsed
    #[error("[C002] Failed to parse env file {path}: {message}")]
    EnvParse { path: String, message: String },

    /// C003: Backend tag is not one of the recognized backends
    #[error("[C003] Invalid backend: {backend}. Must be one of: {valid}")]
    UnsupportedBackend { backend: String, valid: String },

    /// C004: No backend configured
    #[error("[C004] {key} must be set in .env file")]
    MissingBackend { key: String },

    /// C005: Directory expected by the project layout is missing
    #[error("[C005] Directory not found: {path}")]
    DirectoryNotFound { path: String },

    /// C006: A model path does not live under the model root
    #[error("[C006] Model '{path}' is not under model root '{root}'")]
    OutsideModelRoot { path: String, root: String },

    /// C007: A fixture column mixes incompatible value types
    #[error("[C007] Column '{column}' mixes incompatible types: {first} and {second}")]
    MixedColumnTypes {
        column: String,
        first: String,
        second: String,
    },

    /// C008: A table row does not match the column list
    #[error("[C008] Row {row} has {found} values but the table has {expected} columns")]
    RowWidth {
        row: usize,
        found: usize,
        expected: usize,
    },

    /// C009: IO error with file path context
    #[error("[C009] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
