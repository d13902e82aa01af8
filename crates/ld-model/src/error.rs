//! Error types for ld-model

use thiserror::Error;

/// Model loading, compilation and materialization errors
#[derive(Error, Debug)]
pub enum ModelError {
    /// M001: Model file could not be read or its top-level code failed
    #[error("[M001] Failed to load '{path}': {message}")]
    Load { path: String, message: String },

    /// M002: Model file does not define the entry point
    #[error("[M002] Model '{path}' does not define a function named 'run'")]
    MissingEntryPoint { path: String },

    /// M003: The entry point raised an error
    #[error("[M003] Error running model '{path}': {message}")]
    Runtime { path: String, message: String },

    /// M004: The entry point returned something other than a table expression
    #[error("[M004] Model '{path}' returned {found}, expected a table expression")]
    NotAnExpression { path: String, found: String },

    /// M005: Test file does not define TEST_CASES
    #[error("[M005] Test file '{path}' does not define TEST_CASES")]
    MissingTestCases { path: String },

    /// M006: A test case is malformed
    #[error("[M006] Invalid test case {index} in '{path}': {message}")]
    InvalidTestCase {
        path: String,
        index: usize,
        message: String,
    },

    /// M007: SQL could not be generated or does not parse
    #[error("[M007] Failed to compile model SQL: {message}")]
    Compilation { message: String },

    /// M008: Generated SQL could not be written
    #[error("[M008] Failed to write '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    /// M009: Error attributed to a specific model during a batch
    #[error("[M009] Model '{model}' failed: {source}")]
    InModel {
        model: String,
        #[source]
        source: Box<ModelError>,
    },

    /// Core error
    #[error(transparent)]
    Core(#[from] ld_core::CoreError),

    /// Database error
    #[error(transparent)]
    Db(#[from] ld_db::DbError),
}

impl ModelError {
    /// Attach the model path to an error raised while processing it
    pub fn in_model(self, model: impl Into<String>) -> Self {
        ModelError::InModel {
            model: model.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for ModelError
pub type ModelResult<T> = Result<T, ModelError>;
