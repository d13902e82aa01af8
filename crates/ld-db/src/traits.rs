//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;
use ld_core::{Backend, ConcreteTable};

/// Live handle to a query engine.
///
/// Implementations must be Send + Sync so a handle can be shared through
/// an `Arc` for the length of a materialization batch or test run.
#[async_trait]
pub trait Database: Send + Sync {
    /// Backend this handle talks to; selects the SQL dialect
    fn backend(&self) -> Backend;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str {
        self.backend().as_str()
    }

    /// Execute SQL that modifies data, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query and collect the whole result set
    async fn query_table(&self, sql: &str) -> DbResult<ConcreteTable>;

    /// Create a table named `name` holding the given rows
    async fn create_table(&self, name: &str, table: &ConcreteTable) -> DbResult<()>;

    /// Drop a table or view if it exists
    async fn drop_if_exists(&self, name: &str) -> DbResult<()>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Names of every table and view, `schema.name` outside the default schema
    async fn list_tables(&self) -> DbResult<Vec<String>>;
}
