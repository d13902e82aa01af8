//! Compile-only handles for remote warehouses

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use async_trait::async_trait;
use ld_core::{Backend, ConcreteTable, ConnectionParams};

/// Handle for postgres, bigquery and snowflake.
///
/// Models can be compiled against it using the backend's dialect, but no
/// wire connector exists, so every operation reports `NotImplemented`.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    backend: Backend,
    params: ConnectionParams,
}

impl RemoteBackend {
    pub fn new(backend: Backend, params: ConnectionParams) -> Self {
        Self { backend, params }
    }

    /// Connection parameters this handle was built from
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    fn unsupported<T>(&self, feature: &str) -> DbResult<T> {
        Err(DbError::NotImplemented {
            backend: self.backend.to_string(),
            feature: feature.to_string(),
        })
    }
}

#[async_trait]
impl Database for RemoteBackend {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn execute(&self, _sql: &str) -> DbResult<usize> {
        self.unsupported("execute")
    }

    async fn execute_batch(&self, _sql: &str) -> DbResult<()> {
        self.unsupported("execute_batch")
    }

    async fn query_table(&self, _sql: &str) -> DbResult<ConcreteTable> {
        self.unsupported("query_table")
    }

    async fn create_table(&self, _name: &str, _table: &ConcreteTable) -> DbResult<()> {
        self.unsupported("create_table")
    }

    async fn drop_if_exists(&self, _name: &str) -> DbResult<()> {
        self.unsupported("drop_if_exists")
    }

    async fn relation_exists(&self, _name: &str) -> DbResult<bool> {
        self.unsupported("relation_exists")
    }

    async fn list_tables(&self) -> DbResult<Vec<String>> {
        self.unsupported("list_tables")
    }
}
