//! Lazy query expressions returned by models

use crate::compile::SqlCompiler;
use crate::error::ModelResult;
use crate::expr::Relation;
use async_trait::async_trait;
use ld_core::{Backend, ConcreteTable};
use ld_db::Database;
use std::sync::Arc;

/// An unmaterialized computation that can be rendered or run
#[async_trait]
pub trait LazyQuery: Send + Sync {
    /// SQL text in the dialect of the bound backend
    fn compile(&self) -> ModelResult<String>;

    /// Run the query on the bound connection
    async fn execute(&self) -> ModelResult<ConcreteTable>;
}

/// Relation bound to the connection it will run on
pub struct QueryExpr {
    relation: Relation,
    db: Arc<dyn Database>,
}

impl QueryExpr {
    pub fn new(relation: Relation, db: Arc<dyn Database>) -> Self {
        Self { relation, db }
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    pub fn backend(&self) -> Backend {
        self.db.backend()
    }
}

impl std::fmt::Debug for QueryExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExpr")
            .field("relation", &self.relation)
            .field("backend", &self.db.db_type())
            .finish()
    }
}

#[async_trait]
impl LazyQuery for QueryExpr {
    fn compile(&self) -> ModelResult<String> {
        SqlCompiler::new(self.db.backend()).compile(&self.relation)
    }

    async fn execute(&self) -> ModelResult<ConcreteTable> {
        let sql = self.compile()?;
        log::debug!("Executing on {}:\n{}", self.db.db_type(), sql);
        Ok(self.db.query_table(&sql).await?)
    }
}

#[cfg(test)]
#[path = "lazy_test.rs"]
mod tests;
