//! SQL parser wrapper

use crate::dialect::{dialect_for, SqlDialect};
use crate::error::{SqlError, SqlResult};
use ld_core::Backend;
use sqlparser::ast::Statement;

/// SQL parser that wraps sqlparser-rs with dialect support
pub struct SqlParser {
    dialect: Box<dyn SqlDialect>,
}

impl SqlParser {
    /// Create a parser for a backend's dialect
    pub fn for_backend(backend: Backend) -> Self {
        Self {
            dialect: dialect_for(backend),
        }
    }

    /// Create a new parser with DuckDB dialect
    pub fn duckdb() -> Self {
        Self::for_backend(Backend::DuckDb)
    }

    /// Parse SQL into AST statements
    pub fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(SqlError::EmptySql);
        }

        self.dialect.parse(sql)
    }

    /// Check that `sql` is exactly one query statement
    pub fn validate_query(&self, sql: &str) -> SqlResult<()> {
        let stmts = self.parse(sql)?;
        match stmts.as_slice() {
            [Statement::Query(_)] => Ok(()),
            [other] => Err(SqlError::NotAQuery(other.to_string())),
            _ => Err(SqlError::NotAQuery(format!("{} statements", stmts.len()))),
        }
    }

    /// Get the dialect name
    pub fn dialect_name(&self) -> &'static str {
        self.dialect.name()
    }

    /// Quote an identifier for the current dialect
    pub fn quote_ident(&self, ident: &str) -> String {
        self.dialect.quote_ident(ident)
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::duckdb()
    }
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
