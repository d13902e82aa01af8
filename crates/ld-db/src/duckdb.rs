//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use async_trait::async_trait;
use duckdb::types::{TimeUnit, Value as DuckValue};
use duckdb::Connection;
use ld_core::{Backend, ConcreteTable, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, [])
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    /// Run a query and collect typed rows.
    ///
    /// DuckDB panics on `stmt.column_count()` before execution, so rows are
    /// collected via `query_map` first and column metadata read afterwards.
    fn query_table_sync(&self, sql: &str) -> DbResult<ConcreteTable> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(DbError::from)?;

        let rows: Vec<Vec<Value>> = stmt
            .query_map([], |row| {
                let col_count = row.as_ref().column_count();
                (0..col_count)
                    .map(|i| row.get::<_, DuckValue>(i).map(convert_value))
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(DbError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::ResultError(e.to_string()))?;

        let column_count = stmt.column_count();
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                stmt.column_name(i)
                    .map_or("?".to_string(), |v| v.to_string())
            })
            .collect();

        ConcreteTable::new(columns, rows).map_err(|e| DbError::ResultError(e.to_string()))
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let conn = self.lock()?;

        let (schema, table) = split_qualified_name(name);
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = '{}' AND table_name = '{}'",
            escape_sql_string(schema),
            escape_sql_string(table)
        );

        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;

        Ok(count > 0)
    }

    fn list_tables_sync(&self) -> DbResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT CASE WHEN table_schema = 'main' THEN table_name \
                 ELSE table_schema || '.' || table_name END \
                 FROM information_schema.tables \
                 WHERE table_catalog = current_database() \
                 ORDER BY 1",
            )
            .map_err(DbError::from)?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(DbError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::ResultError(e.to_string()))?;
        Ok(names)
    }

    /// Build the DDL and inserts that materialize a fixture table
    fn fixture_sql(name: &str, table: &ConcreteTable) -> DbResult<String> {
        let types = table.column_types().map_err(|e| DbError::InvalidFixture {
            table: name.to_string(),
            message: e.to_string(),
        })?;
        if types.is_empty() {
            return Err(DbError::InvalidFixture {
                table: name.to_string(),
                message: "table has no columns".to_string(),
            });
        }

        let qualified = quote_qualified(name);
        let column_defs: Vec<String> = table
            .columns()
            .iter()
            .zip(&types)
            .map(|(col, ty)| format!("{} {}", quote_ident(col), ty.sql_name()))
            .collect();

        let mut sql = String::new();
        let (schema, _) = split_qualified_name(name);
        if schema != "main" {
            sql.push_str(&format!(
                "CREATE SCHEMA IF NOT EXISTS {};\n",
                quote_qualified(schema)
            ));
        }
        sql.push_str(&format!(
            "CREATE TABLE {} ({});",
            qualified,
            column_defs.join(", ")
        ));

        if table.num_rows() > 0 {
            let values: Vec<String> = table
                .rows()
                .iter()
                .map(|row| {
                    let cells: Vec<String> = row.iter().map(Value::to_sql_literal).collect();
                    format!("({})", cells.join(", "))
                })
                .collect();
            sql.push_str(&format!(
                "\nINSERT INTO {} VALUES {};",
                qualified,
                values.join(", ")
            ));
        }

        Ok(sql)
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    fn backend(&self) -> Backend {
        Backend::DuckDb
    }

    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn query_table(&self, sql: &str) -> DbResult<ConcreteTable> {
        self.query_table_sync(sql)
    }

    async fn create_table(&self, name: &str, table: &ConcreteTable) -> DbResult<()> {
        let sql = Self::fixture_sql(name, table)?;
        let existed = self.relation_exists_sync(name)?;
        self.execute_batch_sync(&sql).map_err(|e| {
            // A failed INSERT leaves the freshly created table behind
            if !existed {
                let drop = format!("DROP TABLE IF EXISTS {}", quote_qualified(name));
                let _ = self.execute_sync(&drop);
            }
            DbError::InvalidFixture {
                table: name.to_string(),
                message: e.to_string(),
            }
        })
    }

    async fn drop_if_exists(&self, name: &str) -> DbResult<()> {
        let qualified = quote_qualified(name);
        // DROP TABLE errors when the name is a view, so fall back
        if self
            .execute_sync(&format!("DROP TABLE IF EXISTS {}", qualified))
            .is_err()
        {
            self.execute_sync(&format!("DROP VIEW IF EXISTS {}", qualified))?;
        }
        Ok(())
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    async fn list_tables(&self) -> DbResult<Vec<String>> {
        self.list_tables_sync()
    }
}

/// Convert a DuckDB cell into a concrete-table value.
///
/// Integers of every width become `Int` when they fit in i64, decimals
/// become `Float`, and dates and timestamps are rendered as ISO text.
fn convert_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::Int(i64::from(i)),
        DuckValue::SmallInt(i) => Value::Int(i64::from(i)),
        DuckValue::Int(i) => Value::Int(i64::from(i)),
        DuckValue::BigInt(i) => Value::Int(i),
        DuckValue::HugeInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(i.to_string())),
        DuckValue::UTinyInt(u) => Value::Int(i64::from(u)),
        DuckValue::USmallInt(u) => Value::Int(i64::from(u)),
        DuckValue::UInt(u) => Value::Int(i64::from(u)),
        DuckValue::UBigInt(u) => i64::try_from(u)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(u.to_string())),
        DuckValue::Float(f) => Value::Float(f64::from(f)),
        DuckValue::Double(f) => Value::Float(f),
        DuckValue::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>()
                .map(Value::Float)
                .unwrap_or(Value::Text(text))
        }
        DuckValue::Text(s) => Value::Text(s),
        DuckValue::Enum(s) => Value::Text(s),
        DuckValue::Date32(days) => chrono::DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .map(|dt| Value::Text(dt.date_naive().to_string()))
            .unwrap_or(Value::Int(i64::from(days))),
        DuckValue::Timestamp(unit, raw) => {
            let micros = match unit {
                TimeUnit::Second => raw.saturating_mul(1_000_000),
                TimeUnit::Millisecond => raw.saturating_mul(1_000),
                TimeUnit::Microsecond => raw,
                TimeUnit::Nanosecond => raw / 1_000,
            };
            let secs = micros.div_euclid(1_000_000);
            let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
            chrono::DateTime::from_timestamp(secs, nanos)
                .map(|dt| Value::Text(dt.naive_utc().to_string()))
                .unwrap_or(Value::Int(raw))
        }
        other => Value::Text(format!("{:?}", other)),
    }
}

/// Double-quote an identifier, escaping embedded quotes
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote each component of a possibly schema-qualified name
fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split `schema.table` on the last dot; unqualified names live in `main`
fn split_qualified_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("main", name),
    }
}

fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
