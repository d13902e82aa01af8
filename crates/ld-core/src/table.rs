//! In-memory concrete tables and their equality semantics
//!
//! A [`ConcreteTable`] is the realized form of a query: ordered column names
//! and ordered rows of typed cells. Fixture inputs, expected outputs and
//! executed results all use this type.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use thiserror::Error;

/// Relative tolerance used when comparing floating point cells
pub const FLOAT_RTOL: f64 = 1e-5;

/// Absolute tolerance used when comparing floating point cells
pub const FLOAT_ATOL: f64 = 1e-8;

/// A single typed cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Short type name used in mismatch messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
        }
    }

    /// Render the value as a SQL literal
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => format!("{:?}", f),
            Value::Float(f) => format!("'{}'::DOUBLE", f),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    /// Cell equality: exact for every type except floats, which use a
    /// relative tolerance. Two NULLs are equal.
    pub fn matches(&self, expected: &Value) -> bool {
        match (self, expected) {
            (Value::Float(a), Value::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                a == b || (a - b).abs() <= FLOAT_ATOL + FLOAT_RTOL * b.abs()
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Storage type of a fixture column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    BigInt,
    Double,
    Varchar,
}

impl ColumnType {
    /// SQL type name used when creating fixture tables
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Varchar => "VARCHAR",
        }
    }

    /// Infer a column's type from its cells.
    ///
    /// NULLs are ignored, integers widen to DOUBLE when mixed with floats,
    /// and an all-NULL column is stored as VARCHAR.
    pub fn infer<'a>(
        column: &str,
        values: impl IntoIterator<Item = &'a Value>,
    ) -> CoreResult<ColumnType> {
        let mut inferred: Option<(ColumnType, &'static str)> = None;

        for value in values {
            let (ty, name) = match value {
                Value::Null => continue,
                Value::Bool(_) => (ColumnType::Boolean, "bool"),
                Value::Int(_) => (ColumnType::BigInt, "int"),
                Value::Float(_) => (ColumnType::Double, "float"),
                Value::Text(_) => (ColumnType::Varchar, "text"),
            };

            inferred = match inferred {
                None => Some((ty, name)),
                Some((current, _)) if current == ty => inferred,
                Some((ColumnType::BigInt, _)) if ty == ColumnType::Double => Some((ty, name)),
                Some((ColumnType::Double, _)) if ty == ColumnType::BigInt => inferred,
                Some((_, first)) => {
                    return Err(CoreError::MixedColumnTypes {
                        column: column.to_string(),
                        first: first.to_string(),
                        second: name.to_string(),
                    })
                }
            };
        }

        Ok(inferred.map(|(ty, _)| ty).unwrap_or(ColumnType::Varchar))
    }
}

/// Why two tables are not equal
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableMismatch {
    #[error("Column names differ: actual {actual:?}, expected {expected:?}")]
    Columns {
        actual: Vec<String>,
        expected: Vec<String>,
    },

    #[error("Row count differs: actual {actual}, expected {expected}")]
    RowCount { actual: usize, expected: usize },

    #[error(
        "Values differ at row {row}, column '{column}': actual {actual} ({actual_type}), expected {expected} ({expected_type})"
    )]
    Cell {
        row: usize,
        column: String,
        actual: String,
        actual_type: &'static str,
        expected: String,
        expected_type: &'static str,
    },
}

/// Realized tabular value with named columns and ordered rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConcreteTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ConcreteTable {
    /// Build a table, checking every row has one value per column
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> CoreResult<Self> {
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(CoreError::RowWidth {
                    row: idx,
                    found: row.len(),
                    expected: columns.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in order
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Cells of one column, top to bottom
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(idx))
    }

    /// Inferred storage type of every column
    pub fn column_types(&self) -> CoreResult<Vec<ColumnType>> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| ColumnType::infer(name, self.column_values(idx)))
            .collect()
    }

    /// Structural equality against an expected table.
    ///
    /// Column names and their order must match, then the row count, then
    /// every cell in row order. The first difference found is returned.
    pub fn compare(&self, expected: &ConcreteTable) -> Result<(), TableMismatch> {
        if self.columns != expected.columns {
            return Err(TableMismatch::Columns {
                actual: self.columns.clone(),
                expected: expected.columns.clone(),
            });
        }

        if self.rows.len() != expected.rows.len() {
            return Err(TableMismatch::RowCount {
                actual: self.rows.len(),
                expected: expected.rows.len(),
            });
        }

        for (row_idx, (actual_row, expected_row)) in
            self.rows.iter().zip(&expected.rows).enumerate()
        {
            for (col_idx, (actual, wanted)) in actual_row.iter().zip(expected_row).enumerate() {
                if !actual.matches(wanted) {
                    return Err(TableMismatch::Cell {
                        row: row_idx,
                        column: self.columns[col_idx].clone(),
                        actual: actual.to_string(),
                        actual_type: actual.type_name(),
                        expected: wanted.to_string(),
                        expected_type: wanted.type_name(),
                    });
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for ConcreteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join(" | "))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(f, "{}", cells.join(" | "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
