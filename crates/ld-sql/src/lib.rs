//! ld-sql - SQL dialect layer for ldbt
//!
//! This crate maps each backend to its SQL dialect (identifier quoting and
//! the sqlparser dialect used to validate compiled model SQL).

pub mod dialect;
pub mod error;
pub mod parser;

pub use dialect::{dialect_for, SqlDialect};
pub use error::{SqlError, SqlResult};
pub use parser::SqlParser;
