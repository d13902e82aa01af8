//! ld-core - Core library for ldbt
//!
//! This crate provides the connection descriptor and its `.env` loader,
//! project layout and model discovery, concrete tables with their equality
//! semantics, and the test-case data model shared by all ldbt components.

pub mod config;
pub mod error;
pub mod project;
pub mod table;
pub mod test_case;

pub use config::{Backend, ConnectionConfig, ConnectionParams};
pub use error::{CoreError, CoreResult};
pub use project::ProjectLayout;
pub use table::{ColumnType, ConcreteTable, TableMismatch, Value};
pub use test_case::TestCase;
