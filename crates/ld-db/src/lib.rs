//! ld-db - Database abstraction layer for ldbt
//!
//! This crate provides the `Database` trait, the DuckDB backend used for
//! materialized fixtures and model execution, compile-only handles for
//! remote warehouses, and the connection factory.

pub mod connect;
pub mod duckdb;
pub mod error;
pub mod remote;
pub mod traits;

pub use connect::{connect, connect_in_memory, connect_tagged};
pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use remote::RemoteBackend;
pub use traits::Database;
