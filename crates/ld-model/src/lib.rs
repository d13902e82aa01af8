//! ld-model - Model layer for ldbt
//!
//! Models are Lua files defining a global `run(con, ldbt)` that builds a
//! relational expression with the query toolkit. This crate loads them in
//! isolated Lua states, compiles the expressions to SQL for the bound
//! backend, and writes the results into the dbt models directory.

pub mod compile;
pub mod error;
pub mod expr;
pub mod lazy;
pub mod loader;
pub mod materialize;
pub mod toolkit;

pub use compile::SqlCompiler;
pub use error::{ModelError, ModelResult};
pub use expr::{NamedExpr, Relation, Scalar, SortKey};
pub use lazy::{LazyQuery, QueryExpr};
pub use loader::{load_entry_point, load_test_cases, EntryPoint};
pub use materialize::{compile_model, materialize_all, materialize_with, MaterializedModel};
