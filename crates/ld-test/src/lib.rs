//! ld-test - Model unit-test harness for ldbt
//!
//! This crate runs the `TEST_CASES` declared next to a model against a
//! private in-memory DuckDB engine and reports one result per case.

pub mod runner;

pub use runner::{ModelTester, TestResult, TestSummary};
