//! Model unit-test definitions

use crate::table::ConcreteTable;

/// One fixture-input / expected-output pair declared for a model.
///
/// `input_data` keeps declaration order so fixture tables are created
/// deterministically.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    /// Test name, reported with the result
    pub name: String,

    /// Optional description, used as the success message
    pub description: Option<String>,

    /// Fixture tables substituted for real tables, by table name
    pub input_data: Vec<(String, ConcreteTable)>,

    /// Table the model must produce
    pub expected_output: ConcreteTable,
}

impl TestCase {
    /// Message reported when the case passes
    pub fn success_message(&self) -> String {
        self.description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "Test passed".to_string())
    }
}
