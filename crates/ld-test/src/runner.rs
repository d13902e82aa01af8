//! Test execution

use ld_core::project::test_path_for;
use ld_core::{TableMismatch, TestCase};
use ld_db::{Database, DbError};
use ld_model::{load_entry_point, load_test_cases, EntryPoint, LazyQuery, ModelError};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Outcome of one test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    /// Test case name
    pub name: String,

    /// Whether the model produced the expected output
    pub success: bool,

    /// Description on success, failure detail otherwise
    pub message: String,
}

impl TestResult {
    /// Create a passed test result
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            message: message.into(),
        }
    }

    /// Create a failed test result
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            message: message.into(),
        }
    }
}

/// Summary of test run
#[derive(Debug, Clone)]
pub struct TestSummary {
    /// Total cases run
    pub total: usize,

    /// Cases passed
    pub passed: usize,

    /// Cases failed
    pub failed: usize,

    /// Total execution time
    pub duration: Duration,
}

impl TestSummary {
    /// Create a summary from test results
    pub fn from_results(results: &[TestResult], duration: Duration) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.success).count();

        Self {
            total,
            passed,
            failed: total - passed,
            duration,
        }
    }

    /// Check if all tests passed
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for TestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} passed", self.passed, self.total)
    }
}

/// Anything that can fail a single case
#[derive(Debug, Error)]
enum CaseError {
    #[error("Failed to create fixture: {0}")]
    Fixture(DbError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Mismatch(#[from] TableMismatch),
}

/// Runs the test cases of one model
pub struct ModelTester {
    model_path: PathBuf,
    test_path: PathBuf,
}

impl ModelTester {
    /// Create a tester for a model and its test file
    pub fn new(model_path: impl Into<PathBuf>, test_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            test_path: test_path.into(),
        }
    }

    /// Create a tester for a model and its co-located `_test.lua` file
    pub fn for_model(model_path: impl Into<PathBuf>) -> Self {
        let model_path = model_path.into();
        let test_path = test_path_for(&model_path);
        Self::new(model_path, test_path)
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn test_path(&self) -> &Path {
        &self.test_path
    }

    /// Run every case against a fresh in-memory engine.
    ///
    /// Never fails: load and setup problems come back as a single failing
    /// result named after the model.
    pub async fn run_tests(&self) -> Vec<TestResult> {
        match ld_db::connect_in_memory() {
            Ok(db) => self.run_tests_with(&db).await,
            Err(e) => vec![TestResult::fail(self.model_stem(), e.to_string())],
        }
    }

    /// Run every case against the given engine
    pub async fn run_tests_with(&self, db: &Arc<dyn Database>) -> Vec<TestResult> {
        let cases = match load_test_cases(&self.test_path) {
            Ok(cases) => cases,
            Err(e) => return vec![TestResult::fail(self.model_stem(), e.to_string())],
        };
        let entry = match load_entry_point(&self.model_path) {
            Ok(entry) => entry,
            Err(e) => return vec![TestResult::fail(self.model_stem(), e.to_string())],
        };

        let mut results = Vec::with_capacity(cases.len());
        for case in &cases {
            results.push(self.run_case(&entry, case, db).await);
        }
        results
    }

    /// Run all cases and return summary
    pub async fn run_all(&self) -> (Vec<TestResult>, TestSummary) {
        let start = Instant::now();
        let results = self.run_tests().await;
        let summary = TestSummary::from_results(&results, start.elapsed());
        (results, summary)
    }

    async fn run_case(
        &self,
        entry: &EntryPoint,
        case: &TestCase,
        db: &Arc<dyn Database>,
    ) -> TestResult {
        log::debug!(
            "Running test case {} for {}",
            case.name,
            self.model_path.display()
        );

        let mut created = Vec::with_capacity(case.input_data.len());
        let outcome = execute_case(entry, case, db, &mut created).await;

        for table in created.iter().rev() {
            if let Err(e) = db.drop_if_exists(table).await {
                log::warn!("Failed to drop fixture table {}: {}", table, e);
            }
        }

        match outcome {
            Ok(()) => TestResult::pass(&case.name, case.success_message()),
            Err(e) => TestResult::fail(&case.name, e.to_string()),
        }
    }

    fn model_stem(&self) -> String {
        self.model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.model_path.display().to_string())
    }
}

/// Create fixtures, run the model and compare; names of created fixture
/// tables are pushed to `created` as they appear
async fn execute_case(
    entry: &EntryPoint,
    case: &TestCase,
    db: &Arc<dyn Database>,
    created: &mut Vec<String>,
) -> Result<(), CaseError> {
    for (name, table) in &case.input_data {
        db.create_table(name, table)
            .await
            .map_err(CaseError::Fixture)?;
        created.push(name.clone());
    }

    let query = entry.invoke(db)?;
    let actual = query.execute().await?;
    actual.compare(&case.expected_output)?;
    Ok(())
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
