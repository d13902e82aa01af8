use super::*;
use crate::lazy::LazyQuery;
use std::fs;
use tempfile::TempDir;

const DAILY_MODEL: &str = r#"
function run(con, ldbt)
  local users = con:table("users")
  return users
    :group_by("registration_date")
    :aggregate({ daily_registrations = users.id:count() })
    :order_by("registration_date")
end
"#;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn db() -> Arc<dyn Database> {
    ld_db::connect_in_memory().unwrap()
}

#[test]
fn test_load_and_invoke() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "daily.lua", DAILY_MODEL);

    let entry = load_entry_point(&path).unwrap();
    assert_eq!(entry.path(), path.as_path());

    let query = entry.invoke(&db()).unwrap();
    assert!(query.compile().unwrap().contains("GROUP BY \"registration_date\""));
}

#[test]
fn test_missing_entry_point() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "no_run.lua", "function build(con) return con:table('x') end\n");

    let err = match load_entry_point(&path) {
        Ok(_) => panic!("model without run should not load"),
        Err(e) => e,
    };
    assert!(matches!(err, ModelError::MissingEntryPoint { .. }));
    assert!(err.to_string().starts_with("[M002]"));
}

#[test]
fn test_run_must_be_a_function() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "not_fn.lua", "run = 42\n");
    assert!(matches!(
        load_entry_point(&path),
        Err(ModelError::MissingEntryPoint { .. })
    ));
}

#[test]
fn test_syntax_error_is_load_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "broken.lua", "function run(con, ldbt\n");
    assert!(matches!(
        load_entry_point(&path),
        Err(ModelError::Load { .. })
    ));
}

#[test]
fn test_missing_file_is_load_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        load_entry_point(&dir.path().join("absent.lua")),
        Err(ModelError::Load { .. })
    ));
}

#[test]
fn test_each_load_is_isolated() {
    let dir = TempDir::new().unwrap();
    let first = write(
        &dir,
        "first.lua",
        "counter = 1\nfunction run(con) return con:table('first') end\n",
    );
    let second = write(
        &dir,
        "second.lua",
        "assert(counter == nil)\nfunction run(con) return con:table('second') end\n",
    );

    let db = db();
    let a = load_entry_point(&first).unwrap().invoke(&db).unwrap();
    let b = load_entry_point(&second).unwrap().invoke(&db).unwrap();
    assert!(a.compile().unwrap().contains("\"first\""));
    assert!(b.compile().unwrap().contains("\"second\""));
}

#[test]
fn test_runtime_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "boom.lua", "function run(con) error('boom') end\n");
    let err = load_entry_point(&path).unwrap().invoke(&db()).unwrap_err();
    assert!(matches!(err, ModelError::Runtime { .. }));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn test_not_an_expression() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "grouped.lua",
        "function run(con) return con:table('t'):group_by('k') end\n",
    );
    let err = load_entry_point(&path).unwrap().invoke(&db()).unwrap_err();
    match err {
        ModelError::NotAnExpression { found, .. } => assert!(found.contains("grouped")),
        other => panic!("unexpected error: {}", other),
    }

    let path = write(&dir, "number.lua", "function run() return 1 end\n");
    let err = load_entry_point(&path).unwrap().invoke(&db()).unwrap_err();
    assert!(err.to_string().contains("integer"));
}

#[test]
fn test_unbound_table_uses_invoking_connection() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "unbound.lua",
        "function run(con, ldbt) return ldbt.table('events') end\n",
    );
    let bigquery = ld_db::connect_tagged("bigquery", Default::default()).unwrap();
    let query = load_entry_point(&path).unwrap().invoke(&bigquery).unwrap();
    assert_eq!(query.compile().unwrap(), "SELECT *\nFROM `events`");
}

#[test]
fn test_require_sibling_module() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "helpers/init.lua",
        "return { source = function(con) return con:table('raw_users') end }\n",
    );
    let path = write(
        &dir,
        "uses_helper.lua",
        "local helpers = require('helpers')\nfunction run(con) return helpers.source(con) end\n",
    );
    let query = load_entry_point(&path).unwrap().invoke(&db()).unwrap();
    assert!(query.compile().unwrap().contains("\"raw_users\""));
}

#[test]
fn test_load_test_cases() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "daily_test.lua",
        r#"
TEST_CASES = {
  {
    name = "counts",
    description = "Counts per day",
    input_data = {
      users = {
        columns = { "id", "registration_date" },
        rows = { { 1, "2024-01-01" }, { 2, NULL }, { 3 } },
      },
      accounts = { columns = { "id" }, rows = {} },
    },
    expected_output = {
      columns = { "registration_date", "daily_registrations" },
      rows = { { "2024-01-01", 1.5 } },
    },
  },
  {
    name = "no_description",
    expected_output = { columns = { "x" } },
  },
}
"#,
    );

    let cases = load_test_cases(&path).unwrap();
    assert_eq!(cases.len(), 2);

    let first = &cases[0];
    assert_eq!(first.name, "counts");
    assert_eq!(first.success_message(), "Counts per day");
    let names: Vec<&str> = first.input_data.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["accounts", "users"]);

    let users = &first.input_data[1].1;
    assert_eq!(
        users.rows(),
        &[
            vec![ld_core::Value::Int(1), ld_core::Value::Text("2024-01-01".to_string())],
            vec![ld_core::Value::Int(2), ld_core::Value::Null],
            vec![ld_core::Value::Int(3), ld_core::Value::Null],
        ]
    );
    assert_eq!(
        first.expected_output.rows()[0][1],
        ld_core::Value::Float(1.5)
    );

    assert_eq!(cases[1].success_message(), "Test passed");
    assert!(cases[1].input_data.is_empty());
    assert_eq!(cases[1].expected_output.num_rows(), 0);
}

#[test]
fn test_missing_test_cases() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "empty_test.lua", "-- nothing here\n");
    assert!(matches!(
        load_test_cases(&path),
        Err(ModelError::MissingTestCases { .. })
    ));
}

#[test]
fn test_row_wider_than_columns_is_invalid() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "wide_test.lua",
        r#"
TEST_CASES = {
  { name = "ok", expected_output = { columns = { "a" }, rows = { { 1 } } } },
  { name = "wide", expected_output = { columns = { "a" }, rows = { { 1, 2 } } } },
}
"#,
    );
    match load_test_cases(&path) {
        Err(ModelError::InvalidTestCase { index, message, .. }) => {
            assert_eq!(index, 2);
            assert!(message.contains("row 1"));
        }
        other => panic!("unexpected result: {:?}", other.map(|c| c.len())),
    }
}

#[test]
fn test_missing_expected_output_is_invalid() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "bad_test.lua", "TEST_CASES = { { name = 'x' } }\n");
    assert!(matches!(
        load_test_cases(&path),
        Err(ModelError::InvalidTestCase { index: 1, .. })
    ));
}
