use super::*;
use ld_core::{Backend, ConnectionParams};
use std::fs;
use tempfile::TempDir;

const MODEL: &str = r#"
function run(con, ldbt)
  local users = con:table("users")
  return users
    :group_by("registration_date")
    :aggregate({ daily_registrations = users.id:count() })
    :order_by("registration_date")
end
"#;

struct Project {
    _dir: TempDir,
    models: PathBuf,
    output: PathBuf,
}

fn project(files: &[(&str, &str)]) -> Project {
    let dir = TempDir::new().unwrap();
    let models = dir.path().join("ldbt");
    let output = dir.path().join("models");
    fs::create_dir_all(&models).unwrap();
    fs::create_dir_all(&output).unwrap();
    for (name, content) in files {
        let path = models.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    Project {
        _dir: dir,
        models,
        output,
    }
}

fn duckdb() -> ConnectionConfig {
    ConnectionConfig::duckdb_in_memory()
}

#[test]
fn test_materialize_writes_sql() {
    let p = project(&[("daily.lua", MODEL)]);
    let generated = materialize_all(&p.models, &p.output, &duckdb()).unwrap();

    assert_eq!(generated.len(), 1);
    assert_eq!(generated[0].source, p.models.join("daily.lua"));
    assert_eq!(generated[0].output, p.output.join("daily.sql"));

    let sql = fs::read_to_string(p.output.join("daily.sql")).unwrap();
    assert!(sql.starts_with("SELECT \"registration_date\", COUNT(\"id\") AS \"daily_registrations\""));
    assert!(sql.ends_with("ORDER BY \"registration_date\" ASC\n"));
}

#[test]
fn test_path_mirroring_and_exclusion() {
    let p = project(&[
        ("daily.lua", MODEL),
        ("daily_test.lua", "TEST_CASES = {}\n"),
        ("init.lua", "error('never executed')\n"),
        ("marts/finance/revenue.lua", MODEL),
        ("marts/init.lua", "error('never executed')\n"),
        ("notes.txt", "not a model"),
    ]);

    let generated = materialize_all(&p.models, &p.output, &duckdb()).unwrap();
    let outputs: Vec<PathBuf> = generated.into_iter().map(|m| m.output).collect();
    assert_eq!(
        outputs,
        vec![
            p.output.join("daily.sql"),
            p.output.join("marts/finance/revenue.sql"),
        ]
    );
    assert!(!p.output.join("daily_test.sql").exists());
    assert!(!p.output.join("init.sql").exists());
}

#[test]
fn test_materialize_is_idempotent() {
    let p = project(&[("a.lua", MODEL), ("nested/b.lua", MODEL)]);

    materialize_all(&p.models, &p.output, &duckdb()).unwrap();
    let first_a = fs::read(p.output.join("a.sql")).unwrap();
    let first_b = fs::read(p.output.join("nested/b.sql")).unwrap();

    materialize_all(&p.models, &p.output, &duckdb()).unwrap();
    assert_eq!(fs::read(p.output.join("a.sql")).unwrap(), first_a);
    assert_eq!(fs::read(p.output.join("nested/b.sql")).unwrap(), first_b);
}

#[test]
fn test_existing_output_is_overwritten() {
    let p = project(&[("daily.lua", MODEL)]);
    fs::write(p.output.join("daily.sql"), "stale").unwrap();

    materialize_all(&p.models, &p.output, &duckdb()).unwrap();
    let sql = fs::read_to_string(p.output.join("daily.sql")).unwrap();
    assert!(sql.starts_with("SELECT"));
}

#[test]
fn test_missing_entry_point_aborts_batch() {
    let p = project(&[
        ("a_good.lua", MODEL),
        ("b_broken.lua", "function build() end\n"),
        ("c_never.lua", MODEL),
    ]);

    let err = materialize_all(&p.models, &p.output, &duckdb()).unwrap_err();
    match &err {
        ModelError::InModel { model, source } => {
            assert_eq!(model, "b_broken");
            assert!(matches!(**source, ModelError::MissingEntryPoint { .. }));
        }
        other => panic!("unexpected error: {}", other),
    }

    assert!(p.output.join("a_good.sql").exists());
    assert!(!p.output.join("c_never.sql").exists());
}

#[test]
fn test_remote_backend_compiles_in_its_dialect() {
    let p = project(&[("daily.lua", MODEL)]);
    let mut params = ConnectionParams::new();
    params.insert("project_id".to_string(), Some("analytics".to_string()));
    params.insert("credentials_path".to_string(), None);
    let config = ConnectionConfig::new(Backend::BigQuery, params);

    materialize_all(&p.models, &p.output, &config).unwrap();
    let sql = fs::read_to_string(p.output.join("daily.sql")).unwrap();
    assert!(sql.contains("COUNT(`id`) AS `daily_registrations`"));
}

#[test]
fn test_missing_model_root() {
    let dir = TempDir::new().unwrap();
    let err = materialize_all(
        &dir.path().join("ldbt"),
        &dir.path().join("models"),
        &duckdb(),
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::Core(_)));
}
