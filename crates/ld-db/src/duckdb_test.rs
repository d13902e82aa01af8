use super::*;

fn users_fixture() -> ConcreteTable {
    ConcreteTable::new(
        vec!["id".to_string(), "name".to_string(), "score".to_string()],
        vec![
            vec![Value::Int(1), Value::Text("ada".to_string()), Value::Float(1.5)],
            vec![Value::Int(2), Value::Text("o'brien".to_string()), Value::Null],
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
    assert_eq!(db.backend(), Backend::DuckDb);
}

#[tokio::test]
async fn test_new_with_memory_path() {
    let db = DuckDbBackend::new(":memory:").unwrap();
    assert!(db.list_tables().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_backed_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warehouse.duckdb");
    let db = DuckDbBackend::from_path(&path).unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_execute_batch() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE t1 (id INT); CREATE TABLE t2 (id INT); INSERT INTO t1 VALUES (1);",
    )
    .await
    .unwrap();

    assert!(db.relation_exists("t1").await.unwrap());
    assert!(db.relation_exists("t2").await.unwrap());
}

#[tokio::test]
async fn test_execute_returns_affected_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").await.unwrap();
    let affected = db
        .execute("INSERT INTO t VALUES (1), (2), (3)")
        .await
        .unwrap();
    assert_eq!(affected, 3);
}

#[tokio::test]
async fn test_relation_not_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(!db.relation_exists("nonexistent").await.unwrap());
}

#[tokio::test]
async fn test_create_table_roundtrip() {
    let db = DuckDbBackend::in_memory().unwrap();
    let fixture = users_fixture();
    db.create_table("users", &fixture).await.unwrap();

    let result = db
        .query_table("SELECT id, name, score FROM users ORDER BY id")
        .await
        .unwrap();
    assert_eq!(result.compare(&fixture), Ok(()));
}

#[tokio::test]
async fn test_create_table_without_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    let empty = ConcreteTable::new(vec!["id".to_string()], vec![]).unwrap();
    db.create_table("empty", &empty).await.unwrap();

    let result = db.query_table("SELECT * FROM empty").await.unwrap();
    assert_eq!(result.columns(), &["id".to_string()]);
    assert_eq!(result.num_rows(), 0);
}

#[tokio::test]
async fn test_create_table_in_schema() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.create_table("raw.users", &users_fixture()).await.unwrap();

    assert!(db.relation_exists("raw.users").await.unwrap());
    assert_eq!(db.list_tables().await.unwrap(), vec!["raw.users"]);
}

#[tokio::test]
async fn test_create_table_duplicate_is_invalid_fixture() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.create_table("users", &users_fixture()).await.unwrap();
    let err = db
        .create_table("users", &users_fixture())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidFixture { .. }));
}

#[tokio::test]
async fn test_create_table_mixed_types_rejected() {
    let db = DuckDbBackend::in_memory().unwrap();
    let mixed = ConcreteTable::new(
        vec!["v".to_string()],
        vec![vec![Value::Int(1)], vec![Value::Text("x".to_string())]],
    )
    .unwrap();
    let err = db.create_table("mixed", &mixed).await.unwrap_err();
    assert!(err.to_string().contains("D004"));
}

#[tokio::test]
async fn test_query_table_types() {
    let db = DuckDbBackend::in_memory().unwrap();
    let result = db
        .query_table(
            "SELECT 1::TINYINT AS a, 2::INTEGER AS b, 3.5::DOUBLE AS c, \
             TRUE AS d, 'x' AS e, NULL AS f, SUM(x) AS g \
             FROM (VALUES (10), (20)) v(x)",
        )
        .await
        .unwrap();

    assert_eq!(result.columns(), &["a", "b", "c", "d", "e", "f", "g"]);
    assert_eq!(
        result.rows()[0],
        vec![
            Value::Int(1),
            Value::Int(2),
            Value::Float(3.5),
            Value::Bool(true),
            Value::Text("x".to_string()),
            Value::Null,
            Value::Int(30),
        ]
    );
}

#[tokio::test]
async fn test_query_table_dates() {
    let db = DuckDbBackend::in_memory().unwrap();
    let result = db
        .query_table("SELECT DATE '2024-01-02' AS d, TIMESTAMP '2024-01-02 03:04:05' AS ts")
        .await
        .unwrap();

    assert_eq!(result.rows()[0][0], Value::Text("2024-01-02".to_string()));
    assert_eq!(
        result.rows()[0][1],
        Value::Text("2024-01-02 03:04:05".to_string())
    );
}

#[tokio::test]
async fn test_query_missing_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.query_table("SELECT * FROM missing").await.unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)));
}

#[tokio::test]
async fn test_drop_if_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.create_table("users", &users_fixture()).await.unwrap();
    db.execute_batch("CREATE VIEW v_users AS SELECT * FROM users")
        .await
        .unwrap();

    db.drop_if_exists("v_users").await.unwrap();
    db.drop_if_exists("users").await.unwrap();
    db.drop_if_exists("never_created").await.unwrap();

    assert!(db.list_tables().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_tables_sorted() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE zeta (id INT); CREATE TABLE alpha (id INT);")
        .await
        .unwrap();
    assert_eq!(db.list_tables().await.unwrap(), vec!["alpha", "zeta"]);
}

#[test]
fn test_split_qualified_name() {
    assert_eq!(split_qualified_name("users"), ("main", "users"));
    assert_eq!(split_qualified_name("raw.users"), ("raw", "users"));
}

#[test]
fn test_quote_qualified() {
    assert_eq!(quote_qualified("raw.users"), r#""raw"."users""#);
    assert_eq!(quote_qualified(r#"we"ird"#), r#""we""ird""#);
}
