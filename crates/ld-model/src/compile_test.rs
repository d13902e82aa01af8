use super::*;
use crate::expr::BinaryOp;

fn col(name: &str) -> Scalar {
    Scalar::column(name)
}

fn key(name: &str) -> NamedExpr {
    NamedExpr::new(name, col(name))
}

fn asc(name: &str) -> SortKey {
    SortKey {
        expr: col(name),
        descending: false,
    }
}

fn daily_registrations() -> Relation {
    Relation::table("users")
        .aggregate(
            vec![key("registration_date")],
            vec![NamedExpr::new(
                "daily_registrations",
                Scalar::aggregate(AggFunc::Count, Some(col("id"))),
            )],
        )
        .order_by(vec![asc("registration_date")])
}

#[test]
fn test_group_count_order_in_one_select() {
    let sql = SqlCompiler::new(Backend::DuckDb)
        .compile(&daily_registrations())
        .unwrap();
    assert_eq!(
        sql,
        "SELECT \"registration_date\", COUNT(\"id\") AS \"daily_registrations\"\n\
         FROM \"users\"\n\
         GROUP BY \"registration_date\"\n\
         ORDER BY \"registration_date\" ASC"
    );
}

#[test]
fn test_bigquery_uses_backticks() {
    let sql = SqlCompiler::new(Backend::BigQuery)
        .compile(&daily_registrations())
        .unwrap();
    assert!(sql.starts_with("SELECT `registration_date`, COUNT(`id`) AS `daily_registrations`"));
    assert!(sql.contains("FROM `users`"));
    assert!(!sql.contains('"'));
}

#[test]
fn test_compile_is_deterministic() {
    let compiler = SqlCompiler::new(Backend::Postgres);
    let first = compiler.compile(&daily_registrations()).unwrap();
    let second = compiler.compile(&daily_registrations()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_row_operations_merge() {
    let relation = Relation::table("users")
        .filter(vec![Scalar::binary(
            BinaryOp::Gt,
            col("age"),
            Scalar::Literal(Value::Int(18)),
        )])
        .project(vec![key("name")])
        .order_by(vec![asc("name")])
        .limit(10, 0);

    let sql = SqlCompiler::new(Backend::DuckDb).compile(&relation).unwrap();
    assert_eq!(
        sql,
        "SELECT \"name\"\nFROM \"users\"\nWHERE \"age\" > 18\nORDER BY \"name\" ASC\nLIMIT 10"
    );
}

#[test]
fn test_filter_after_aggregate_wraps() {
    let relation = Relation::table("orders")
        .aggregate(
            vec![key("customer_id")],
            vec![NamedExpr::new(
                "total",
                Scalar::aggregate(AggFunc::Sum, Some(col("amount"))),
            )],
        )
        .filter(vec![Scalar::binary(
            BinaryOp::Gt,
            col("total"),
            Scalar::Literal(Value::Int(100)),
        )]);

    let sql = SqlCompiler::new(Backend::DuckDb).compile(&relation).unwrap();
    assert_eq!(
        sql,
        "SELECT *\n\
         FROM (\n  \
           SELECT \"customer_id\", SUM(\"amount\") AS \"total\"\n  \
           FROM \"orders\"\n  \
           GROUP BY \"customer_id\"\n\
         ) AS t0\n\
         WHERE \"total\" > 100"
    );
}

#[test]
fn test_dependent_mutates_wrap() {
    let relation = Relation::table("t")
        .mutate(vec![NamedExpr::new(
            "b",
            Scalar::binary(BinaryOp::Mul, col("a"), Scalar::Literal(Value::Int(2))),
        )])
        .mutate(vec![NamedExpr::new(
            "c",
            Scalar::binary(BinaryOp::Add, col("b"), Scalar::Literal(Value::Int(1))),
        )]);

    let sql = SqlCompiler::new(Backend::DuckDb).compile(&relation).unwrap();
    assert_eq!(
        sql,
        "SELECT *, \"b\" + 1 AS \"c\"\n\
         FROM (\n  \
           SELECT *, \"a\" * 2 AS \"b\"\n  \
           FROM \"t\"\n\
         ) AS t0"
    );
}

#[test]
fn test_aliases_count_from_innermost() {
    let relation = Relation::table("t").limit(10, 0).limit(5, 0).limit(1, 0);
    let sql = SqlCompiler::new(Backend::DuckDb).compile(&relation).unwrap();

    let t0 = sql.find(") AS t0").unwrap();
    let t1 = sql.find(") AS t1").unwrap();
    assert!(t0 < t1);
    assert!(sql.ends_with(") AS t1\nLIMIT 1"));
}

#[test]
fn test_raw_sql_subquery() {
    let relation = Relation::Sql("select 1 as x;".to_string()).limit(5, 2);
    let sql = SqlCompiler::new(Backend::DuckDb).compile(&relation).unwrap();
    assert_eq!(
        sql,
        "SELECT *\nFROM (\n  select 1 as x\n) AS t0\nLIMIT 5\nOFFSET 2"
    );
}

#[test]
fn test_invalid_raw_sql_is_compilation_error() {
    let relation = Relation::Sql("SELEC 1".to_string());
    let err = SqlCompiler::new(Backend::DuckDb)
        .compile(&relation)
        .unwrap_err();
    assert!(matches!(err, ModelError::Compilation { .. }));
    assert!(err.to_string().starts_with("[M007]"));
}

#[test]
fn test_later_order_keys_take_precedence() {
    let relation = Relation::table("t")
        .order_by(vec![asc("a")])
        .order_by(vec![SortKey {
            expr: col("b"),
            descending: true,
        }]);
    let sql = SqlCompiler::new(Backend::DuckDb).compile(&relation).unwrap();
    assert!(sql.ends_with("ORDER BY \"b\" DESC, \"a\" ASC"));
}

#[test]
fn test_global_aggregate_has_no_group_by() {
    let relation = Relation::table("t").aggregate(
        vec![],
        vec![NamedExpr::new("n", Scalar::aggregate(AggFunc::Count, None))],
    );
    let sql = SqlCompiler::new(Backend::DuckDb).compile(&relation).unwrap();
    assert_eq!(sql, "SELECT COUNT(*) AS \"n\"\nFROM \"t\"");
}

#[test]
fn test_aggregate_after_order_wraps() {
    let relation = Relation::table("t").order_by(vec![asc("a")]).aggregate(
        vec![key("a")],
        vec![NamedExpr::new(
            "m",
            Scalar::aggregate(AggFunc::Max, Some(col("b"))),
        )],
    );
    let sql = SqlCompiler::new(Backend::DuckDb).compile(&relation).unwrap();
    assert!(sql.starts_with("SELECT \"a\", MAX(\"b\") AS \"m\"\nFROM (\n"));
    assert!(sql.ends_with(") AS t0\nGROUP BY \"a\""));
}

#[test]
fn test_distinct_and_qualified_table() {
    let relation = Relation::table("raw.users")
        .project(vec![key("country")])
        .distinct();
    let sql = SqlCompiler::new(Backend::DuckDb).compile(&relation).unwrap();
    assert_eq!(sql, "SELECT DISTINCT \"country\"\nFROM \"raw\".\"users\"");
}

#[test]
fn test_scalar_rendering() {
    let compiler = SqlCompiler::new(Backend::DuckDb);

    let both = Scalar::binary(
        BinaryOp::And,
        Scalar::unary(UnaryOp::NotNull, col("a")),
        Scalar::InList {
            expr: Box::new(col("b")),
            list: vec![
                Scalar::Literal(Value::Text("x".to_string())),
                Scalar::Literal(Value::Text("it's".to_string())),
            ],
        },
    );
    assert_eq!(
        compiler.render_scalar(&both).unwrap(),
        "(\"a\" IS NOT NULL) AND (\"b\" IN ('x', 'it''s'))"
    );

    let empty_in = Scalar::InList {
        expr: Box::new(col("b")),
        list: vec![],
    };
    assert_eq!(compiler.render_scalar(&empty_in).unwrap(), "FALSE");

    let negated = Scalar::unary(UnaryOp::Neg, col("a"));
    assert_eq!(compiler.render_scalar(&negated).unwrap(), "-\"a\"");

    let distinct = Scalar::aggregate(AggFunc::CountDistinct, Some(col("a")));
    assert_eq!(
        compiler.render_scalar(&distinct).unwrap(),
        "COUNT(DISTINCT \"a\")"
    );

    let mean = Scalar::aggregate(AggFunc::Mean, Some(col("a")));
    assert_eq!(compiler.render_scalar(&mean).unwrap(), "AVG(\"a\")");
}

#[test]
fn test_cast_types_per_dialect() {
    let cast = Scalar::Cast {
        expr: Box::new(col("a")),
        to: "string".to_string(),
    };
    assert_eq!(
        SqlCompiler::new(Backend::DuckDb)
            .render_scalar(&cast)
            .unwrap(),
        "CAST(\"a\" AS VARCHAR)"
    );
    assert_eq!(
        SqlCompiler::new(Backend::BigQuery)
            .render_scalar(&cast)
            .unwrap(),
        "CAST(`a` AS STRING)"
    );

    let custom = Scalar::Cast {
        expr: Box::new(col("a")),
        to: "decimal(10, 2)".to_string(),
    };
    assert_eq!(
        SqlCompiler::new(Backend::DuckDb)
            .render_scalar(&custom)
            .unwrap(),
        "CAST(\"a\" AS DECIMAL(10, 2))"
    );
}

#[test]
fn test_cast_rejects_unsafe_type() {
    let cast = Scalar::Cast {
        expr: Box::new(col("a")),
        to: "int; DROP TABLE users".to_string(),
    };
    let err = SqlCompiler::new(Backend::DuckDb)
        .render_scalar(&cast)
        .unwrap_err();
    assert!(matches!(err, ModelError::Compilation { .. }));
}

#[test]
fn test_empty_select_rejected() {
    let relation = Relation::table("t").project(vec![]);
    assert!(SqlCompiler::new(Backend::DuckDb).compile(&relation).is_err());
}
