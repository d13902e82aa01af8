//! Relation-to-SQL compiler
//!
//! Operations are folded into a single `SELECT` while SQL evaluation order
//! allows it; otherwise the query built so far becomes a subquery aliased
//! `t0`, `t1`, ... (innermost first) and folding continues on top of it.

use crate::error::{ModelError, ModelResult};
use crate::expr::{AggFunc, NamedExpr, Relation, Scalar, SortKey, UnaryOp};
use ld_core::{Backend, Value};
use ld_sql::{dialect_for, SqlDialect, SqlParser};

/// Compiles relations into SQL text for one backend
pub struct SqlCompiler {
    backend: Backend,
    dialect: Box<dyn SqlDialect>,
}

#[derive(Debug, Clone)]
enum Source {
    Table(String),
    Subquery(Box<Select>, String),
    RawSql(String, String),
}

#[derive(Debug, Clone)]
enum Item {
    Star,
    Expr(NamedExpr),
}

#[derive(Debug, Clone)]
struct Select {
    source: Source,
    items: Vec<Item>,
    predicates: Vec<Scalar>,
    group_by: Option<Vec<Scalar>>,
    order_by: Vec<SortKey>,
    limit: Option<(u64, u64)>,
    distinct: bool,
}

impl Select {
    fn from_source(source: Source) -> Self {
        Self {
            source,
            items: vec![Item::Star],
            predicates: Vec::new(),
            group_by: None,
            order_by: Vec::new(),
            limit: None,
            distinct: false,
        }
    }

    /// Output columns are input columns, untouched
    fn is_passthrough(&self) -> bool {
        self.items.iter().all(|item| match item {
            Item::Star => true,
            Item::Expr(named) => named.is_passthrough(),
        })
    }

    /// Whether a row-level operation can still be applied to this SELECT
    fn accepts_row_op(&self) -> bool {
        self.is_passthrough() && self.group_by.is_none() && self.limit.is_none() && !self.distinct
    }

    fn wrap(self, alias: String) -> Self {
        Select::from_source(Source::Subquery(Box::new(self), alias))
    }
}

/// Hands out subquery aliases in creation order
#[derive(Default)]
struct AliasGen(usize);

impl AliasGen {
    fn next(&mut self) -> String {
        let alias = format!("t{}", self.0);
        self.0 += 1;
        alias
    }
}

impl SqlCompiler {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            dialect: dialect_for(backend),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Compile a relation and check that the result parses in the dialect
    pub fn compile(&self, relation: &Relation) -> ModelResult<String> {
        let mut aliases = AliasGen::default();
        let select = self.build(relation, &mut aliases)?;
        let sql = self.render_select(&select)?;

        SqlParser::for_backend(self.backend)
            .validate_query(&sql)
            .map_err(|e| ModelError::Compilation {
                message: format!("generated SQL does not parse: {}\n{}", e, sql),
            })?;

        Ok(sql)
    }

    fn build(&self, relation: &Relation, aliases: &mut AliasGen) -> ModelResult<Select> {
        let select = match relation {
            Relation::Table(name) => {
                if name.trim().is_empty() {
                    return Err(compilation("table name must not be empty"));
                }
                Select::from_source(Source::Table(name.clone()))
            }
            Relation::Sql(query) => {
                let query = query.trim().trim_end_matches(';').trim_end();
                if query.is_empty() {
                    return Err(compilation("SQL subquery must not be empty"));
                }
                Select::from_source(Source::RawSql(query.to_string(), aliases.next()))
            }
            Relation::Filter { input, predicates } => {
                let mut select = self.build(input, aliases)?;
                if !select.accepts_row_op() {
                    select = select.wrap(aliases.next());
                }
                select.predicates.extend(predicates.iter().cloned());
                select
            }
            Relation::Project { input, columns } => {
                if columns.is_empty() {
                    return Err(compilation("select requires at least one column"));
                }
                let mut select = self.build(input, aliases)?;
                if !select.accepts_row_op() {
                    select = select.wrap(aliases.next());
                }
                select.items = columns.iter().cloned().map(Item::Expr).collect();
                select
            }
            Relation::Mutate { input, columns } => {
                let mut select = self.build(input, aliases)?;
                if !select.accepts_row_op() {
                    select = select.wrap(aliases.next());
                }
                select
                    .items
                    .extend(columns.iter().cloned().map(Item::Expr));
                select
            }
            Relation::Aggregate {
                input,
                keys,
                metrics,
            } => {
                if keys.is_empty() && metrics.is_empty() {
                    return Err(compilation("aggregate requires keys or metrics"));
                }
                let mut select = self.build(input, aliases)?;
                if !select.accepts_row_op() || !select.order_by.is_empty() {
                    select = select.wrap(aliases.next());
                }
                select.items = keys
                    .iter()
                    .chain(metrics.iter())
                    .cloned()
                    .map(Item::Expr)
                    .collect();
                select.group_by = Some(keys.iter().map(|k| k.expr.clone()).collect());
                select
            }
            Relation::OrderBy { input, keys } => {
                let mut select = self.build(input, aliases)?;
                if select.limit.is_some() {
                    select = select.wrap(aliases.next());
                }
                // Later keys sort first; earlier ordering breaks ties
                let previous = std::mem::take(&mut select.order_by);
                select.order_by = keys.iter().cloned().chain(previous).collect();
                select
            }
            Relation::Limit { input, n, offset } => {
                let mut select = self.build(input, aliases)?;
                if select.limit.is_some() {
                    select = select.wrap(aliases.next());
                }
                select.limit = Some((*n, *offset));
                select
            }
            Relation::Distinct { input } => {
                let mut select = self.build(input, aliases)?;
                if select.limit.is_some() {
                    select = select.wrap(aliases.next());
                }
                select.distinct = true;
                select
            }
        };
        Ok(select)
    }

    fn render_select(&self, select: &Select) -> ModelResult<String> {
        let items = select
            .items
            .iter()
            .map(|item| match item {
                Item::Star => Ok("*".to_string()),
                Item::Expr(named) => self.render_named(named),
            })
            .collect::<ModelResult<Vec<_>>>()?;

        let mut sql = format!(
            "SELECT {}{}\nFROM {}",
            if select.distinct { "DISTINCT " } else { "" },
            items.join(", "),
            self.render_source(&select.source)?
        );

        if !select.predicates.is_empty() {
            let predicates = select
                .predicates
                .iter()
                .map(|p| {
                    if select.predicates.len() > 1 {
                        self.render_operand(p)
                    } else {
                        self.render_scalar(p)
                    }
                })
                .collect::<ModelResult<Vec<_>>>()?;
            sql.push_str(&format!("\nWHERE {}", predicates.join(" AND ")));
        }

        if let Some(keys) = select.group_by.as_ref().filter(|k| !k.is_empty()) {
            let keys = keys
                .iter()
                .map(|k| self.render_scalar(k))
                .collect::<ModelResult<Vec<_>>>()?;
            sql.push_str(&format!("\nGROUP BY {}", keys.join(", ")));
        }

        if !select.order_by.is_empty() {
            let keys = select
                .order_by
                .iter()
                .map(|k| {
                    Ok(format!(
                        "{} {}",
                        self.render_scalar(&k.expr)?,
                        if k.descending { "DESC" } else { "ASC" }
                    ))
                })
                .collect::<ModelResult<Vec<_>>>()?;
            sql.push_str(&format!("\nORDER BY {}", keys.join(", ")));
        }

        if let Some((n, offset)) = select.limit {
            sql.push_str(&format!("\nLIMIT {}", n));
            if offset > 0 {
                sql.push_str(&format!("\nOFFSET {}", offset));
            }
        }

        Ok(sql)
    }

    fn render_source(&self, source: &Source) -> ModelResult<String> {
        match source {
            Source::Table(name) => Ok(self.quote_qualified(name)),
            Source::Subquery(inner, alias) => Ok(format!(
                "(\n{}\n) AS {}",
                indent(&self.render_select(inner)?),
                alias
            )),
            Source::RawSql(query, alias) => Ok(format!("(\n{}\n) AS {}", indent(query), alias)),
        }
    }

    fn render_named(&self, named: &NamedExpr) -> ModelResult<String> {
        if named.is_passthrough() {
            return Ok(self.dialect.quote_ident(&named.name));
        }
        Ok(format!(
            "{} AS {}",
            self.render_scalar(&named.expr)?,
            self.dialect.quote_ident(&named.name)
        ))
    }

    /// Render an operand of a larger expression, parenthesizing compound ones
    fn render_operand(&self, expr: &Scalar) -> ModelResult<String> {
        let sql = self.render_scalar(expr)?;
        match expr {
            Scalar::Binary { .. } | Scalar::InList { .. } => Ok(format!("({})", sql)),
            Scalar::Unary { op, .. } if *op != UnaryOp::Neg => Ok(format!("({})", sql)),
            _ => Ok(sql),
        }
    }

    fn render_scalar(&self, expr: &Scalar) -> ModelResult<String> {
        match expr {
            Scalar::Column(name) => Ok(self.dialect.quote_ident(name)),
            Scalar::Literal(value) => Ok(self.render_literal(value)),
            Scalar::Binary { op, left, right } => Ok(format!(
                "{} {} {}",
                self.render_operand(left)?,
                op.sql(),
                self.render_operand(right)?
            )),
            Scalar::Unary { op, expr } => match op {
                UnaryOp::Neg => match expr.as_ref() {
                    Scalar::Column(_) => Ok(format!("-{}", self.render_scalar(expr)?)),
                    _ => Ok(format!("-({})", self.render_scalar(expr)?)),
                },
                UnaryOp::Not => Ok(format!("NOT {}", self.render_operand(expr)?)),
                UnaryOp::IsNull => Ok(format!("{} IS NULL", self.render_operand(expr)?)),
                UnaryOp::NotNull => Ok(format!("{} IS NOT NULL", self.render_operand(expr)?)),
            },
            Scalar::Aggregate { func, arg } => {
                let arg = match arg {
                    Some(arg) => self.render_scalar(arg)?,
                    None if *func == AggFunc::Count => "*".to_string(),
                    None => return Err(compilation("only count() may omit its argument")),
                };
                Ok(match func {
                    AggFunc::Count => format!("COUNT({})", arg),
                    AggFunc::CountDistinct => format!("COUNT(DISTINCT {})", arg),
                    AggFunc::Sum => format!("SUM({})", arg),
                    AggFunc::Mean => format!("AVG({})", arg),
                    AggFunc::Min => format!("MIN({})", arg),
                    AggFunc::Max => format!("MAX({})", arg),
                })
            }
            Scalar::Cast { expr, to } => Ok(format!(
                "CAST({} AS {})",
                self.render_scalar(expr)?,
                self.cast_type(to)?
            )),
            Scalar::InList { expr, list } => {
                if list.is_empty() {
                    return Ok("FALSE".to_string());
                }
                let values = list
                    .iter()
                    .map(|v| self.render_scalar(v))
                    .collect::<ModelResult<Vec<_>>>()?;
                Ok(format!(
                    "{} IN ({})",
                    self.render_operand(expr)?,
                    values.join(", ")
                ))
            }
        }
    }

    fn render_literal(&self, value: &Value) -> String {
        match value {
            Value::Float(f) if !f.is_finite() => {
                format!("CAST('{}' AS {})", f, self.double_type())
            }
            other => other.to_sql_literal(),
        }
    }

    fn double_type(&self) -> &'static str {
        match self.backend {
            Backend::BigQuery => "FLOAT64",
            Backend::Postgres => "DOUBLE PRECISION",
            Backend::DuckDb | Backend::Snowflake => "DOUBLE",
        }
    }

    /// Map a toolkit type name onto the dialect's type
    fn cast_type(&self, to: &str) -> ModelResult<String> {
        let bigquery = self.backend == Backend::BigQuery;
        let mapped = match to.trim().to_ascii_lowercase().as_str() {
            "int" | "int64" | "integer" | "bigint" => {
                if bigquery {
                    "INT64"
                } else {
                    "BIGINT"
                }
            }
            "int32" => {
                if bigquery {
                    "INT64"
                } else {
                    "INTEGER"
                }
            }
            "float" | "float64" | "double" => self.double_type(),
            "string" | "str" | "varchar" | "text" => {
                if bigquery {
                    "STRING"
                } else {
                    "VARCHAR"
                }
            }
            "bool" | "boolean" => {
                if bigquery {
                    "BOOL"
                } else {
                    "BOOLEAN"
                }
            }
            "date" => "DATE",
            "timestamp" => "TIMESTAMP",
            _ => {
                let valid = !to.trim().is_empty()
                    && to
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || " _(),".contains(c));
                if !valid {
                    return Err(compilation(format!("unsupported cast type '{}'", to)));
                }
                return Ok(to.trim().to_ascii_uppercase());
            }
        };
        Ok(mapped.to_string())
    }

    fn quote_qualified(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.dialect.quote_ident(part))
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn indent(sql: &str) -> String {
    sql.lines()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn compilation(message: impl Into<String>) -> ModelError {
    ModelError::Compilation {
        message: message.into(),
    }
}

#[cfg(test)]
#[path = "compile_test.rs"]
mod tests;
