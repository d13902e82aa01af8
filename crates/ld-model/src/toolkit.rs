//! Lua surface of the query toolkit
//!
//! Models receive a connection userdata and the `ldbt` toolkit table. Every
//! toolkit value is an immutable userdata wrapping part of the expression
//! tree; methods return new values and never mutate their receiver.

use crate::compile::SqlCompiler;
use crate::expr::{AggFunc, BinaryOp, NamedExpr, Relation, Scalar, SortKey, UnaryOp};
use crate::lazy::QueryExpr;
use ld_core::{Backend, ConnectionParams, Value as Cell};
use ld_db::Database;
use mlua::{LightUserData, Lua, MetaMethod, Table, UserData, UserDataMethods, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The `NULL` sentinel usable inside Lua tables, where `nil` would vanish
pub fn null_value() -> Value {
    Value::LightUserData(LightUserData(std::ptr::null_mut()))
}

/// `nil` or the `NULL` sentinel
pub fn is_null(value: &Value) -> bool {
    match value {
        Value::Nil => true,
        Value::LightUserData(ud) => ud.0.is_null(),
        _ => false,
    }
}

/// Convert a Lua scalar into a table cell
pub fn cell_from_lua(value: &Value) -> mlua::Result<Cell> {
    match value {
        v if is_null(v) => Ok(Cell::Null),
        Value::Boolean(b) => Ok(Cell::Bool(*b)),
        Value::Integer(i) => Ok(Cell::Int(*i)),
        Value::Number(n) => Ok(Cell::Float(*n)),
        Value::String(s) => Ok(Cell::Text(s.to_str()?.to_string())),
        other => Err(mlua::Error::RuntimeError(format!(
            "cannot use a {} as a value",
            other.type_name()
        ))),
    }
}

/// Connection handle passed to `run(con, ldbt)`
#[derive(Clone)]
pub struct LuaConnection {
    db: Arc<dyn Database>,
}

impl LuaConnection {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

impl UserData for LuaConnection {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("table", |_, this, name: String| {
            Ok(LuaRelation::bound(Relation::table(name), &this.db))
        });
        methods.add_method("sql", |_, this, query: String| {
            Ok(LuaRelation::bound(Relation::Sql(query), &this.db))
        });
        methods.add_method("backend", |_, this, ()| Ok(this.db.backend().as_str()));
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("Connection<{}>", this.db.db_type()))
        });
    }
}

/// Table expression, optionally bound to a connection
#[derive(Clone)]
pub struct LuaRelation {
    relation: Relation,
    db: Option<Arc<dyn Database>>,
}

impl LuaRelation {
    pub fn unbound(relation: Relation) -> Self {
        Self { relation, db: None }
    }

    pub fn bound(relation: Relation, db: &Arc<dyn Database>) -> Self {
        Self {
            relation,
            db: Some(Arc::clone(db)),
        }
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    /// Bind to `fallback` unless the expression already has a connection
    pub fn into_query(self, fallback: &Arc<dyn Database>) -> QueryExpr {
        let db = self.db.unwrap_or_else(|| Arc::clone(fallback));
        QueryExpr::new(self.relation, db)
    }

    fn derive(&self, relation: Relation) -> Self {
        Self {
            relation,
            db: self.db.clone(),
        }
    }

    fn backend(&self) -> Backend {
        self.db
            .as_ref()
            .map(|db| db.backend())
            .unwrap_or(Backend::DuckDb)
    }

    fn compile(&self) -> mlua::Result<String> {
        SqlCompiler::new(self.backend())
            .compile(&self.relation)
            .map_err(mlua::Error::external)
    }
}

impl UserData for LuaRelation {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("col", |_, _, name: String| Ok(LuaColumn::column(name)));

        methods.add_method("filter", |_, this, spec: Value| {
            let predicates = predicates(this, spec)?;
            if predicates.is_empty() {
                return Err(mlua::Error::RuntimeError(
                    "filter requires at least one predicate".to_string(),
                ));
            }
            Ok(this.derive(this.relation.clone().filter(predicates)))
        });

        methods.add_method("select", |_, this, spec: Value| {
            let columns = named_exprs(this, spec)?;
            Ok(this.derive(this.relation.clone().project(columns)))
        });

        methods.add_method("mutate", |_, this, spec: Value| {
            let columns = named_exprs(this, spec)?;
            Ok(this.derive(this.relation.clone().mutate(columns)))
        });

        methods.add_method("group_by", |_, this, spec: Value| {
            let keys = named_exprs(this, spec)?;
            Ok(LuaGrouped {
                base: this.clone(),
                keys,
            })
        });

        methods.add_method("aggregate", |_, this, spec: Value| {
            let metrics = named_exprs(this, spec)?;
            Ok(this.derive(this.relation.clone().aggregate(Vec::new(), metrics)))
        });

        methods.add_method("order_by", |_, this, spec: Value| {
            let keys = sort_keys(this, spec)?;
            Ok(this.derive(this.relation.clone().order_by(keys)))
        });

        methods.add_method("limit", |_, this, (n, offset): (i64, Option<i64>)| {
            let offset = offset.unwrap_or(0);
            if n < 0 || offset < 0 {
                return Err(mlua::Error::RuntimeError(
                    "limit and offset must not be negative".to_string(),
                ));
            }
            Ok(this.derive(this.relation.clone().limit(n as u64, offset as u64)))
        });

        methods.add_method("distinct", |_, this, ()| {
            Ok(this.derive(this.relation.clone().distinct()))
        });

        methods.add_method("compile", |_, this, ()| this.compile());

        methods.add_meta_method(MetaMethod::Index, |_, _, name: String| {
            Ok(LuaColumn::column(name))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| this.compile());
    }
}

/// Result of `t:group_by(keys)`; only `aggregate` finishes it
#[derive(Clone)]
pub struct LuaGrouped {
    base: LuaRelation,
    keys: Vec<NamedExpr>,
}

impl UserData for LuaGrouped {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("aggregate", |_, this, spec: Value| {
            let metrics = named_exprs(&this.base, spec)?;
            let relation = this
                .base
                .relation
                .clone()
                .aggregate(this.keys.clone(), metrics);
            Ok(this.base.derive(relation))
        });

        methods.add_meta_method(MetaMethod::Index, |_, _, name: String| {
            Ok(LuaColumn::column(name))
        });
    }
}

/// Column-level expression, with an optional output name
#[derive(Clone)]
pub struct LuaColumn {
    expr: Scalar,
    alias: Option<String>,
}

impl LuaColumn {
    pub fn new(expr: Scalar) -> Self {
        Self { expr, alias: None }
    }

    pub fn column(name: impl Into<String>) -> Self {
        Self::new(Scalar::column(name))
    }

    fn output_name(&self) -> Option<String> {
        self.alias.clone().or_else(|| self.expr.default_name())
    }

    fn unary(&self, op: UnaryOp) -> Self {
        Self::new(Scalar::unary(op, self.expr.clone()))
    }
}

impl UserData for LuaColumn {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        let comparisons = [
            ("eq", BinaryOp::Eq),
            ("ne", BinaryOp::Ne),
            ("lt", BinaryOp::Lt),
            ("le", BinaryOp::Le),
            ("gt", BinaryOp::Gt),
            ("ge", BinaryOp::Ge),
            ("and_", BinaryOp::And),
            ("or_", BinaryOp::Or),
        ];
        for (name, op) in comparisons {
            methods.add_method(name, move |_, this, other: Value| {
                Ok(LuaColumn::new(Scalar::binary(
                    op,
                    this.expr.clone(),
                    to_scalar(&other)?,
                )))
            });
        }

        let aggregates = [
            ("count", AggFunc::Count),
            ("count_distinct", AggFunc::CountDistinct),
            ("nunique", AggFunc::CountDistinct),
            ("sum", AggFunc::Sum),
            ("mean", AggFunc::Mean),
            ("min", AggFunc::Min),
            ("max", AggFunc::Max),
        ];
        for (name, func) in aggregates {
            methods.add_method(name, move |_, this, ()| {
                Ok(LuaColumn::new(Scalar::aggregate(
                    func,
                    Some(this.expr.clone()),
                )))
            });
        }

        methods.add_method("not_", |_, this, ()| Ok(this.unary(UnaryOp::Not)));
        methods.add_method("is_null", |_, this, ()| Ok(this.unary(UnaryOp::IsNull)));
        methods.add_method("not_null", |_, this, ()| Ok(this.unary(UnaryOp::NotNull)));

        methods.add_method("isin", |_, this, values: Table| {
            let list = values
                .sequence_values::<Value>()
                .map(|v| to_scalar(&v?))
                .collect::<mlua::Result<Vec<_>>>()?;
            Ok(LuaColumn::new(Scalar::InList {
                expr: Box::new(this.expr.clone()),
                list,
            }))
        });

        methods.add_method("cast", |_, this, to: String| {
            Ok(LuaColumn::new(Scalar::Cast {
                expr: Box::new(this.expr.clone()),
                to,
            }))
        });

        methods.add_method("name", |_, this, alias: String| {
            Ok(LuaColumn {
                expr: this.expr.clone(),
                alias: Some(alias),
            })
        });

        methods.add_method("desc", |_, this, ()| Ok(LuaSortKey::new(this.expr.clone(), true)));
        methods.add_method("asc", |_, this, ()| Ok(LuaSortKey::new(this.expr.clone(), false)));

        let arithmetic = [
            (MetaMethod::Add, BinaryOp::Add),
            (MetaMethod::Sub, BinaryOp::Sub),
            (MetaMethod::Mul, BinaryOp::Mul),
            (MetaMethod::Div, BinaryOp::Div),
        ];
        for (meta, op) in arithmetic {
            // Either operand may be the column, so take both as plain values
            methods.add_meta_function(meta, move |_, (left, right): (Value, Value)| {
                Ok(LuaColumn::new(Scalar::binary(
                    op,
                    to_scalar(&left)?,
                    to_scalar(&right)?,
                )))
            });
        }

        methods.add_meta_method(MetaMethod::Unm, |_, this, ()| Ok(this.unary(UnaryOp::Neg)));

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{:?}", this.expr))
        });
    }
}

/// Ordering key produced by `:desc()`, `:asc()`, `ldbt.desc` or `ldbt.asc`
#[derive(Clone)]
pub struct LuaSortKey {
    key: SortKey,
}

impl LuaSortKey {
    fn new(expr: Scalar, descending: bool) -> Self {
        Self {
            key: SortKey { expr, descending },
        }
    }
}

impl UserData for LuaSortKey {}

fn as_column(value: &Value) -> Option<LuaColumn> {
    match value {
        Value::UserData(ud) => ud.borrow::<LuaColumn>().ok().map(|c| LuaColumn::clone(&c)),
        _ => None,
    }
}

fn as_sort_key(value: &Value) -> Option<SortKey> {
    match value {
        Value::UserData(ud) => ud.borrow::<LuaSortKey>().ok().map(|k| k.key.clone()),
        _ => None,
    }
}

/// Operand of an expression: column expressions as-is, anything else a literal
fn to_scalar(value: &Value) -> mlua::Result<Scalar> {
    if let Some(column) = as_column(value) {
        return Ok(column.expr);
    }
    if let Value::UserData(_) = value {
        return Err(mlua::Error::RuntimeError(
            "expected a column expression or a literal".to_string(),
        ));
    }
    cell_from_lua(value).map(Scalar::Literal)
}

/// Key of a selection or ordering: strings name columns
fn to_column_ref(value: &Value) -> mlua::Result<Option<LuaColumn>> {
    match value {
        Value::String(s) => Ok(Some(LuaColumn::column(s.to_str()?.to_string()))),
        other => Ok(as_column(other)),
    }
}

/// Parse a named-expression list: array entries in order, then keyed
/// entries sorted by name.
fn named_exprs(relation: &LuaRelation, spec: Value) -> mlua::Result<Vec<NamedExpr>> {
    let table = match spec {
        Value::Table(table) => table,
        single => return Ok(vec![named_item(relation, single, None, 1)?]),
    };

    let len = table.raw_len();
    let mut out = Vec::new();
    for position in 1..=len {
        let item: Value = table.raw_get(position)?;
        out.push(named_item(relation, item, None, position)?);
    }

    let mut keyed = BTreeMap::new();
    for pair in table.pairs::<Value, Value>() {
        let (key, value) = pair?;
        match key {
            Value::String(name) => {
                keyed.insert(name.to_str()?.to_string(), value);
            }
            Value::Integer(i) if i >= 1 && (i as usize) <= len => {}
            other => {
                return Err(mlua::Error::RuntimeError(format!(
                    "unexpected key {:?} in expression list",
                    other
                )))
            }
        }
    }
    for (name, value) in keyed {
        out.push(named_item(relation, value, Some(name), 0)?);
    }

    Ok(out)
}

fn named_item(
    relation: &LuaRelation,
    item: Value,
    name: Option<String>,
    position: usize,
) -> mlua::Result<NamedExpr> {
    let item = match item {
        Value::Function(f) => f.call::<Value>(relation.clone())?,
        other => other,
    };

    if let Some(column) = to_column_ref(&item)? {
        let name = match name.or_else(|| column.output_name()) {
            Some(name) => name,
            None => {
                return Err(mlua::Error::RuntimeError(format!(
                    "expression at position {} needs a name; use :name(...) or a keyed entry",
                    position
                )))
            }
        };
        return Ok(NamedExpr::new(name, column.expr));
    }

    match name {
        Some(name) => Ok(NamedExpr::new(name, to_scalar(&item)?)),
        None => Err(mlua::Error::RuntimeError(format!(
            "literal at position {} needs a name",
            position
        ))),
    }
}

/// Parse filter predicates: a column expression, a function of the table,
/// or a list of either
fn predicates(relation: &LuaRelation, spec: Value) -> mlua::Result<Vec<Scalar>> {
    match spec {
        Value::Function(f) => predicates(relation, f.call::<Value>(relation.clone())?),
        Value::Table(table) => {
            let mut out = Vec::new();
            for item in table.sequence_values::<Value>() {
                out.extend(predicates(relation, item?)?);
            }
            Ok(out)
        }
        Value::Boolean(b) => Ok(vec![Scalar::Literal(Cell::Bool(b))]),
        other => match as_column(&other) {
            Some(column) => Ok(vec![column.expr]),
            None => Err(mlua::Error::RuntimeError(format!(
                "filter expects a boolean expression, found {}",
                other.type_name()
            ))),
        },
    }
}

/// Parse ordering keys: column names, column expressions, sort keys, or a
/// list of them
fn sort_keys(relation: &LuaRelation, spec: Value) -> mlua::Result<Vec<SortKey>> {
    match spec {
        Value::Function(f) => sort_keys(relation, f.call::<Value>(relation.clone())?),
        Value::Table(table) => {
            let mut out = Vec::new();
            for item in table.sequence_values::<Value>() {
                out.extend(sort_keys(relation, item?)?);
            }
            Ok(out)
        }
        other => Ok(vec![sort_key(&other, false)?.key]),
    }
}

fn sort_key(value: &Value, descending: bool) -> mlua::Result<LuaSortKey> {
    if let Some(mut key) = as_sort_key(value) {
        if descending {
            key.descending = true;
        }
        return Ok(LuaSortKey { key });
    }
    match to_column_ref(value)? {
        Some(column) => Ok(LuaSortKey::new(column.expr, descending)),
        None => Err(mlua::Error::RuntimeError(format!(
            "cannot order by a {}",
            value.type_name()
        ))),
    }
}

fn connection_params(params: Option<Table>) -> mlua::Result<ConnectionParams> {
    let mut out = ConnectionParams::new();
    let Some(params) = params else {
        return Ok(out);
    };
    for pair in params.pairs::<String, Value>() {
        let (key, value) = pair?;
        let value = match cell_from_lua(&value)? {
            Cell::Null => None,
            Cell::Text(s) => Some(s),
            other => Some(other.to_string()),
        };
        out.insert(key, value);
    }
    Ok(out)
}

/// Build the `ldbt` table handed to every entry point
pub fn create_toolkit(lua: &Lua) -> mlua::Result<Table> {
    let ldbt = lua.create_table()?;

    ldbt.set(
        "table",
        lua.create_function(|_, name: String| Ok(LuaRelation::unbound(Relation::table(name))))?,
    )?;
    ldbt.set(
        "col",
        lua.create_function(|_, name: String| Ok(LuaColumn::column(name)))?,
    )?;
    ldbt.set(
        "literal",
        lua.create_function(|_, value: Value| {
            Ok(LuaColumn::new(Scalar::Literal(cell_from_lua(&value)?)))
        })?,
    )?;
    ldbt.set(
        "desc",
        lua.create_function(|_, value: Value| sort_key(&value, true))?,
    )?;
    ldbt.set(
        "asc",
        lua.create_function(|_, value: Value| sort_key(&value, false))?,
    )?;
    ldbt.set(
        "count",
        lua.create_function(|_, ()| Ok(LuaColumn::new(Scalar::aggregate(AggFunc::Count, None))))?,
    )?;
    ldbt.set(
        "connect",
        lua.create_function(|_, (tag, params): (String, Option<Table>)| {
            let db = ld_db::connect_tagged(&tag, connection_params(params)?)
                .map_err(mlua::Error::external)?;
            Ok(LuaConnection::new(db))
        })?,
    )?;
    ldbt.set(
        "backends",
        lua.create_sequence_from(Backend::ALL.iter().map(|b| b.as_str()))?,
    )?;
    ldbt.set("NULL", null_value())?;

    Ok(ldbt)
}

#[cfg(test)]
#[path = "toolkit_test.rs"]
mod tests;
