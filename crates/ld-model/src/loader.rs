//! Model and test-file loading
//!
//! Every file is executed in its own fresh Lua state, so globals defined by
//! one model (including `run`) never leak into another.

use crate::error::{ModelError, ModelResult};
use crate::lazy::QueryExpr;
use crate::toolkit::{
    cell_from_lua, create_toolkit, null_value, LuaColumn, LuaConnection, LuaGrouped, LuaRelation,
};
use ld_core::{ConcreteTable, TestCase};
use ld_db::Database;
use mlua::{Function, Lua, Table, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Global function every model defines
pub const ENTRY_POINT: &str = "run";

/// Global table every test file defines
pub const TEST_CASES_GLOBAL: &str = "TEST_CASES";

/// A loaded model, ready to be invoked
pub struct EntryPoint {
    path: PathBuf,
    run: Function,
    toolkit: Table,
    // Keeps the state alive for as long as the handles above
    _lua: Lua,
}

impl EntryPoint {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Call `run(con, ldbt)` and bind the returned expression.
    ///
    /// Expressions built without a connection are bound to `db`.
    pub fn invoke(&self, db: &Arc<dyn Database>) -> ModelResult<QueryExpr> {
        let con = LuaConnection::new(Arc::clone(db));
        let value: Value = self
            .run
            .call((con, self.toolkit.clone()))
            .map_err(|e| ModelError::Runtime {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        let relation = match &value {
            Value::UserData(ud) => ud
                .borrow::<LuaRelation>()
                .ok()
                .map(|r| LuaRelation::clone(&r)),
            _ => None,
        };

        match relation {
            Some(relation) => Ok(relation.into_query(db)),
            None => Err(ModelError::NotAnExpression {
                path: self.path.display().to_string(),
                found: describe(&value),
            }),
        }
    }
}

fn describe(value: &Value) -> String {
    if let Value::UserData(ud) = value {
        if ud.is::<LuaGrouped>() {
            return "a grouped table (call :aggregate on it)".to_string();
        }
        if ud.is::<LuaColumn>() {
            return "a column expression".to_string();
        }
    }
    value.type_name().to_string()
}

/// Execute a file's top-level chunk in a brand-new Lua state
fn load_state(path: &Path) -> ModelResult<Lua> {
    let load_error = |message: String| ModelError::Load {
        path: path.display().to_string(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;

    let lua = Lua::new();
    prepare_globals(&lua, path).map_err(|e| load_error(e.to_string()))?;
    lua.load(content.as_str())
        .set_name(format!("@{}", path.display()))
        .exec()
        .map_err(|e| load_error(e.to_string()))?;

    Ok(lua)
}

/// Install `NULL` and let `require` resolve modules next to the file
fn prepare_globals(lua: &Lua, path: &Path) -> mlua::Result<()> {
    let globals = lua.globals();
    globals.set("NULL", null_value())?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        let package: Table = globals.get("package")?;
        let search: String = package.get("path")?;
        let dir = dir.display();
        package.set("path", format!("{dir}/?.lua;{dir}/?/init.lua;{search}"))?;
    }
    Ok(())
}

/// Load a model file and resolve its `run` function
pub fn load_entry_point(path: &Path) -> ModelResult<EntryPoint> {
    let lua = load_state(path)?;

    let run = match lua.globals().get::<Value>(ENTRY_POINT) {
        Ok(Value::Function(f)) => f,
        _ => {
            return Err(ModelError::MissingEntryPoint {
                path: path.display().to_string(),
            })
        }
    };

    let toolkit = create_toolkit(&lua).map_err(|e| ModelError::Load {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    log::debug!("Loaded entry point from {}", path.display());
    Ok(EntryPoint {
        path: path.to_path_buf(),
        run,
        toolkit,
        _lua: lua,
    })
}

/// Load the `TEST_CASES` declared by a test file, in declaration order
pub fn load_test_cases(path: &Path) -> ModelResult<Vec<TestCase>> {
    let lua = load_state(path)?;

    let cases = match lua.globals().get::<Value>(TEST_CASES_GLOBAL) {
        Ok(Value::Table(t)) => t,
        _ => {
            return Err(ModelError::MissingTestCases {
                path: path.display().to_string(),
            })
        }
    };

    let mut out = Vec::new();
    for (i, case) in cases.sequence_values::<Value>().enumerate() {
        let index = i + 1;
        let invalid = |message: String| ModelError::InvalidTestCase {
            path: path.display().to_string(),
            index,
            message,
        };
        let case = case.map_err(|e| invalid(e.to_string()))?;
        out.push(parse_test_case(case).map_err(invalid)?);
    }

    log::debug!("Loaded {} test case(s) from {}", out.len(), path.display());
    Ok(out)
}

fn parse_test_case(value: Value) -> Result<TestCase, String> {
    let found = value.type_name();
    let Value::Table(case) = value else {
        return Err(format!("expected a table, found {}", found));
    };

    let name = match field(&case, "name")? {
        Value::String(s) => s.to_str().map_err(|e| e.to_string())?.to_string(),
        _ => return Err("'name' must be a string".to_string()),
    };
    if name.is_empty() {
        return Err("'name' must not be empty".to_string());
    }

    let description = match field(&case, "description")? {
        Value::Nil => None,
        Value::String(s) => Some(s.to_str().map_err(|e| e.to_string())?.to_string()),
        _ => return Err(format!("{}: 'description' must be a string", name)),
    };

    let input_data = match field(&case, "input_data")? {
        Value::Nil => Vec::new(),
        Value::Table(tables) => {
            let mut inputs = Vec::new();
            for pair in tables.pairs::<Value, Value>() {
                let (key, spec) = pair.map_err(|e| e.to_string())?;
                let Value::String(table_name) = key else {
                    return Err(format!("{}: input_data keys must be table names", name));
                };
                let table_name = table_name.to_str().map_err(|e| e.to_string())?.to_string();
                let table = parse_table(spec)
                    .map_err(|e| format!("{}: input_data.{}: {}", name, table_name, e))?;
                inputs.push((table_name, table));
            }
            // Lua tables carry no key order; sort for stable fixture creation
            inputs.sort_by(|a, b| a.0.cmp(&b.0));
            inputs
        }
        _ => return Err(format!("{}: 'input_data' must be a table", name)),
    };

    let expected_output = match field(&case, "expected_output")? {
        Value::Nil => return Err(format!("{}: 'expected_output' is required", name)),
        spec => parse_table(spec).map_err(|e| format!("{}: expected_output: {}", name, e))?,
    };

    Ok(TestCase {
        name,
        description,
        input_data,
        expected_output,
    })
}

fn field(table: &Table, key: &str) -> Result<Value, String> {
    table.get::<Value>(key).map_err(|e| e.to_string())
}

/// Read `{columns = {...}, rows = {{...}, ...}}` into a concrete table
fn parse_table(value: Value) -> Result<ConcreteTable, String> {
    let found = value.type_name();
    let Value::Table(spec) = value else {
        return Err(format!("expected a table, found {}", found));
    };

    let columns = match field(&spec, "columns")? {
        Value::Table(cols) => cols
            .sequence_values::<String>()
            .collect::<mlua::Result<Vec<_>>>()
            .map_err(|e| format!("'columns' must be a list of names: {}", e))?,
        _ => return Err("'columns' must be a list of names".to_string()),
    };

    let mut rows = Vec::new();
    match field(&spec, "rows")? {
        Value::Nil => {}
        Value::Table(row_list) => {
            for (i, row) in row_list.sequence_values::<Value>().enumerate() {
                let row = row.map_err(|e| e.to_string())?;
                let row = parse_row(row, columns.len())
                    .map_err(|e| format!("row {}: {}", i + 1, e))?;
                rows.push(row);
            }
        }
        _ => return Err("'rows' must be a list of rows".to_string()),
    }

    ConcreteTable::new(columns, rows).map_err(|e| e.to_string())
}

fn parse_row(value: Value, width: usize) -> Result<Vec<ld_core::Value>, String> {
    let found = value.type_name();
    let Value::Table(row) = value else {
        return Err(format!("expected a list of values, found {}", found));
    };

    let len = row.raw_len();
    if len > width {
        return Err(format!("has {} values but only {} columns", len, width));
    }

    // nil holes are read as NULL
    (1..=width)
        .map(|pos| {
            let cell: Value = row.raw_get(pos).map_err(|e| e.to_string())?;
            cell_from_lua(&cell).map_err(|e| e.to_string())
        })
        .collect()
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod tests;
