//! Batch compilation of models into dbt SQL files

use crate::error::{ModelError, ModelResult};
use crate::lazy::LazyQuery;
use crate::loader::load_entry_point;
use ld_core::project::{discover_models, model_name, output_path_for};
use ld_core::ConnectionConfig;
use ld_db::Database;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One generated SQL file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedModel {
    /// Model source file
    pub source: PathBuf,
    /// Written `.sql` file
    pub output: PathBuf,
}

/// Load, invoke and compile a single model
pub fn compile_model(path: &Path, db: &Arc<dyn Database>) -> ModelResult<String> {
    load_entry_point(path)?.invoke(db)?.compile()
}

/// Compile every model under `model_root` into `output_root`.
///
/// One connection is opened for the whole batch. Models are processed in
/// sorted path order and the first failure aborts the batch; files written
/// before it are left in place.
pub fn materialize_all(
    model_root: &Path,
    output_root: &Path,
    config: &ConnectionConfig,
) -> ModelResult<Vec<MaterializedModel>> {
    let db = ld_db::connect(config)?;
    materialize_with(model_root, output_root, &db)
}

/// Same as [`materialize_all`] with an already open connection
pub fn materialize_with(
    model_root: &Path,
    output_root: &Path,
    db: &Arc<dyn Database>,
) -> ModelResult<Vec<MaterializedModel>> {
    let models = discover_models(model_root)?;
    log::debug!(
        "Materializing {} model(s) from {} for {}",
        models.len(),
        model_root.display(),
        db.db_type()
    );

    let mut generated = Vec::with_capacity(models.len());
    for source in models {
        let name = model_name(model_root, &source);
        let output = materialize_one(model_root, output_root, &source, db)
            .map_err(|e| e.in_model(&name))?;
        log::debug!("Compiled {} -> {}", name, output.display());
        generated.push(MaterializedModel { source, output });
    }

    Ok(generated)
}

fn materialize_one(
    model_root: &Path,
    output_root: &Path,
    source: &Path,
    db: &Arc<dyn Database>,
) -> ModelResult<PathBuf> {
    let sql = compile_model(source, db)?;
    let output = output_path_for(model_root, output_root, source)?;

    let write_error = |e: std::io::Error| ModelError::Write {
        path: output.display().to_string(),
        source: e,
    };
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(&output, format!("{}\n", sql)).map_err(write_error)?;

    Ok(output)
}

#[cfg(test)]
#[path = "materialize_test.rs"]
mod tests;
