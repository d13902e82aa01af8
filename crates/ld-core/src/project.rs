//! Project layout and model discovery
//!
//! A project keeps its Lua models under `ldbt/` and generated SQL under the
//! dbt `models/` directory. A model at `ldbt/foo/bar.lua` compiles to
//! `models/foo/bar.sql` and is tested by `ldbt/foo/bar_test.lua`.

use crate::error::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// Default directory holding model sources
pub const MODEL_DIR: &str = "ldbt";

/// Default directory receiving generated SQL
pub const OUTPUT_DIR: &str = "models";

/// Name of the env file inside the model directory
pub const ENV_FILE: &str = ".env";

/// Extension of model and test source files
pub const MODEL_EXTENSION: &str = "lua";

/// Stem suffix marking a test-definition file
pub const TEST_SUFFIX: &str = "_test";

/// Stem of the package-initializer file, never a model
pub const PACKAGE_INIT_STEM: &str = "init";

/// Resolved directories of an ldbt project
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Project root directory
    pub root: PathBuf,

    /// Directory holding model sources
    pub model_dir: PathBuf,

    /// Directory receiving generated SQL
    pub output_dir: PathBuf,
}

impl ProjectLayout {
    /// Layout with the default directory names under `root`
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            model_dir: root.join(MODEL_DIR),
            output_dir: root.join(OUTPUT_DIR),
        }
    }

    /// Path of the `.env` file holding the connection descriptor
    pub fn env_file(&self) -> PathBuf {
        self.model_dir.join(ENV_FILE)
    }

    /// Path of a model given its name relative to the model directory
    /// (`"staging/orders"` -> `ldbt/staging/orders.lua`)
    pub fn model_path(&self, name: &str) -> PathBuf {
        self.model_dir.join(format!("{}.{}", name, MODEL_EXTENSION))
    }

    /// All models of the project, in sorted path order
    pub fn discover_models(&self) -> CoreResult<Vec<PathBuf>> {
        discover_models(&self.model_dir)
    }
}

/// Whether a path names a model source (not a test or package initializer)
pub fn is_model_file(path: &Path) -> bool {
    if !path.extension().is_some_and(|e| e == MODEL_EXTENSION) {
        return false;
    }
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => stem != PACKAGE_INIT_STEM && !stem.ends_with(TEST_SUFFIX),
        None => false,
    }
}

/// Recursively discover model files under `root`.
///
/// Paths are returned sorted so that processing order is stable across
/// platforms and runs.
pub fn discover_models(root: &Path) -> CoreResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CoreError::DirectoryNotFound {
            path: root.display().to_string(),
        });
    }

    let mut models = Vec::new();
    discover_recursive(root, &mut models)?;
    models.sort();
    Ok(models)
}

fn discover_recursive(dir: &Path, models: &mut Vec<PathBuf>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })? {
        let entry = entry.map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            discover_recursive(&path, models)?;
            continue;
        }
        if is_model_file(&path) {
            models.push(path);
        }
    }
    Ok(())
}

/// Co-located test file of a model (`foo.lua` -> `foo_test.lua`)
pub fn test_path_for(model_path: &Path) -> PathBuf {
    let stem = model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    model_path.with_file_name(format!("{}{}.{}", stem, TEST_SUFFIX, MODEL_EXTENSION))
}

/// Mirror a model path under `model_root` onto `output_root` with a `.sql`
/// extension.
pub fn output_path_for(
    model_root: &Path,
    output_root: &Path,
    model_path: &Path,
) -> CoreResult<PathBuf> {
    let relative =
        model_path
            .strip_prefix(model_root)
            .map_err(|_| CoreError::OutsideModelRoot {
                path: model_path.display().to_string(),
                root: model_root.display().to_string(),
            })?;
    Ok(output_root.join(relative).with_extension("sql"))
}

/// Display name of a model: its path relative to the model root, without
/// extension, using `/` separators.
pub fn model_name(model_root: &Path, model_path: &Path) -> String {
    let relative = model_path.strip_prefix(model_root).unwrap_or(model_path);
    relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
