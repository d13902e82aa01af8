//! Shared utilities for CLI commands

use anyhow::Result;
use ld_core::ProjectLayout;
use std::path::Path;

use crate::cli::GlobalArgs;

/// Resolve the project layout from `--project-dir`
pub(crate) fn project_layout(global: &GlobalArgs) -> ProjectLayout {
    ProjectLayout::new(Path::new(&global.project_dir))
}

/// Fail unless `ldbt init` has been run in this project
pub(crate) fn require_model_dir(layout: &ProjectLayout) -> Result<()> {
    if !layout.model_dir.is_dir() {
        anyhow::bail!("No ldbt directory found. Run 'ldbt init' first.");
    }
    Ok(())
}

/// Print a `[verbose]` line on stderr when `--verbose` is set
pub(crate) fn verbose(global: &GlobalArgs, message: impl AsRef<str>) {
    if global.verbose {
        eprintln!("[verbose] {}", message.as_ref());
    }
}
