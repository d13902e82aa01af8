//! Run command implementation - compiles every model to SQL

use anyhow::{Context, Result};
use ld_core::ConnectionConfig;
use ld_model::materialize_all;

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{project_layout, require_model_dir, verbose};

/// Execute the run command
pub(crate) async fn execute(_args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let layout = project_layout(global);
    require_model_dir(&layout)?;

    if !layout.output_dir.is_dir() {
        anyhow::bail!("No models directory found. Is this a dbt project?");
    }

    let env_file = layout.env_file();
    let config = ConnectionConfig::from_env_file(&env_file)
        .with_context(|| format!("Failed to load connection config from {}", env_file.display()))?;
    verbose(
        global,
        format!("Compiling models for the {} backend", config.backend),
    );

    let generated = materialize_all(&layout.model_dir, &layout.output_dir, &config)
        .context("Failed to generate SQL")?;

    for model in &generated {
        verbose(global, format!("Compiled {}", model.source.display()));
        println!("  {}", model.output.display());
    }

    println!("Generated SQL files for all models");
    Ok(())
}
