//! Init command implementation - scaffolds the ldbt directory

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::cli::{GlobalArgs, InitArgs};
use crate::commands::common::{project_layout, verbose};

const EXAMPLE_MODEL: &str = include_str!("../../templates/your_first_model.lua");
const EXAMPLE_TEST: &str = include_str!("../../templates/your_first_model_test.lua");
const ENV_EXAMPLE: &str = include_str!("../../templates/env.example");
const GITIGNORE: &str = ".env\n";

/// Execute the init command
pub(crate) async fn execute(args: &InitArgs, global: &GlobalArgs) -> Result<()> {
    let layout = project_layout(global);
    let model_dir = &layout.model_dir;

    fs::create_dir_all(model_dir)
        .with_context(|| format!("Failed to create directory: {}", model_dir.display()))?;

    let files = [
        ("your_first_model.lua", EXAMPLE_MODEL),
        ("your_first_model_test.lua", EXAMPLE_TEST),
        (".env.example", ENV_EXAMPLE),
        (".gitignore", GITIGNORE),
    ];
    for (name, content) in files {
        write_scaffold_file(&model_dir.join(name), content, args.force, global)?;
    }

    println!("Created .env.example - copy to .env and configure your connection");
    println!("Initialized ldbt project in {}", model_dir.display());
    Ok(())
}

/// Write one scaffold file, leaving user edits alone unless `force` is set
fn write_scaffold_file(path: &Path, content: &str, force: bool, global: &GlobalArgs) -> Result<()> {
    if path.exists() && !force {
        verbose(global, format!("Keeping existing {}", path.display()));
        return Ok(());
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    verbose(global, format!("Wrote {}", path.display()));
    Ok(())
}
