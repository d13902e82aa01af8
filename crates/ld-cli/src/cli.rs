//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// ldbt - write dbt models as Lua functions over a query builder
#[derive(Parser, Debug)]
#[command(name = "ldbt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the dbt project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold the ldbt directory with an example model and test
    Init(InitArgs),

    /// Compile every model to SQL under models/
    Run(RunArgs),

    /// Run model unit tests against an in-memory engine
    Test(TestArgs),
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite example files that already exist
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {}

/// Arguments for the test command
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Model to test, relative to the ldbt directory without extension
    /// (default: all)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: TestOutput,
}

/// Test output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutput {
    /// One marked line per case
    Text,
    /// JSON array of results
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
