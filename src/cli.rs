//! CLI argument parsing for the scaffolding workflow.
//!
//! The CLI is intentionally thin: it resolves a project directory and a step
//! selection, then hands off to [`crate::pipeline`], so the same core logic
//! can be embedded elsewhere.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "wpscaffold",
    version,
    about = "Scaffold environment-driven WordPress projects",
    after_help = "Commands:\n  scaffold [DIR]             Run the scaffolding pipeline in DIR (default: .)\n  steps [DIR]                Print the step catalog a run would execute\n\nExamples:\n  wpscaffold scaffold\n  wpscaffold scaffold /srv/site --step wp-config --step index\n  wpscaffold steps /srv/site",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Scaffold(ScaffoldArgs),
    Steps(StepsArgs),
}

/// Scaffold command inputs.
#[derive(Parser, Debug)]
#[command(about = "Run the scaffolding pipeline for a project directory")]
pub struct ScaffoldArgs {
    /// Project directory (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Run only this step; repeatable, executed in catalog order
    #[arg(long = "step", value_name = "NAME")]
    pub steps: Vec<String>,
}

/// Steps command inputs.
#[derive(Parser, Debug)]
#[command(about = "Print the resolved step catalog without running it")]
pub struct StepsArgs {
    /// Project directory (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,
}
