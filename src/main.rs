use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wpscaffold::cli::{Command, RootArgs, ScaffoldArgs, StepsArgs};
use wpscaffold::config::Config;
use wpscaffold::pipeline;
use wpscaffold::steps::registry::Catalog;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = RootArgs::parse();
    match args.command {
        Command::Scaffold(args) => cmd_scaffold(args),
        Command::Steps(args) => cmd_steps(args),
    }
}

fn project_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("resolve current directory"),
    }
}

fn cmd_scaffold(args: ScaffoldArgs) -> Result<()> {
    let dir = project_dir(args.dir)?;
    let report = pipeline::scaffold(&dir, &args.steps)?;

    println!(
        "scaffold finished: {} succeeded, {} skipped, {} failed",
        report.succeeded.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for (name, message) in &report.failed {
        eprintln!("  failed {name}: {message}");
    }
    report.ensure_clean()
}

fn cmd_steps(args: StepsArgs) -> Result<()> {
    let dir = project_dir(args.dir)?;
    let config = Config::load(&dir)?;
    for (name, id) in Catalog::assemble(&config).entries() {
        if name == id {
            println!("{name}");
        } else {
            println!("{name} ({id})");
        }
    }
    Ok(())
}
