//! End-to-end scaffolding run: load configuration, resolve the project
//! layout and package metadata, assemble the step catalog, and execute the
//! selected steps in order.

use crate::config::Config;
use crate::packages::{discover_wp_version, PackageFinder};
use crate::paths::ProjectPaths;
use crate::steps::registry::{build_steps, Catalog, StepRegistry};
use crate::steps::{Step, StepContext, StepOutcome};
use anyhow::{anyhow, Context, Result};
use serde_json::json;
use std::path::Path;

/// Per-step results of one run, in execution order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub succeeded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Error listing every failed step, for callers that treat any step
    /// failure as a failed run.
    pub fn ensure_clean(&self) -> Result<()> {
        if self.failed.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = self.failed.iter().map(|(name, _)| name.as_str()).collect();
        Err(anyhow!(
            "{} step(s) failed: {}",
            self.failed.len(),
            names.join(", ")
        ))
    }
}

/// Run the scaffolding pipeline for `project_dir`.
///
/// An empty `selection` runs the whole catalog; otherwise only the named
/// steps run, in catalog order. Fatal conditions (unreadable configuration,
/// no supported WordPress version, a missing interpreter for a cataloged
/// tool step) error out before any step executes; a step returning `Err`
/// aborts the steps still scheduled.
pub fn scaffold(project_dir: &Path, selection: &[String]) -> Result<RunReport> {
    let mut config = Config::load(project_dir)?;
    let paths = ProjectPaths::resolve(project_dir.to_path_buf(), &config);
    let packages = PackageFinder::load(&paths)?;

    let pinned = config.value("wp-version").not_empty();
    if let Some(version) = discover_wp_version(&packages, &config)? {
        // Late-bind the discovered version so templates can reference it; a
        // pinned value stays exactly as the user wrote it.
        if !pinned {
            config.append("wp-version", json!(version))?;
        }
        tracing::info!("scaffolding against WordPress {version}");
    } else {
        tracing::info!("scaffolding without a WordPress core package");
    }

    let catalog = Catalog::assemble(&config);
    let selected = catalog.select(selection);
    if selected.is_empty() {
        tracing::warn!("selection matched no cataloged steps");
        return Ok(RunReport::default());
    }

    let registry = StepRegistry::builtin();
    let mut ctx = StepContext {
        config,
        paths,
        packages,
    };
    let steps = build_steps(&registry, &selected, &ctx)?;
    run_steps(&steps, &mut ctx)
}

/// Execute instantiated steps in order, collecting per-step outcomes.
pub fn run_steps(steps: &[(String, Box<dyn Step>)], ctx: &mut StepContext) -> Result<RunReport> {
    let mut report = RunReport::default();
    for (name, step) in steps {
        tracing::info!("running step {name}");
        let outcome = step
            .run(ctx)
            .with_context(|| format!("step {name} failed"))?;
        match outcome {
            StepOutcome::Success(message) => {
                tracing::info!("step {name}: {message}");
                report.succeeded.push(name.clone());
            }
            StepOutcome::Skipped(message) => {
                tracing::info!("step {name} skipped: {message}");
                report.skipped.push(name.clone());
            }
            StepOutcome::Failed(message) => {
                tracing::error!("step {name} failed: {message}");
                report.failed.push((name.clone(), message));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_clean_names_failed_steps() {
        let report = RunReport {
            succeeded: vec!["wp-config".to_string()],
            skipped: Vec::new(),
            failed: vec![("wp-cli-commands".to_string(), "boom".to_string())],
        };
        let err = report.ensure_clean().unwrap_err();
        assert!(err.to_string().contains("wp-cli-commands"));
        assert!(!report.is_clean());
    }

    #[test]
    fn run_aborts_on_step_error() {
        struct Exploding;
        impl Step for Exploding {
            fn name(&self) -> &str {
                "exploding"
            }
            fn run(&self, _ctx: &mut StepContext) -> Result<StepOutcome> {
                Err(anyhow!("disk on fire"))
            }
        }
        struct Never;
        impl Step for Never {
            fn name(&self) -> &str {
                "never"
            }
            fn run(&self, _ctx: &mut StepContext) -> Result<StepOutcome> {
                panic!("must not run after an aborting step");
            }
        }

        let config = Config::from_values(Default::default());
        let paths = ProjectPaths::resolve(std::env::temp_dir(), &config);
        let packages = PackageFinder::from_records(paths.vendor(), Vec::new());
        let mut ctx = StepContext {
            config,
            paths,
            packages,
        };
        let steps: Vec<(String, Box<dyn Step>)> = vec![
            ("exploding".to_string(), Box::new(Exploding)),
            ("never".to_string(), Box::new(Never)),
        ];
        let err = run_steps(&steps, &mut ctx).unwrap_err();
        assert!(err.to_string().contains("step exploding failed"));
    }

    #[test]
    fn tool_failure_does_not_abort_later_steps() {
        struct Failing;
        impl Step for Failing {
            fn name(&self) -> &str {
                "failing"
            }
            fn run(&self, _ctx: &mut StepContext) -> Result<StepOutcome> {
                Ok(StepOutcome::Failed("checksum trouble".to_string()))
            }
        }
        struct After;
        impl Step for After {
            fn name(&self) -> &str {
                "after"
            }
            fn run(&self, _ctx: &mut StepContext) -> Result<StepOutcome> {
                Ok(StepOutcome::Success("still ran".to_string()))
            }
        }

        let config = Config::from_values(Default::default());
        let paths = ProjectPaths::resolve(std::env::temp_dir(), &config);
        let packages = PackageFinder::from_records(paths.vendor(), Vec::new());
        let mut ctx = StepContext {
            config,
            paths,
            packages,
        };
        let steps: Vec<(String, Box<dyn Step>)> = vec![
            ("failing".to_string(), Box::new(Failing)),
            ("after".to_string(), Box::new(After)),
        ];
        let report = run_steps(&steps, &mut ctx).unwrap();
        assert_eq!(report.succeeded, vec!["after".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert!(report.ensure_clean().is_err());
    }
}
