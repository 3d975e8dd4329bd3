//! Step capability contract and the shared execution context.

pub mod builtin;
pub mod registry;

use crate::config::Config;
use crate::packages::PackageFinder;
use crate::paths::ProjectPaths;
use anyhow::Result;

/// Reported result of a single step.
///
/// `Failed` records a step-local failure that must not abort the steps still
/// scheduled (tool acquisition and verification errors); a step's own
/// unrecoverable error is the `Err` arm of [`Step::run`] and aborts the rest
/// of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step did its work, or confirmed it was already done.
    Success(String),
    /// Nothing to do; no mutation happened.
    Skipped(String),
    /// The step failed without poisoning the rest of the run.
    Failed(String),
}

/// Per-run state shared by reference across all steps. The config is
/// append-only; everything else is read-only to steps (filesystem aside).
pub struct StepContext {
    pub config: Config,
    pub paths: ProjectPaths,
    pub packages: PackageFinder,
}

/// A single idempotent scaffolding operation.
pub trait Step {
    /// Name under which the step was cataloged. Checked defensively after
    /// construction; a mismatch drops the step.
    fn name(&self) -> &str;

    fn run(&self, ctx: &mut StepContext) -> Result<StepOutcome>;
}

/// Placeholder standing in for unrecognized step references, so a
/// misconfigured custom step never aborts scaffolding.
pub struct NopStep;

impl Step for NopStep {
    fn name(&self) -> &str {
        "nop"
    }

    fn run(&self, _ctx: &mut StepContext) -> Result<StepOutcome> {
        Ok(StepOutcome::Skipped("no-op placeholder".to_string()))
    }
}
