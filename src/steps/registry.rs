//! Step catalog construction and instantiation.
//!
//! The catalog is `builtin ∪ custom − skipped`: custom entries override
//! builtins on key collision, skipping removes by key or by factory id, and
//! the insertion order of the merge result is the execution order. Step
//! implementations come from a registry of typed constructors; unregistered
//! references degrade to a no-op placeholder instead of failing the run.

use super::builtin;
use super::{NopStep, Step, StepContext};
use anyhow::Result;
use std::collections::{HashMap, HashSet};

/// Typed constructor for a step implementation. Construction errors (e.g. a
/// missing interpreter) are fatal and abort the run before any step executes.
pub type StepFactory = fn(&StepContext) -> Result<Box<dyn Step>>;

/// Ordered builtin step table; declaration order is execution order.
pub const BUILTIN_STEPS: [&str; 8] = [
    "check-paths",
    "wp-config",
    "index",
    "mu-loader",
    "env-example",
    "dropins",
    "content-dev",
    "gitignore",
];

/// The tool-commands step, injected when configuration declares commands.
pub const WP_CLI_STEP: &str = "wp-cli-commands";

/// Registry of typed step constructors keyed by factory id.
pub struct StepRegistry {
    factories: HashMap<String, StepFactory>,
}

impl StepRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every builtin step under its own name.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("check-paths", |_| Ok(Box::new(builtin::CheckPathsStep)));
        registry.register("wp-config", |_| Ok(Box::new(builtin::WpConfigStep)));
        registry.register("index", |_| Ok(Box::new(builtin::IndexStep)));
        registry.register("mu-loader", |_| Ok(Box::new(builtin::MuLoaderStep)));
        registry.register("env-example", |_| Ok(Box::new(builtin::EnvExampleStep)));
        registry.register("dropins", |_| Ok(Box::new(builtin::DropinsStep)));
        registry.register("content-dev", |_| Ok(Box::new(builtin::ContentDevStep)));
        registry.register("gitignore", |_| Ok(Box::new(builtin::GitignoreStep)));
        registry.register(WP_CLI_STEP, builtin::WpCliCommandsStep::build);
        registry
    }

    pub fn register(&mut self, id: &str, factory: StepFactory) {
        self.factories.insert(id.to_string(), factory);
    }

    pub fn get(&self, id: &str) -> Option<StepFactory> {
        self.factories.get(id).copied()
    }
}

/// Ordered, de-duplicated mapping from step name to factory id.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<(String, String)>,
}

impl Catalog {
    /// Merge builtin and custom tables, then apply the skip list.
    pub fn assemble(config: &crate::config::Config) -> Self {
        let mut entries: Vec<(String, String)> = BUILTIN_STEPS
            .iter()
            .map(|name| (name.to_string(), name.to_string()))
            .collect();

        // Tool-commands step rides along whenever commands are configured;
        // de-duplication below keeps an explicit entry from doubling it.
        if config.value("wp-cli-commands").not_empty() {
            entries.push((WP_CLI_STEP.to_string(), WP_CLI_STEP.to_string()));
        }

        if let Some(custom) = config.value("custom-steps").as_object() {
            for (name, value) in custom {
                let name = name.trim();
                if name.is_empty() {
                    tracing::warn!("dropping custom step with empty name");
                    continue;
                }
                let Some(id) = value.as_str().map(str::trim).filter(|id| !id.is_empty())
                else {
                    tracing::warn!(step = %name, "custom step reference is not a step id, dropping");
                    continue;
                };
                match entries.iter_mut().find(|(key, _)| key == name) {
                    Some(entry) => entry.1 = id.to_string(),
                    None => entries.push((name.to_string(), id.to_string())),
                }
            }
        }

        let skip: HashSet<String> = config
            .value("skip-steps")
            .as_string_list()
            .into_iter()
            .collect();
        entries.retain(|(name, id)| !skip.contains(name) && !skip.contains(id));

        let mut seen = HashSet::new();
        entries.retain(|(name, _)| seen.insert(name.clone()));
        Self { entries }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Filter to an explicit selection, preserving catalog order (never the
    /// selection's order). Unknown names select nothing additional.
    pub fn select(&self, selection: &[String]) -> Vec<(String, String)> {
        if selection.is_empty() {
            return self.entries.clone();
        }
        let wanted: HashSet<&str> = selection.iter().map(String::as_str).collect();
        self.entries
            .iter()
            .filter(|(name, _)| wanted.contains(name.as_str()))
            .cloned()
            .collect()
    }
}

/// Instantiate the selected entries, enforcing the self-reported-name
/// contract: a step claiming a different name than its catalog key is
/// dropped (logged, not fatal).
pub fn build_steps(
    registry: &StepRegistry,
    selected: &[(String, String)],
    ctx: &StepContext,
) -> Result<Vec<(String, Box<dyn Step>)>> {
    let mut steps: Vec<(String, Box<dyn Step>)> = Vec::new();
    for (name, id) in selected {
        let Some(factory) = registry.get(id) else {
            tracing::warn!(step = %name, id = %id, "unregistered step reference, using no-op placeholder");
            steps.push((name.clone(), Box::new(NopStep)));
            continue;
        };
        let step = factory(ctx)?;
        if step.name() != name {
            tracing::warn!(
                step = %name,
                reported = %step.name(),
                "step reports a different name than its catalog key, dropping"
            );
            continue;
        }
        steps.push((name.clone(), step));
    }
    Ok(steps)
}
