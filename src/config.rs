//! Scaffolding configuration: an append-only key/value store merged from the
//! project manifest and an optional standalone JSON file.
//!
//! Values stay as raw JSON until a caller extracts them through
//! [`ConfigValue`], so a misconfigured key surfaces as a fallback rather than
//! a parse failure at load time.

use crate::env_filters::{filter, FilterMode, Filtered};
use anyhow::{anyhow, Context, Result};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Project manifest holding the inline configuration block.
pub const MANIFEST_FILE: &str = "composer.json";
/// Key of the inline configuration block under the manifest's `extra` object.
pub const MANIFEST_EXTRA_KEY: &str = "wpscaffold";
/// Standalone configuration file; its values win over the inline block.
pub const OVERLAY_FILE: &str = "wpscaffold.json";

/// One configuration store per run, shared by reference across all steps.
///
/// Mutation happens only through [`Config::append`], which refuses to
/// overwrite: the config is resolved eagerly at load time and individual
/// fields (e.g. the discovered WordPress version) are late-bound exactly once.
#[derive(Debug, Clone)]
pub struct Config {
    values: BTreeMap<String, Value>,
}

impl Config {
    /// Load and merge configuration for `project_dir`.
    ///
    /// Precedence, lowest to highest: documented defaults, the
    /// `extra.wpscaffold` block of `composer.json`, then `wpscaffold.json`.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let mut values = default_values();

        for (key, value) in manifest_block(project_dir)? {
            values.insert(key, value);
        }

        let overlay_path = project_dir.join(OVERLAY_FILE);
        if overlay_path.is_file() {
            let bytes = fs::read(&overlay_path)
                .with_context(|| format!("read {}", overlay_path.display()))?;
            let overlay: Map<String, Value> =
                serde_json::from_slice(&bytes).context("parse wpscaffold.json")?;
            for (key, value) in overlay {
                values.insert(key, value);
            }
        }

        Ok(Self { values })
    }

    /// Build a config from explicit values plus the documented defaults.
    pub fn from_values(overrides: BTreeMap<String, Value>) -> Self {
        let mut values = default_values();
        values.extend(overrides);
        Self { values }
    }

    /// Typed view of a single key; absent keys yield an empty wrapper.
    pub fn value(&self, key: &str) -> ConfigValue<'_> {
        ConfigValue {
            raw: self.values.get(key),
        }
    }

    /// Late-bind a computed value. Errors if the key is already set.
    pub fn append(&mut self, key: &str, value: Value) -> Result<()> {
        if self.values.contains_key(key) {
            return Err(anyhow!("config key {key:?} is already set"));
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

fn manifest_block(project_dir: &Path) -> Result<Map<String, Value>> {
    let manifest_path = project_dir.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Ok(Map::new());
    }
    let bytes =
        fs::read(&manifest_path).with_context(|| format!("read {}", manifest_path.display()))?;
    let manifest: Value = serde_json::from_slice(&bytes).context("parse composer.json")?;
    match manifest.pointer(&format!("/extra/{MANIFEST_EXTRA_KEY}")) {
        Some(Value::Object(block)) => Ok(block.clone()),
        Some(other) => {
            tracing::warn!(
                "extra.{MANIFEST_EXTRA_KEY} in composer.json is not an object (got {other}), ignoring"
            );
            Ok(Map::new())
        }
        None => Ok(Map::new()),
    }
}

fn default_values() -> BTreeMap<String, Value> {
    let mut values = BTreeMap::new();
    values.insert("install-wp-cli".to_string(), json!(true));
    values.insert("content-dev-op".to_string(), json!("symlink"));
    values.insert("content-dev-dir".to_string(), json!("content-dev"));
    values.insert("unknown-dropins".to_string(), json!(false));
    values.insert("env-example".to_string(), json!(true));
    values.insert("require-wp".to_string(), json!(true));
    values.insert("wordpress-install-dir".to_string(), json!("wp"));
    values.insert("wordpress-content-dir".to_string(), json!("wp-content"));
    values
}

/// Wrapper around one raw configuration value supporting typed extraction
/// with fallback. All accessors treat unusable values as absent.
#[derive(Debug, Clone, Copy)]
pub struct ConfigValue<'a> {
    raw: Option<&'a Value>,
}

impl<'a> ConfigValue<'a> {
    pub fn raw(&self) -> Option<&'a Value> {
        self.raw
    }

    /// Deserialize into `T`, falling back on absence or shape mismatch.
    pub fn unwrap_or_fallback<T: serde::de::DeserializeOwned>(&self, fallback: T) -> T {
        match self.raw {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or(fallback),
            None => fallback,
        }
    }

    /// True when the value is present and not null/empty.
    pub fn not_empty(&self) -> bool {
        match self.raw {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    /// True when the value is absent or differs from `other`.
    pub fn is_not(&self, other: &Value) -> bool {
        self.raw != Some(other)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.raw.and_then(Value::as_bool)
    }

    /// Coerce through a typed filter mode; invalid input reads as absent.
    pub fn filtered(&self, mode: FilterMode) -> Option<Filtered> {
        self.raw.and_then(|value| filter(mode, value))
    }

    /// Flag keys go through the permissive boolean filter, so `"yes"` and
    /// `1` work alongside plain booleans; anything unusable is the default.
    pub fn bool_or(&self, default: bool) -> bool {
        match self.filtered(FilterMode::Bool) {
            Some(Filtered::Bool(flag)) => flag,
            _ => default,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.raw.and_then(Value::as_str)
    }

    pub fn as_object(&self) -> Option<&'a Map<String, Value>> {
        self.raw.and_then(Value::as_object)
    }

    /// A scalar string becomes a one-element list; non-string array entries
    /// are dropped with a warning.
    pub fn as_string_list(&self) -> Vec<String> {
        match self.raw {
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item.as_str() {
                    Some(s) if !s.trim().is_empty() => Some(s.to_string()),
                    _ => {
                        tracing::warn!("dropping non-string list entry {item}");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}
