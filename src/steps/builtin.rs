//! Built-in scaffolding steps.
//!
//! Every file-writing step is idempotent: an already-present file yields a
//! `Skipped` outcome instead of an overwrite, so a re-run after a partial
//! failure converges without rollback machinery.

use super::{Step, StepContext, StepOutcome};
use crate::mu_plugins::MuPluginList;
use crate::wp_cli::executor::{resolve_interpreter, WpCliExecutor};
use crate::wp_cli::{ensure_tool, WpCliTool};
use anyhow::{anyhow, Context, Result};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

const WP_CONFIG_TEMPLATE: &str = r#"<?php
/**
 * Environment-driven WordPress configuration.
 *
 * Generated once by wpscaffold; edit freely, re-runs will not overwrite it.
 */
{{EARLY_HOOK}}
define('ABSPATH', __DIR__ . '/{{WP_DIR}}/');
define('WP_CONTENT_DIR', __DIR__ . '/{{CONTENT_DIR}}');
define('WP_CONTENT_URL', rtrim(getenv('WP_HOME') ?: '', '/') . '/{{CONTENT_DIR}}');

define('DB_NAME', getenv('DB_NAME') ?: '');
define('DB_USER', getenv('DB_USER') ?: '');
define('DB_PASSWORD', getenv('DB_PASSWORD') ?: '');
define('DB_HOST', getenv('DB_HOST') ?: 'localhost');
define('DB_CHARSET', 'utf8mb4');
define('DB_COLLATE', '');

$table_prefix = getenv('DB_TABLE_PREFIX') ?: 'wp_';

/* Scaffolded against WordPress {{WP_VERSION}}. */
if (!defined('WP_DEBUG')) {
    define('WP_DEBUG', filter_var(getenv('WP_DEBUG'), FILTER_VALIDATE_BOOLEAN));
}

require_once ABSPATH . 'wp-settings.php';
"#;

const INDEX_TEMPLATE: &str = r#"<?php
define('WP_USE_THEMES', true);
require __DIR__ . '/{{WP_DIR}}/wp-blog-header.php';
"#;

const ENV_EXAMPLE_TEMPLATE: &str = r#"# Copy to `.env` and fill in the values for this environment.
DB_NAME=
DB_USER=
DB_PASSWORD=
DB_HOST=localhost
DB_TABLE_PREFIX=wp_
WP_HOME=https://example.test
WP_SITEURL=${WP_HOME}/{{WP_DIR}}
WP_DEBUG=false
"#;

/// Dropin file names WordPress loads from the content directory.
const KNOWN_DROPINS: [&str; 11] = [
    "advanced-cache.php",
    "blog-deleted.php",
    "blog-inactive.php",
    "blog-suspended.php",
    "db-error.php",
    "db.php",
    "fatal-error-handler.php",
    "install.php",
    "maintenance.php",
    "object-cache.php",
    "sunrise.php",
];

const CONTENT_DEV_SUBDIRS: [&str; 4] = ["themes", "plugins", "mu-plugins", "languages"];

const MU_LOADER_FILE: &str = "wpscaffold-loader.php";

/// Write `contents` unless the file already exists.
fn write_new_file(path: &Path, contents: &str) -> Result<StepOutcome> {
    if path.exists() {
        return Ok(StepOutcome::Skipped(format!(
            "{} already exists",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(StepOutcome::Success(format!("wrote {}", path.display())))
}

/// Ensures the content directories exist before anything writes into them.
pub struct CheckPathsStep;

impl Step for CheckPathsStep {
    fn name(&self) -> &str {
        "check-paths"
    }

    fn run(&self, ctx: &mut StepContext) -> Result<StepOutcome> {
        if !ctx.paths.root().is_dir() {
            return Err(anyhow!(
                "project directory {} does not exist",
                ctx.paths.root().display()
            ));
        }
        let mut created = Vec::new();
        for dir in [ctx.paths.wp_content(), ctx.paths.mu_plugins()] {
            if !dir.is_dir() {
                fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
                created.push(dir.display().to_string());
            }
        }
        if created.is_empty() {
            Ok(StepOutcome::Skipped(
                "all project directories already present".to_string(),
            ))
        } else {
            Ok(StepOutcome::Success(format!(
                "created {}",
                created.join(", ")
            )))
        }
    }
}

/// Writes `wp-config.php`, wiring the environment and the optional early
/// hook file in before WordPress settings load.
pub struct WpConfigStep;

impl Step for WpConfigStep {
    fn name(&self) -> &str {
        "wp-config"
    }

    fn run(&self, ctx: &mut StepContext) -> Result<StepOutcome> {
        let early_hook = match ctx.config.value("early-hook-file").as_str() {
            Some(rel) if !rel.trim().is_empty() => {
                format!("require __DIR__ . '/{}';\n", php_escape(rel.trim()))
            }
            _ => String::new(),
        };
        let wp_version = ctx
            .config
            .value("wp-version")
            .unwrap_or_fallback("unknown".to_string());
        let contents = WP_CONFIG_TEMPLATE
            .replace("{{EARLY_HOOK}}", &early_hook)
            .replace("{{WP_DIR}}", ctx.paths.wp_dir_name())
            .replace("{{CONTENT_DIR}}", ctx.paths.content_dir_name())
            .replace("{{WP_VERSION}}", &wp_version);
        write_new_file(&ctx.paths.root().join("wp-config.php"), &contents)
    }
}

/// Writes the webroot `index.php` loader.
pub struct IndexStep;

impl Step for IndexStep {
    fn name(&self) -> &str {
        "index"
    }

    fn run(&self, ctx: &mut StepContext) -> Result<StepOutcome> {
        let contents = INDEX_TEMPLATE.replace("{{WP_DIR}}", ctx.paths.wp_dir_name());
        write_new_file(&ctx.paths.root().join("index.php"), &contents)
    }
}

/// Regenerates the mu-plugins loader from discovered package entry files.
///
/// The loader is a generated file, so unlike the other writers it is kept in
/// sync with the discovered set; identical content still skips the write.
pub struct MuLoaderStep;

impl Step for MuLoaderStep {
    fn name(&self) -> &str {
        "mu-loader"
    }

    fn run(&self, ctx: &mut StepContext) -> Result<StepOutcome> {
        let entries = MuPluginList::new(&ctx.packages).entries()?;
        if entries.is_empty() {
            return Ok(StepOutcome::Skipped(
                "no mu-plugin packages installed".to_string(),
            ));
        }

        let mut contents = String::from(
            "<?php\n/**\n * Plugin Name: wpscaffold MU loader\n * Generated file; loads \
             mu-plugin entry points discovered from installed packages.\n */\n",
        );
        for (key, path) in &entries {
            contents.push_str(&format!(
                "require_once '{}'; // {key}\n",
                php_escape(&path.display().to_string())
            ));
        }

        let loader = ctx.paths.mu_plugins().join(MU_LOADER_FILE);
        if loader.is_file() {
            let existing = fs::read_to_string(&loader)
                .with_context(|| format!("read {}", loader.display()))?;
            if existing == contents {
                return Ok(StepOutcome::Skipped(format!(
                    "{} is up to date",
                    loader.display()
                )));
            }
        }
        if let Some(parent) = loader.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&loader, &contents).with_context(|| format!("write {}", loader.display()))?;
        Ok(StepOutcome::Success(format!(
            "wrote {} with {} entry file(s)",
            loader.display(),
            entries.len()
        )))
    }
}

/// Writes `.env.example` unless disabled via the `env-example` key.
pub struct EnvExampleStep;

impl Step for EnvExampleStep {
    fn name(&self) -> &str {
        "env-example"
    }

    fn run(&self, ctx: &mut StepContext) -> Result<StepOutcome> {
        if !ctx.config.value("env-example").bool_or(true) {
            return Ok(StepOutcome::Skipped(
                "disabled via env-example config".to_string(),
            ));
        }
        let contents = ENV_EXAMPLE_TEMPLATE.replace("{{WP_DIR}}", ctx.paths.wp_dir_name());
        write_new_file(&ctx.paths.root().join(".env.example"), &contents)
    }
}

/// Copies declared dropin files into the content directory. Names outside
/// the recognized set are gated by the `unknown-dropins` flag.
pub struct DropinsStep;

impl Step for DropinsStep {
    fn name(&self) -> &str {
        "dropins"
    }

    fn run(&self, ctx: &mut StepContext) -> Result<StepOutcome> {
        let sources = ctx.config.value("dropins").as_string_list();
        if sources.is_empty() {
            return Ok(StepOutcome::Skipped("no dropins configured".to_string()));
        }
        let allow_unknown = ctx.config.value("unknown-dropins").bool_or(false);

        let mut copied = 0usize;
        let mut skipped = 0usize;
        for source in &sources {
            let src = ctx.paths.root().join(source);
            let Some(file_name) = src.file_name().map(|name| name.to_string_lossy().to_string())
            else {
                tracing::warn!("dropin source {source:?} has no file name, skipping");
                skipped += 1;
                continue;
            };
            if !KNOWN_DROPINS.contains(&file_name.as_str()) && !allow_unknown {
                tracing::warn!(
                    "{file_name} is not a recognized dropin (set unknown-dropins to allow it)"
                );
                skipped += 1;
                continue;
            }
            if !src.is_file() {
                tracing::warn!("dropin source {} not found, skipping", src.display());
                skipped += 1;
                continue;
            }
            let dest = ctx.paths.wp_content().join(&file_name);
            if dest.exists() {
                skipped += 1;
                continue;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            fs::copy(&src, &dest)
                .with_context(|| format!("copy {} to {}", src.display(), dest.display()))?;
            copied += 1;
        }
        if copied == 0 {
            Ok(StepOutcome::Skipped(format!(
                "{skipped} dropin(s) skipped, nothing copied"
            )))
        } else {
            Ok(StepOutcome::Success(format!(
                "copied {copied} dropin(s), skipped {skipped}"
            )))
        }
    }
}

/// Mirrors development content (themes, plugins, mu-plugins, languages)
/// into the content directory, by symlink or copy per `content-dev-op`.
pub struct ContentDevStep;

impl Step for ContentDevStep {
    fn name(&self) -> &str {
        "content-dev"
    }

    fn run(&self, ctx: &mut StepContext) -> Result<StepOutcome> {
        if !ctx.config.value("content-dev-op").is_not(&json!("none")) {
            return Ok(StepOutcome::Skipped(
                "disabled via content-dev-op".to_string(),
            ));
        }
        let op = ctx
            .config
            .value("content-dev-op")
            .unwrap_or_fallback("symlink".to_string());
        let dev_dir_name = ctx
            .config
            .value("content-dev-dir")
            .unwrap_or_fallback("content-dev".to_string());
        let dev_dir = ctx.paths.root().join(&dev_dir_name);
        if !dev_dir.is_dir() {
            return Ok(StepOutcome::Skipped(format!(
                "no development content at {}",
                dev_dir.display()
            )));
        }

        let mut placed = 0usize;
        for subdir in CONTENT_DEV_SUBDIRS {
            let src_dir = dev_dir.join(subdir);
            if !src_dir.is_dir() {
                continue;
            }
            let dest_dir = ctx.paths.wp_content().join(subdir);
            fs::create_dir_all(&dest_dir)
                .with_context(|| format!("create {}", dest_dir.display()))?;
            for entry in
                fs::read_dir(&src_dir).with_context(|| format!("read {}", src_dir.display()))?
            {
                let src = entry?.path();
                let Some(name) = src.file_name() else {
                    continue;
                };
                let dest = dest_dir.join(name);
                if dest.exists() || dest.is_symlink() {
                    continue;
                }
                place_entry(&op, &src, &dest)?;
                placed += 1;
            }
        }
        if placed == 0 {
            Ok(StepOutcome::Skipped(
                "development content already in place".to_string(),
            ))
        } else {
            Ok(StepOutcome::Success(format!(
                "placed {placed} development content entr{} via {op}",
                if placed == 1 { "y" } else { "ies" }
            )))
        }
    }
}

fn place_entry(op: &str, src: &Path, dest: &Path) -> Result<()> {
    match op {
        "copy" => copy_tree(src, dest)
            .with_context(|| format!("copy {} to {}", src.display(), dest.display())),
        _ => symlink_entry(src, dest)
            .with_context(|| format!("link {} to {}", src.display(), dest.display())),
    }
}

#[cfg(unix)]
fn symlink_entry(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dest)
}

#[cfg(not(unix))]
fn symlink_entry(src: &Path, dest: &Path) -> std::io::Result<()> {
    // Platforms without plain symlinks fall back to copying.
    copy_tree_io(src, dest)
}

fn copy_tree(src: &Path, dest: &Path) -> std::io::Result<()> {
    copy_tree_io(src, dest)
}

fn copy_tree_io(src: &Path, dest: &Path) -> std::io::Result<()> {
    if src.is_dir() {
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_tree_io(&entry.path(), &dest.join(entry.file_name()))?;
        }
    } else {
        fs::copy(src, dest)?;
    }
    Ok(())
}

/// Writes a starter `.gitignore` covering generated and vendored paths.
pub struct GitignoreStep;

impl Step for GitignoreStep {
    fn name(&self) -> &str {
        "gitignore"
    }

    fn run(&self, ctx: &mut StepContext) -> Result<StepOutcome> {
        let contents = format!(
            ".env\nvendor/\nwp-cli.phar\n{}/\n{}/uploads/\n",
            ctx.paths.wp_dir_name(),
            ctx.paths.content_dir_name()
        );
        write_new_file(&ctx.paths.root().join(".gitignore"), &contents)
    }
}

/// Runs configured WP-CLI commands through the acquired tool.
///
/// Construction resolves the interpreter, so a missing `php` aborts the run
/// before any step executes. Tool acquisition and checksum failures fail
/// only this step; a failing command is step-fatal.
pub struct WpCliCommandsStep {
    php: PathBuf,
}

impl WpCliCommandsStep {
    pub fn build(_ctx: &StepContext) -> Result<Box<dyn Step>> {
        let php = resolve_interpreter()?;
        Ok(Box::new(Self { php }))
    }
}

impl Step for WpCliCommandsStep {
    fn name(&self) -> &str {
        "wp-cli-commands"
    }

    fn run(&self, ctx: &mut StepContext) -> Result<StepOutcome> {
        let commands = ctx.config.value("wp-cli-commands").as_string_list();
        if commands.is_empty() {
            return Ok(StepOutcome::Skipped(
                "no WP-CLI commands configured".to_string(),
            ));
        }

        let tool = WpCliTool::from_config(&ctx.config, &ctx.paths);
        let source = match ensure_tool(&tool, &ctx.packages, &ctx.config) {
            Ok(source) => source,
            // Tool-fatal: report and fail this step without aborting the rest.
            Err(err) => return Ok(StepOutcome::Failed(format!("{err:#}"))),
        };

        let executor =
            WpCliExecutor::new(self.php.clone(), source, ctx.paths.root().to_path_buf());
        for command in &commands {
            tracing::info!("running WP-CLI command: {command}");
            let output = executor.execute(command)?;
            if output.exit_code != 0 {
                return Err(anyhow!(
                    "WP-CLI command {command:?} failed with exit code {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                ));
            }
        }
        Ok(StepOutcome::Success(format!(
            "ran {} WP-CLI command(s)",
            commands.len()
        )))
    }
}

fn php_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}
