//! WP-CLI acquisition: tool descriptor, local artifact resolution, and
//! conditional download with checksum verification.

pub mod executor;
pub mod verify;

use crate::config::Config;
use crate::packages::{version_tuple, PackageFinder};
use crate::paths::ProjectPaths;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const PACKAGE_NAME: &str = "wp-cli/wp-cli";
const MIN_VERSION: (u64, u64, u64) = (2, 0, 0);
const DEFAULT_DOWNLOAD_URL: &str =
    "https://raw.githubusercontent.com/wp-cli/builds/gh-pages/phar/wp-cli.phar";
const PHAR_FILE: &str = "wp-cli.phar";
const BOOTSTRAP_REL: &str = "php/boot-fs.php";

/// Both network boundaries (checksum and artifact GETs) share one timeout.
const NETWORK_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_PHAR_BYTES: u64 = 64 * 1024 * 1024;

pub(crate) fn http_agent() -> ureq::Agent {
    ureq::config::Config::builder()
        .timeout_global(Some(NETWORK_TIMEOUT))
        .build()
        .new_agent()
}

/// Descriptor of the companion command-line tool. Immutable once built.
#[derive(Debug, Clone)]
pub struct WpCliTool {
    pub nice_name: &'static str,
    pub package_name: &'static str,
    pub min_version: (u64, u64, u64),
    pub download_url: String,
    pub phar_target: PathBuf,
    pub bootstrap_rel: &'static str,
}

impl WpCliTool {
    pub fn from_config(config: &Config, paths: &ProjectPaths) -> Self {
        let download_url = config
            .value("wp-cli-download-url")
            .unwrap_or_fallback(DEFAULT_DOWNLOAD_URL.to_string());
        Self {
            nice_name: "WP-CLI",
            package_name: PACKAGE_NAME,
            min_version: MIN_VERSION,
            download_url,
            phar_target: paths.root().join(PHAR_FILE),
            bootstrap_rel: BOOTSTRAP_REL,
        }
    }

    /// First existing local artifact: the fixed unversioned filename, then
    /// version-suffixed candidates, newest parsed version first. A manually
    /// pinned phar therefore takes precedence over auto-download.
    pub fn resolve_local_phar(&self) -> Option<PathBuf> {
        if self.phar_target.is_file() {
            return Some(self.phar_target.clone());
        }
        let dir = self.phar_target.parent()?;
        let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.file_name().is_some_and(|name| {
                        let name = name.to_string_lossy();
                        name.starts_with("wp-cli-") && name.ends_with(".phar")
                    })
            })
            .collect();
        // Parsed-version ordering, not lexical: 2.10.0 must beat 2.9.0.
        candidates.sort_by(|a, b| phar_version(b).cmp(&phar_version(a)).then_with(|| a.cmp(b)));
        candidates.into_iter().next()
    }
}

fn phar_version(path: &Path) -> Option<(u64, u64, u64)> {
    let name = path.file_name()?.to_string_lossy();
    let raw = name.strip_prefix("wp-cli-")?.strip_suffix(".phar")?;
    version_tuple(raw)
}

/// How the tool will be launched through the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSource {
    /// Bootstrap file of an installed package.
    Package { bootstrap: PathBuf },
    /// A phar archive on disk, pinned or freshly downloaded.
    Phar { path: PathBuf },
}

impl ToolSource {
    pub fn launch_path(&self) -> &Path {
        match self {
            ToolSource::Package { bootstrap } => bootstrap,
            ToolSource::Phar { path } => path,
        }
    }
}

/// Locate or acquire the tool, in priority order: installed package of a
/// supported version, local phar, verified download (unless disabled).
pub fn ensure_tool(
    tool: &WpCliTool,
    finder: &PackageFinder,
    config: &Config,
) -> Result<ToolSource> {
    if let Some(record) = finder.find_by_name(tool.package_name) {
        if version_tuple(&record.version).is_some_and(|version| version >= tool.min_version) {
            let bootstrap = finder.install_path(record).join(tool.bootstrap_rel);
            if bootstrap.is_file() {
                tracing::info!(
                    "using installed {} {} via {}",
                    tool.nice_name,
                    record.version,
                    bootstrap.display()
                );
                return Ok(ToolSource::Package { bootstrap });
            }
            tracing::warn!(
                "{} package installed but bootstrap file missing at {}",
                tool.nice_name,
                bootstrap.display()
            );
        } else {
            tracing::warn!(
                "installed {} {} is older than the supported minimum",
                tool.nice_name,
                record.version
            );
        }
    }

    if let Some(path) = tool.resolve_local_phar() {
        tracing::info!("using local {} at {}", tool.nice_name, path.display());
        return Ok(ToolSource::Phar { path });
    }

    if !config.value("install-wp-cli").bool_or(true) {
        return Err(anyhow!(
            "{} not found and download is disabled (install-wp-cli = false)",
            tool.nice_name
        ));
    }
    download_verified(tool)
}

/// Download the phar and verify it against its companion checksum. A failed
/// verification removes the artifact and reports the distinct diagnostic.
fn download_verified(tool: &WpCliTool) -> Result<ToolSource> {
    tracing::info!(
        "downloading {} from {}",
        tool.nice_name,
        tool.download_url
    );
    let agent = http_agent();
    let mut response = agent
        .get(&tool.download_url)
        .call()
        .with_context(|| format!("download {}", tool.download_url))?;
    let bytes = response
        .body_mut()
        .with_config()
        .limit(MAX_PHAR_BYTES)
        .read_to_vec()
        .context("read artifact body")?;
    fs::write(&tool.phar_target, &bytes)
        .with_context(|| format!("write {}", tool.phar_target.display()))?;

    let checker = verify::Checker::new(&tool.download_url);
    let outcome = checker.verify(&tool.phar_target)?;
    if !outcome.is_verified() {
        let _ = fs::remove_file(&tool.phar_target);
        return Err(anyhow!("{}: {outcome}", tool.nice_name));
    }
    tracing::info!("{} verified at {}", tool.nice_name, tool.phar_target.display());
    Ok(ToolSource::Phar {
        path: tool.phar_target.clone(),
    })
}
