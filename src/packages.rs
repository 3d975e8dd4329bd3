//! Read-only view of package metadata already resolved by the package
//! manager, plus WordPress core version discovery.
//!
//! This core never resolves or installs packages; it only reads
//! `vendor/composer/installed.json` written by the external resolver.

use crate::config::Config;
use crate::paths::ProjectPaths;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Package type whose install directories are scanned for auto-loaded
/// plugin entry files.
pub const MUPLUGIN_TYPE: &str = "wordpress-muplugin";
/// Package type providing the WordPress core files.
pub const WORDPRESS_CORE_TYPE: &str = "wordpress-core";

/// Oldest WordPress version the scaffolded templates support.
const MIN_WP_VERSION: (u64, u64, u64) = (5, 0, 0);

/// One installed package as reported by the resolver. Read-only to this core.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    #[serde(rename = "type", default)]
    pub package_type: String,
    #[serde(default)]
    pub version: String,
    /// Relative to `vendor/composer/` when present.
    #[serde(rename = "install-path", default)]
    install_path: Option<String>,
}

impl PackageRecord {
    pub fn new(name: &str, package_type: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            package_type: package_type.to_string(),
            version: version.to_string(),
            install_path: None,
        }
    }

    pub fn with_install_path(mut self, rel: &str) -> Self {
        self.install_path = Some(rel.to_string());
        self
    }
}

#[derive(Debug, Deserialize)]
struct InstalledFile {
    #[serde(default)]
    packages: Vec<PackageRecord>,
}

/// Queries resolved package metadata for packages of a given type and their
/// install paths.
#[derive(Debug)]
pub struct PackageFinder {
    vendor_dir: PathBuf,
    packages: Vec<PackageRecord>,
}

impl PackageFinder {
    /// Load `vendor/composer/installed.json`; a missing file means an empty
    /// package set, not an error.
    pub fn load(paths: &ProjectPaths) -> Result<Self> {
        let vendor_dir = paths.vendor();
        let installed = vendor_dir.join("composer").join("installed.json");
        if !installed.is_file() {
            tracing::debug!("no installed packages metadata at {}", installed.display());
            return Ok(Self {
                vendor_dir,
                packages: Vec::new(),
            });
        }
        let bytes =
            fs::read(&installed).with_context(|| format!("read {}", installed.display()))?;
        let parsed: InstalledFile =
            serde_json::from_slice(&bytes).context("parse installed packages JSON")?;
        Ok(Self {
            vendor_dir,
            packages: parsed.packages,
        })
    }

    /// Build a finder from explicit records (embedding and tests).
    pub fn from_records(vendor_dir: PathBuf, packages: Vec<PackageRecord>) -> Self {
        Self {
            vendor_dir,
            packages,
        }
    }

    pub fn find_by_type(&self, package_type: &str) -> Vec<&PackageRecord> {
        self.packages
            .iter()
            .filter(|record| record.package_type == package_type)
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&PackageRecord> {
        self.packages.iter().find(|record| record.name == name)
    }

    /// Install directory for a record: the resolver-reported `install-path`
    /// (relative to `vendor/composer/`) when present, else `vendor/{name}`.
    pub fn install_path(&self, record: &PackageRecord) -> PathBuf {
        match &record.install_path {
            Some(rel) => self.vendor_dir.join("composer").join(rel),
            None => self.vendor_dir.join(&record.name),
        }
    }
}

/// Resolve the WordPress core version for this run.
///
/// A `wp-version` config pin wins over package discovery. The result is
/// normalized to `x.y.z`; versions below the supported minimum, and a
/// missing version while `require-wp` is set, are fatal.
pub fn discover_wp_version(finder: &PackageFinder, config: &Config) -> Result<Option<String>> {
    let pinned = config
        .value("wp-version")
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let discovered = pinned.or_else(|| {
        finder
            .find_by_type(WORDPRESS_CORE_TYPE)
            .first()
            .map(|record| record.version.clone())
    });

    let require_wp = config.value("require-wp").bool_or(true);
    let (min_major, min_minor, _) = MIN_WP_VERSION;
    match discovered {
        Some(raw) => {
            let parsed = version_tuple(&raw)
                .ok_or_else(|| anyhow!("unparsable WordPress version {raw:?}"))?;
            if parsed < MIN_WP_VERSION {
                return Err(anyhow!(
                    "no supported WordPress version found: {raw} is older than {min_major}.{min_minor}"
                ));
            }
            let (major, minor, patch) = parsed;
            Ok(Some(format!("{major}.{minor}.{patch}")))
        }
        None if require_wp => Err(anyhow!(
            "no supported WordPress version found: no {WORDPRESS_CORE_TYPE} package is installed \
             and wp-version is not set"
        )),
        None => Ok(None),
    }
}

/// Parse the leading `x[.y[.z]]` of a version string; pre-release suffixes
/// after a `-` or `+` are ignored.
pub(crate) fn version_tuple(raw: &str) -> Option<(u64, u64, u64)> {
    let core = raw
        .trim()
        .split(['-', '+'])
        .next()
        .unwrap_or_default();
    let mut parts = core.split('.');
    let major = parts.next()?.parse::<u64>().ok()?;
    let minor = match parts.next() {
        Some(part) => part.parse::<u64>().ok()?,
        None => 0,
    };
    let patch = match parts.next() {
        Some(part) => part.parse::<u64>().ok()?,
        None => 0,
    };
    Some((major, minor, patch))
}
