//! Discovery of auto-loaded plugin entry files (mu-plugins).
//!
//! A package directory with exactly one top-level script is trusted without
//! reading it; otherwise candidates are accepted on a `Plugin Name:` header
//! within the first 8 KiB.

use crate::packages::{PackageFinder, MUPLUGIN_TYPE};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

const HEADER_SCAN_BYTES: u64 = 8 * 1024;
const HEADER_PATTERN: &str = r"(?mi)^[ \t/*#@]*Plugin Name:[ \t]*\S";

/// Enumerates entry files of installed `wordpress-muplugin` packages.
pub struct MuPluginList<'a> {
    finder: &'a PackageFinder,
}

impl<'a> MuPluginList<'a> {
    pub fn new(finder: &'a PackageFinder) -> Self {
        Self { finder }
    }

    /// Mapping from entry key to entry file path.
    ///
    /// A package contributing exactly one candidate file is keyed by its bare
    /// package name; once a directory offers several candidates, every
    /// accepted entry is keyed `{package}_{file_stem}` to avoid collisions.
    pub fn entries(&self) -> Result<BTreeMap<String, PathBuf>> {
        let header = Regex::new(HEADER_PATTERN).context("compile plugin header pattern")?;
        let mut entries = BTreeMap::new();

        for package in self.finder.find_by_type(MUPLUGIN_TYPE) {
            let dir = self.finder.install_path(package);
            if !dir.is_dir() {
                tracing::debug!(package = %package.name, "install directory missing, skipping");
                continue;
            }
            let candidates = php_files_sorted(&dir)
                .with_context(|| format!("scan mu-plugin directory {}", dir.display()))?;
            if let [single] = candidates.as_slice() {
                // No ambiguity: take the single script without inspecting it.
                entries.insert(package.name.clone(), single.clone());
                continue;
            }
            for file in candidates {
                if !has_plugin_header(&file, &header) {
                    continue;
                }
                let stem = file
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
                    .unwrap_or_default();
                entries.insert(format!("{}_{}", package.name, stem), file);
            }
        }
        Ok(entries)
    }
}

fn php_files_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "php") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read up to the first 8 KiB, normalize line endings, and look for a
/// non-empty `Plugin Name:` header. Read failures drop the candidate.
fn has_plugin_header(path: &Path, header: &Regex) -> bool {
    let mut buf = Vec::new();
    let read = fs::File::open(path).and_then(|file| file.take(HEADER_SCAN_BYTES).read_to_end(&mut buf));
    if let Err(err) = read {
        tracing::warn!("failed to read {}: {err}", path.display());
        return false;
    }
    let text = String::from_utf8_lossy(&buf)
        .replace("\r\n", "\n")
        .replace('\r', "\n");
    header.is_match(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::PackageRecord;

    fn finder_for(dir: &Path, package: &str) -> PackageFinder {
        let record = PackageRecord::new(package, MUPLUGIN_TYPE, "1.0.0");
        // install path defaults to vendor/{name}
        PackageFinder::from_records(dir.to_path_buf(), vec![record])
    }

    fn write_plugin(dir: &Path, name: &str, contents: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn single_script_is_taken_without_inspection() {
        let tmp = tempfile::tempdir().unwrap();
        let vendor = tmp.path().join("vendor");
        let plugin_dir = vendor.join("acme/one");
        write_plugin(&plugin_dir, "whatever.php", "<?php // no header at all\n");

        let finder = finder_for(&vendor, "acme/one");
        let entries = MuPluginList::new(&finder).entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["acme/one"], plugin_dir.join("whatever.php"));
    }

    #[test]
    fn ambiguous_directory_requires_header_and_suffixes_key() {
        let tmp = tempfile::tempdir().unwrap();
        let vendor = tmp.path().join("vendor");
        let plugin_dir = vendor.join("acme/two");
        write_plugin(
            &plugin_dir,
            "loader.php",
            "<?php\r\n/*\r\n * Plugin Name: Acme Loader\r\n */\r\n",
        );
        write_plugin(&plugin_dir, "helpers.php", "<?php // helpers only\n");

        let finder = finder_for(&vendor, "acme/two");
        let entries = MuPluginList::new(&finder).entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["acme/two_loader"], plugin_dir.join("loader.php"));
    }

    #[test]
    fn header_match_is_case_insensitive_and_needs_a_value() {
        let tmp = tempfile::tempdir().unwrap();
        let vendor = tmp.path().join("vendor");
        let plugin_dir = vendor.join("acme/three");
        write_plugin(
            &plugin_dir,
            "a.php",
            "<?php\n// plugin name: lowercase works\n",
        );
        write_plugin(&plugin_dir, "b.php", "<?php\n/* Plugin Name:   */\n");

        let finder = finder_for(&vendor, "acme/three");
        let entries = MuPluginList::new(&finder).entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("acme/three_a"));
    }

    #[test]
    fn missing_directory_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let finder = finder_for(&tmp.path().join("vendor"), "acme/gone");
        let entries = MuPluginList::new(&finder).entries().unwrap();
        assert!(entries.is_empty());
    }
}
