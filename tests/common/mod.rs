//! Shared project fixture for integration tests: a temporary directory laid
//! out like a resolver-managed project (manifest, overlay, vendor metadata).

use serde_json::{json, Value};
use std::fs;
use std::path::Path;

pub struct ProjectFixture {
    dir: tempfile::TempDir,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create fixture directory"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `composer.json` with the given `extra.wpscaffold` block.
    pub fn write_manifest(&self, block: Value) {
        let manifest = json!({
            "name": "acme/site",
            "extra": { "wpscaffold": block }
        });
        fs::write(
            self.root().join("composer.json"),
            serde_json::to_vec_pretty(&manifest).unwrap(),
        )
        .expect("write composer.json");
    }

    /// Write the standalone `wpscaffold.json` overlay.
    pub fn write_overlay(&self, overlay: Value) {
        fs::write(
            self.root().join("wpscaffold.json"),
            serde_json::to_vec_pretty(&overlay).unwrap(),
        )
        .expect("write wpscaffold.json");
    }

    /// Write `vendor/composer/installed.json` with the given package records.
    pub fn install_packages(&self, packages: Value) {
        let composer_dir = self.root().join("vendor/composer");
        fs::create_dir_all(&composer_dir).expect("create vendor/composer");
        fs::write(
            composer_dir.join("installed.json"),
            serde_json::to_vec_pretty(&json!({ "packages": packages })).unwrap(),
        )
        .expect("write installed.json");
    }

    /// Write a file under the project root, creating parent directories.
    pub fn write_file(&self, rel: &str, contents: &str) {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(path, contents).expect("write fixture file");
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).expect("read fixture file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root().join(rel).exists()
    }
}
