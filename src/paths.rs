//! Resolved filesystem layout for a scaffolded project.

use crate::config::Config;
use std::path::{Path, PathBuf};

/// Project directory layout shared by every step. Join helpers only; the
/// paths type performs no I/O.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
    wp_dir: String,
    content_dir: String,
}

impl ProjectPaths {
    pub fn resolve(root: PathBuf, config: &Config) -> Self {
        let wp_dir = config
            .value("wordpress-install-dir")
            .unwrap_or_fallback("wp".to_string());
        let content_dir = config
            .value("wordpress-content-dir")
            .unwrap_or_fallback("wp-content".to_string());
        Self {
            root,
            wp_dir,
            content_dir,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative name of the WordPress core directory (used in templates).
    pub fn wp_dir_name(&self) -> &str {
        &self.wp_dir
    }

    /// Relative name of the content directory, possibly nested (used in
    /// templates verbatim, never reduced to a base name).
    pub fn content_dir_name(&self) -> &str {
        &self.content_dir
    }

    pub fn vendor(&self) -> PathBuf {
        self.root.join("vendor")
    }

    pub fn wp(&self) -> PathBuf {
        self.root.join(&self.wp_dir)
    }

    pub fn wp_content(&self) -> PathBuf {
        self.root.join(&self.content_dir)
    }

    pub fn mu_plugins(&self) -> PathBuf {
        self.wp_content().join("mu-plugins")
    }
}
