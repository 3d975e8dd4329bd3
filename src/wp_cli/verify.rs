//! Checksum verification for downloaded WP-CLI artifacts.
//!
//! The checksum endpoint lives next to the artifact: `<url>.sha512` or
//! `<url>.md5`, returning the hex digest as plain text.

use anyhow::{Context, Result};
use md5::Md5;
use sha2::{Digest, Sha512};
use std::fmt;
use std::fs;
use std::path::Path;

/// Hash algorithms understood by the checksum endpoints, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgo {
    Sha512,
    Md5,
}

impl HashAlgo {
    /// Suffix appended to the download URL to reach the checksum resource.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgo::Sha512 => "sha512",
            HashAlgo::Md5 => "md5",
        }
    }

    pub fn digest_hex(self, bytes: &[u8]) -> String {
        match self {
            HashAlgo::Sha512 => {
                let mut hasher = Sha512::new();
                hasher.update(bytes);
                format!("{:x}", hasher.finalize())
            }
            HashAlgo::Md5 => {
                let mut hasher = Md5::new();
                hasher.update(bytes);
                format!("{:x}", hasher.finalize())
            }
        }
    }
}

/// Result of verifying a local artifact. Fetch failures and digest
/// mismatches stay distinct; callers must surface both messages as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    FetchFailed { url: String, reason: String },
    Mismatch { expected: String, actual: String },
}

impl VerifyOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerifyOutcome::Verified)
    }
}

impl fmt::Display for VerifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyOutcome::Verified => write!(f, "checksum verified"),
            VerifyOutcome::FetchFailed { url, reason } => {
                write!(f, "checksum fetch failed for {url}: {reason}")
            }
            VerifyOutcome::Mismatch { expected, actual } => {
                write!(f, "hash check failed: expected {expected}, got {actual}")
            }
        }
    }
}

/// Validates a downloaded artifact against its companion checksum resource.
pub struct Checker {
    download_url: String,
    algo: HashAlgo,
    agent: ureq::Agent,
}

impl Checker {
    /// Checker using the strongest supported algorithm.
    pub fn new(download_url: &str) -> Self {
        Self::with_algo(download_url, HashAlgo::Sha512)
    }

    /// Checker with an explicit algorithm; the weak fallback warns.
    pub fn with_algo(download_url: &str, algo: HashAlgo) -> Self {
        if algo == HashAlgo::Md5 {
            tracing::warn!("falling back to weak md5 checksum for {download_url}");
        }
        Self {
            download_url: download_url.to_string(),
            algo,
            agent: super::http_agent(),
        }
    }

    pub fn checksum_url(&self) -> String {
        format!("{}.{}", self.download_url, self.algo.name())
    }

    /// Fetch the expected checksum and compare it against the local digest.
    ///
    /// Only local I/O failures are `Err`; network failures and digest
    /// mismatches are data, reported through [`VerifyOutcome`].
    pub fn verify(&self, artifact: &Path) -> Result<VerifyOutcome> {
        let url = self.checksum_url();
        let expected = match self.fetch_checksum(&url) {
            Ok(expected) => expected,
            Err(err) => {
                return Ok(VerifyOutcome::FetchFailed {
                    url,
                    reason: format!("{err:#}"),
                })
            }
        };
        let bytes = fs::read(artifact)
            .with_context(|| format!("read artifact {}", artifact.display()))?;
        let actual = self.algo.digest_hex(&bytes);
        if actual.eq_ignore_ascii_case(&expected) {
            Ok(VerifyOutcome::Verified)
        } else {
            Ok(VerifyOutcome::Mismatch { expected, actual })
        }
    }

    fn fetch_checksum(&self, url: &str) -> Result<String> {
        let mut response = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("GET {url}"))?;
        let body = response
            .body_mut()
            .read_to_string()
            .context("read checksum body")?;
        // Endpoints may append the file name after the digest.
        body.split_whitespace()
            .next()
            .map(str::to_string)
            .context("empty checksum body")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digests_are_lowercase_hex() {
        assert_eq!(
            HashAlgo::Md5.digest_hex(b"wpscaffold"),
            format!("{:x}", {
                let mut hasher = Md5::new();
                hasher.update(b"wpscaffold");
                hasher.finalize()
            })
        );
        assert_eq!(HashAlgo::Sha512.digest_hex(b"").len(), 128);
        assert_eq!(HashAlgo::Md5.digest_hex(b"").len(), 32);
    }

    #[test]
    fn checksum_url_appends_algorithm_name() {
        let checker = Checker::new("https://example.test/wp-cli.phar");
        assert_eq!(
            checker.checksum_url(),
            "https://example.test/wp-cli.phar.sha512"
        );
        let checker = Checker::with_algo("https://example.test/wp-cli.phar", HashAlgo::Md5);
        assert_eq!(
            checker.checksum_url(),
            "https://example.test/wp-cli.phar.md5"
        );
    }

    #[test]
    fn outcome_messages_stay_distinct() {
        let fetch = VerifyOutcome::FetchFailed {
            url: "https://example.test/x.sha512".to_string(),
            reason: "connection refused".to_string(),
        };
        let mismatch = VerifyOutcome::Mismatch {
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert!(fetch.to_string().contains("checksum fetch failed"));
        assert!(mismatch.to_string().contains("hash check failed"));
        assert!(!mismatch.to_string().contains("fetch"));
    }
}
