//! JSON crawl configuration
//!
//! Mirrors the shape consumed by the command-line front end: camelCase keys,
//! seconds-from-now timeout, ignore patterns as raw strings compiled when
//! the configuration is turned into a [`CrawlRequest`].

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::crawler::{ConfigError, CrawlRequest, IgnoreList};

/// Crawl parameters as loaded from a JSON document
///
/// # Example
///
/// ```ignore
/// let config = CrawlConfig::from_json(r#"{
///     "seedUrls": ["https://example.com"],
///     "maxDepth": 4,
///     "timeoutSeconds": 7,
///     "ignoredUrls": [".*\\.pdf"],
///     "parallelism": 8
/// }"#)?;
/// let request = config.to_request()?;
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlConfig {
    /// URLs the crawl starts from
    pub seed_urls: Vec<String>,
    /// Maximum link depth, counting the seed fetch
    pub max_depth: usize,
    /// Wall-clock budget for the whole crawl
    pub timeout_seconds: u64,
    /// Patterns for URLs that must never be fetched
    #[serde(default)]
    pub ignored_urls: Vec<String>,
    /// Concurrent fetch limit; defaults to available CPUs when absent
    #[serde(default)]
    pub parallelism: Option<usize>,
    /// Where to append the profiling report, if anywhere
    #[serde(default)]
    pub profile_output_path: Option<PathBuf>,
}

impl CrawlConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// The configured timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Compile the configuration into a crawl request
    ///
    /// The deadline is fixed here, `timeoutSeconds` from now, so build the
    /// request just before starting the crawl.
    pub fn to_request(&self) -> Result<CrawlRequest, ConfigError> {
        let ignored = IgnoreList::new(&self.ignored_urls)?;
        Ok(CrawlRequest {
            seed_urls: self.seed_urls.clone(),
            deadline: Instant::now() + self.timeout(),
            max_depth: self.max_depth,
            ignored,
        })
    }
}
