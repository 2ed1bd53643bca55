//! Depth- and deadline-bounded parallel crawl engine
//!
//! The crawler explores a link graph recursively: every URL becomes one
//! exploration unit that fetches the page, folds its word counts into a
//! shared accumulator, and spawns one child unit per outbound link with one
//! less unit of remaining depth. All units of a single crawl share one
//! visited set and one word-count table; a [`tokio::sync::Semaphore`] bounds
//! how many fetches run at once.
//!
//! # Examples
//!
//! ```ignore
//! use crawltally::{Crawler, CrawlRequest, HttpPageSource, IgnoreList};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let crawler = Crawler::builder()
//!     .page_source(Arc::new(HttpPageSource::new()))
//!     .parallelism(8)
//!     .build()?;
//!
//! let request = CrawlRequest::new("https://example.com", Duration::from_secs(7), 4)
//!     .with_ignore_list(IgnoreList::new([r".*\.pdf"])?);
//!
//! let outcome = crawler.crawl(request).await;
//! println!("fetched {} pages", outcome.pages_fetched);
//! ```
//!
//! # Termination policy
//!
//! A unit runs only when it still has remaining depth, the deadline has not
//! passed, the URL matches no ignore pattern, and no other unit has claimed
//! the URL. The deadline is polled at unit start, never interrupt-driven:
//! fetches already in flight when it passes are allowed to finish, they just
//! spawn no children.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use dashmap::{DashMap, DashSet};
use futures_util::future::BoxFuture;
use regex::Regex;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::source::{PageResult, PageSource};

/// Errors that can occur while configuring a crawl
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Parallelism must be greater than 0
    #[error("parallelism must be greater than 0, got {0}")]
    InvalidParallelism(usize),

    /// A crawler needs a page source to fetch through
    #[error("no page source was configured")]
    MissingPageSource,

    /// An ignore pattern failed to compile
    #[error("invalid ignore pattern `{pattern}`: {source}")]
    BadIgnorePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The configuration file could not be read
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordered list of URL patterns that must never be fetched
///
/// Matching is full-string: a pattern has to cover the entire URL, not just
/// a substring of it. Patterns are checked in insertion order and the first
/// match wins.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: Vec<Regex>,
}

impl IgnoreList {
    /// Compile a list of patterns into an IgnoreList
    ///
    /// Each pattern is anchored at both ends before compilation, so
    /// `"https://a\.com/hidden"` skips exactly that URL while `"hidden"`
    /// alone matches nothing.
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let anchored = format!(r"\A(?:{pattern})\z");
            let regex =
                Regex::new(&anchored).map_err(|source| ConfigError::BadIgnorePattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
            compiled.push(regex);
        }
        Ok(Self { patterns: compiled })
    }

    /// Returns true if `url` fully matches any pattern
    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(url))
    }

    /// Number of compiled patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true if no patterns are configured
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Immutable parameters for one crawl invocation
///
/// A plain record: every exploration unit of the invocation sees the same
/// deadline and ignore list, so these are fixed up front and never touched
/// again.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// URLs to start exploring from, each at full depth
    pub seed_urls: Vec<String>,
    /// Absolute point in time after which no new unit starts work
    pub deadline: Instant,
    /// Remaining link hops, counting the seed fetch itself
    ///
    /// A depth of 0 crawls nothing at all: the seed page is never fetched.
    pub max_depth: usize,
    /// URL patterns excluded from the crawl
    pub ignored: IgnoreList,
}

impl CrawlRequest {
    /// Create a request for a single seed with a duration-from-now deadline
    pub fn new(seed_url: impl Into<String>, timeout: Duration, max_depth: usize) -> Self {
        Self {
            seed_urls: vec![seed_url.into()],
            deadline: Instant::now() + timeout,
            max_depth,
            ignored: IgnoreList::default(),
        }
    }

    /// Create a request starting from several seeds at once
    pub fn with_seeds(
        seed_urls: Vec<String>,
        timeout: Duration,
        max_depth: usize,
    ) -> Self {
        Self {
            seed_urls,
            deadline: Instant::now() + timeout,
            max_depth,
            ignored: IgnoreList::default(),
        }
    }

    /// Replace the deadline with an absolute instant
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = deadline;
        self
    }

    /// Attach an ignore list to the request
    pub fn with_ignore_list(mut self, ignored: IgnoreList) -> Self {
        self.ignored = ignored;
        self
    }
}

/// Final accumulator state of one crawl invocation
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    /// Total occurrences of each word across every fetched page
    pub word_counts: HashMap<String, u64>,
    /// Every URL claimed by an exploration unit
    pub visited: HashSet<String>,
    /// Number of pages fetched successfully
    pub pages_fetched: usize,
    /// Number of fetches that failed and were skipped
    pub fetch_errors: usize,
}

/// State shared by reference across the whole fan-out tree of one crawl
struct CrawlShared {
    source: Arc<dyn PageSource>,
    deadline: Instant,
    ignored: IgnoreList,
    visited: DashSet<String>,
    counts: DashMap<String, u64>,
    fetch_permits: Semaphore,
    pages_fetched: AtomicUsize,
    fetch_errors: AtomicUsize,
}

impl CrawlShared {
    /// Fetch one page, treating failure as an empty page
    async fn fetch(&self, url: &str) -> PageResult {
        match self.source.parse(url).await {
            Ok(page) => {
                self.pages_fetched.fetch_add(1, Ordering::Relaxed);
                page
            }
            Err(error) => {
                warn!(%url, %error, "page fetch failed, skipping");
                self.fetch_errors.fetch_add(1, Ordering::Relaxed);
                PageResult::empty()
            }
        }
    }
}

/// One exploration unit: process `url` with `depth` remaining hops
///
/// Boxed because the future recurses through `tokio::spawn`. The checks run
/// in a fixed order: depth, deadline, ignore list, then the visited set.
/// `DashSet::insert` is the single coordination point that keeps two units
/// racing on the same URL from both fetching it.
fn explore(shared: Arc<CrawlShared>, url: String, depth: usize) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        if depth == 0 {
            return;
        }
        if Instant::now() >= shared.deadline {
            debug!(%url, "deadline passed, declining");
            return;
        }
        if shared.ignored.matches(&url) {
            debug!(%url, "ignored");
            return;
        }
        if !shared.visited.insert(url.clone()) {
            return;
        }

        let page = {
            // Permit held only across the fetch, never while awaiting
            // children, so parents blocked on children cannot starve the
            // pool.
            let _permit = match shared.fetch_permits.acquire().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            shared.fetch(&url).await
        };

        for (word, count) in page.word_counts {
            *shared.counts.entry(word).or_insert(0) += count;
        }

        let mut children = Vec::with_capacity(page.links.len());
        for link in page.links {
            children.push(tokio::spawn(explore(shared.clone(), link, depth - 1)));
        }
        // Structured: this unit is complete only once every child is.
        for child in children {
            let _ = child.await;
        }
    })
}

/// Parallel web crawler that tallies word frequencies
///
/// Built through [`Crawler::builder`]. The crawler itself is stateless
/// between invocations; each call to [`Crawler::crawl`] gets a fresh
/// accumulator.
pub struct Crawler {
    source: Arc<dyn PageSource>,
    parallelism: usize,
}

impl Crawler {
    /// Create a crawler builder
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::new()
    }

    /// Number of concurrent fetches this crawler allows
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Run one crawl invocation to completion
    ///
    /// Blocks until every exploration unit spawned from the seeds has
    /// finished, then returns the accumulated word counts and visited set.
    /// A request whose deadline has already passed, or whose depth is 0,
    /// returns an empty outcome without fetching anything.
    pub async fn crawl(&self, request: CrawlRequest) -> CrawlOutcome {
        let shared = Arc::new(CrawlShared {
            source: self.source.clone(),
            deadline: request.deadline,
            ignored: request.ignored,
            visited: DashSet::new(),
            counts: DashMap::new(),
            fetch_permits: Semaphore::new(self.parallelism),
            pages_fetched: AtomicUsize::new(0),
            fetch_errors: AtomicUsize::new(0),
        });

        let mut roots = Vec::with_capacity(request.seed_urls.len());
        for seed in request.seed_urls {
            roots.push(tokio::spawn(explore(
                shared.clone(),
                seed,
                request.max_depth,
            )));
        }
        for root in roots {
            let _ = root.await;
        }

        CrawlOutcome {
            word_counts: shared
                .counts
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
            visited: shared.visited.iter().map(|url| url.key().clone()).collect(),
            pages_fetched: shared.pages_fetched.load(Ordering::Relaxed),
            fetch_errors: shared.fetch_errors.load(Ordering::Relaxed),
        }
    }
}

/// Builder for configuring a [`Crawler`]
pub struct CrawlerBuilder {
    source: Option<Arc<dyn PageSource>>,
    parallelism: usize,
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlerBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self {
            source: None,
            parallelism: default_parallelism(),
        }
    }

    /// Set the page source the crawler fetches through (required)
    pub fn page_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the number of concurrent fetches (default: available CPUs)
    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Build the crawler, validating the configuration
    pub fn build(self) -> Result<Crawler, ConfigError> {
        if self.parallelism == 0 {
            return Err(ConfigError::InvalidParallelism(0));
        }
        let source = self.source.ok_or(ConfigError::MissingPageSource)?;
        Ok(Crawler {
            source,
            parallelism: self.parallelism,
        })
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}
