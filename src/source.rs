//! Page source abstraction decoupling the crawl engine from page fetching
//!
//! The engine only ever sees a [`PageSource`]: something that turns a URL
//! into the word counts found on that page plus the outbound links it
//! discovered. The bundled HTTP implementation lives in [`crate::fetch`];
//! tests substitute in-memory link graphs.

use std::collections::HashMap;

use crate::error::SourceError;

/// Result of fetching and parsing a single page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// Occurrences of each word in the page text, keys case-normalized
    pub word_counts: HashMap<String, u64>,
    /// Outbound URLs discovered on the page, in document order
    pub links: Vec<String>,
}

impl PageResult {
    /// Create a new PageResult
    pub fn new(word_counts: HashMap<String, u64>, links: Vec<String>) -> Self {
        Self { word_counts, links }
    }

    /// Create a PageResult with no words and no links
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Trait for turning a URL into a [`PageResult`]
///
/// Implementations are expected to be pure functions of the URL at the time
/// of the call. They may be slow (network-bound); the engine bounds how many
/// calls run at once. Case normalization of word keys is owned by the
/// source, not the engine.
///
/// # Example
///
/// ```ignore
/// struct FixedSource;
///
/// #[async_trait::async_trait]
/// impl PageSource for FixedSource {
///     async fn parse(&self, _url: &str) -> Result<PageResult, SourceError> {
///         Ok(PageResult::empty())
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch `url` and return its word counts and outbound links
    ///
    /// A failure here is local to the URL: the engine logs it and treats the
    /// page as having zero words and zero links.
    async fn parse(&self, url: &str) -> Result<PageResult, SourceError>;
}
