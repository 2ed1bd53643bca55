//! Error types for page source implementations
//!
//! Configuration errors live in [`crate::crawler`] next to the builder that
//! raises them; profiling errors live in [`crate::profiler`]. This module
//! only covers failures a [`crate::PageSource`] can report, all of which the
//! crawl engine recovers from locally.

/// Errors that can occur while fetching or parsing a page
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The URL string could not be parsed
    #[error("invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP request failed or returned an error status
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure raised by a custom page source implementation
    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// Create a custom source error from any message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
