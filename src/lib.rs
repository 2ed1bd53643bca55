//! Depth- and deadline-bounded parallel web crawler with word tallying
//!
//! `crawltally` explores a link graph from one or more seed URLs, counts
//! word frequencies across every page it fetches, and stops cleanly at a
//! depth limit, a wall-clock deadline, or an ignore pattern. An orthogonal
//! [`Profiler`] can wrap any [`PageSource`] to transparently time its calls
//! and append a per-method report to a file.

// Core modules
mod config;
pub mod crawler;
mod error;
mod fetch;
pub mod profiler;
mod report;
mod source;

// Public exports
pub use config::CrawlConfig;
pub use crawler::{
    ConfigError, CrawlOutcome, CrawlRequest, Crawler, CrawlerBuilder, IgnoreList,
};
pub use error::SourceError;
pub use fetch::HttpPageSource;
pub use profiler::{
    Capability, MethodId, Profiled, Profiler, ProfilerError, ProfilingState,
};
pub use report::format_duration;
pub use source::{PageResult, PageSource};
