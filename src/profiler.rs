//! Transparent call-timing instrumentation for capability interfaces
//!
//! A [`Profiler`] wraps any delegate whose type describes its capability
//! interface through the [`Capability`] trait. The wrapper forwards every
//! call unchanged; calls to methods the interface marks as profiled are
//! timed, and the elapsed time is added to a [`ProfilingState`] shared by
//! every wrapper the profiler has produced. Timing is recorded on the
//! failure path too: a delegate error still contributes its elapsed time
//! before propagating to the caller.
//!
//! # Examples
//!
//! ```ignore
//! use crawltally::{HttpPageSource, Profiler};
//!
//! let profiler = Profiler::new();
//! let source = profiler.wrap(HttpPageSource::new())?;
//! // `source` implements PageSource; every `parse` call is now timed.
//!
//! profiler.write_report_to_path("profile.txt")?;
//! ```

use std::{
    collections::BTreeMap,
    fmt,
    fs::OpenOptions,
    future::Future,
    io,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::SourceError;
use crate::report;
use crate::source::{PageResult, PageSource};

/// Errors that can occur when wrapping a delegate
#[derive(Debug, thiserror::Error)]
pub enum ProfilerError {
    /// The capability interface marks no methods as profiled
    ///
    /// Wrapping something with nothing to measure is a caller error, caught
    /// at wrap time rather than silently producing a no-op wrapper.
    #[error("interface `{0}` declares no profiled methods")]
    NoProfiledMethods(&'static str),
}

/// Static description of a capability interface
///
/// Implemented by concrete delegate types to name the interface they expose
/// and which of its methods are subject to timing. This replaces runtime
/// introspection: the profiled-method set is a compile-time declaration.
pub trait Capability {
    /// Name of the capability interface the type exposes
    const INTERFACE: &'static str;
    /// Methods of the interface that are timed when wrapped
    const PROFILED_METHODS: &'static [&'static str];
}

/// Identity of one profiled method: declaring interface plus method name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodId {
    pub interface: &'static str,
    pub method: &'static str,
}

impl MethodId {
    /// Create a method identity
    pub fn new(interface: &'static str, method: &'static str) -> Self {
        Self { interface, method }
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.interface, self.method)
    }
}

/// Accumulated per-method elapsed time, shared across wrappers
///
/// Entries only ever grow: recording adds to the existing total or inserts
/// a new one. Increments are linearizable (no lost updates) but carry no
/// ordering relative to each other.
#[derive(Debug, Default)]
pub struct ProfilingState {
    totals: DashMap<MethodId, Duration>,
}

impl ProfilingState {
    /// Create an empty profiling state
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `elapsed` to the running total for `id`
    pub fn record(&self, id: MethodId, elapsed: Duration) {
        *self.totals.entry(id).or_insert(Duration::ZERO) += elapsed;
    }

    /// Total elapsed time recorded for `id`, zero if never recorded
    pub fn elapsed(&self, id: MethodId) -> Duration {
        self.totals
            .get(&id)
            .map(|entry| *entry.value())
            .unwrap_or(Duration::ZERO)
    }

    /// Ordered snapshot of every recorded total
    ///
    /// `BTreeMap` keyed by [`MethodId`] gives the deterministic report order:
    /// interface name first, method name second.
    pub fn snapshot(&self) -> BTreeMap<MethodId, Duration> {
        self.totals
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }
}

/// Wrapper around a delegate that times its profiled methods
///
/// Behaviorally identical to the delegate: same return values, same errors,
/// same side effects, observed exactly once per call. Obtained through
/// [`Profiler::wrap`].
pub struct Profiled<T> {
    inner: T,
    state: Arc<ProfilingState>,
}

impl<T: Capability> Profiled<T> {
    /// Forward a call, timing it if `method` is marked as profiled
    async fn timed<F, R>(&self, method: &'static str, call: F) -> R
    where
        F: Future<Output = R>,
    {
        if !T::PROFILED_METHODS.contains(&method) {
            return call.await;
        }
        let start = Instant::now();
        let output = call.await;
        // Recorded before the result is surfaced, so failures are timed too.
        self.state
            .record(MethodId::new(T::INTERFACE, method), start.elapsed());
        output
    }
}

impl<T> Profiled<T> {
    /// Borrow the wrapped delegate
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Unwrap back into the delegate, discarding the instrumentation
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait::async_trait]
impl<T> PageSource for Profiled<T>
where
    T: PageSource + Capability,
{
    async fn parse(&self, url: &str) -> Result<PageResult, SourceError> {
        self.timed("parse", self.inner.parse(url)).await
    }
}

/// Factory for [`Profiled`] wrappers sharing one timing aggregate
///
/// Every wrapper built by the same profiler records into the same
/// [`ProfilingState`], so totals aggregate across however many instances
/// were wrapped. The report timestamp is fixed at construction time.
pub struct Profiler {
    state: Arc<ProfilingState>,
    started_at: DateTime<Utc>,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler {
    /// Create a profiler with a fresh, empty profiling state
    pub fn new() -> Self {
        Self {
            state: Arc::new(ProfilingState::new()),
            started_at: Utc::now(),
        }
    }

    /// Wrap a delegate so its profiled methods are timed
    ///
    /// Fails at wrap time, before any call is made, if the delegate's
    /// capability interface marks no methods as profiled.
    pub fn wrap<T: Capability>(&self, delegate: T) -> Result<Profiled<T>, ProfilerError> {
        if T::PROFILED_METHODS.is_empty() {
            return Err(ProfilerError::NoProfiledMethods(T::INTERFACE));
        }
        Ok(Profiled {
            inner: delegate,
            state: self.state.clone(),
        })
    }

    /// Handle to the shared timing aggregate
    pub fn state(&self) -> &ProfilingState {
        &self.state
    }

    /// Total elapsed time recorded for one method
    pub fn elapsed(&self, id: MethodId) -> Duration {
        self.state.elapsed(id)
    }

    /// Write the timing report to any sink
    ///
    /// One header line with the profiler's construction timestamp, then one
    /// line per profiled method in deterministic order.
    pub fn write_report<W: io::Write>(&self, sink: W) -> io::Result<()> {
        report::write_report(sink, &self.started_at, &self.state)
    }

    /// Append the timing report to a file, creating it if absent
    ///
    /// Existing content is kept: repeated writes produce concatenated report
    /// blocks.
    pub fn write_report_to_path(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        self.write_report(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_id_display_joins_interface_and_method() {
        let id = MethodId::new("PageSource", "parse");
        assert_eq!(id.to_string(), "PageSource#parse");
    }

    #[test]
    fn state_accumulates_per_method() {
        let state = ProfilingState::new();
        let id = MethodId::new("PageSource", "parse");

        state.record(id, Duration::from_millis(10));
        state.record(id, Duration::from_millis(25));
        assert_eq!(state.elapsed(id), Duration::from_millis(35));

        let other = MethodId::new("PageSource", "links");
        assert_eq!(state.elapsed(other), Duration::ZERO);
    }

    #[test]
    fn snapshot_orders_by_interface_then_method() {
        let state = ProfilingState::new();
        state.record(MethodId::new("Sink", "write"), Duration::from_millis(1));
        state.record(MethodId::new("PageSource", "parse"), Duration::from_millis(2));
        state.record(MethodId::new("PageSource", "links"), Duration::from_millis(3));

        let ordered: Vec<String> = state.snapshot().keys().map(|id| id.to_string()).collect();
        assert_eq!(
            ordered,
            vec!["PageSource#links", "PageSource#parse", "Sink#write"]
        );
    }
}
