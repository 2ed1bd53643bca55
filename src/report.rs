//! Textual serialization of accumulated profiling state
//!
//! A report block is a `Run at <timestamp>` header, one line per profiled
//! method in [`MethodId`](crate::MethodId) order, and a trailing blank line.
//! Callers that write to files open them in append mode, so repeated runs
//! stack complete blocks after existing content.

use std::io;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::profiler::ProfilingState;

/// Write one complete report block to `sink`
pub(crate) fn write_report<W: io::Write>(
    mut sink: W,
    started_at: &DateTime<Utc>,
    state: &ProfilingState,
) -> io::Result<()> {
    writeln!(sink, "Run at {}", started_at.to_rfc2822())?;
    for (id, elapsed) in state.snapshot() {
        writeln!(sink, "{} took {}", id, format_duration(elapsed))?;
    }
    writeln!(sink)?;
    sink.flush()
}

/// Render a duration as whole minutes, seconds, and milliseconds
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.as_secs() / 60;
    let seconds = duration.as_secs() % 60;
    let millis = duration.subsec_millis();
    format!("{minutes}m {seconds}s {millis}ms")
}
