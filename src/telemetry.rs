//! Telemetry metric name constants.
//!
//! Centralised metric names for adapter operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `sluicegate_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `outcome` — read result: "data", "end_of_stream" or "error"

/// Total reads completed by a byte source.
///
/// Labels: `outcome` ("data" | "end_of_stream" | "error").
pub const READS_TOTAL: &str = "sluicegate_reads_total";

/// Total buffers emitted to subscribers.
pub const BUFFERS_EMITTED_TOTAL: &str = "sluicegate_buffers_emitted_total";

/// Total payload bytes emitted to subscribers.
pub const BYTES_EMITTED_TOTAL: &str = "sluicegate_bytes_emitted_total";

/// Total errors that arrived after the stream closed and were dropped.
pub const ERRORS_DROPPED_TOTAL: &str = "sluicegate_errors_dropped_total";

/// Total byte sources released.
///
/// Labels: `status` ("ok" | "error").
pub const SOURCES_CLOSED_TOTAL: &str = "sluicegate_sources_closed_total";
