//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus,
//! statsd); without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `patisserie_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: completion backend name ("groq", "mistral")
//! - `status`: "ok" or the failure kind ("auth", "network", ...)
//! - `classifier`: classifier name ("retrieval", "static-few-shot")
//! - `label`: predicted label, sentinels included

/// Total completion requests sent to a backend.
///
/// Labels: `provider`, `status`.
pub const COMPLETION_REQUESTS_TOTAL: &str = "patisserie_completion_requests_total";

/// Completion request duration in seconds.
///
/// Labels: `provider`.
pub const COMPLETION_DURATION_SECONDS: &str = "patisserie_completion_duration_seconds";

/// Total intent predictions.
///
/// Labels: `classifier`, `label`.
pub const PREDICTIONS_TOTAL: &str = "patisserie_predictions_total";
