//! Planning and rendering metrics.
//!
//! Recorded through the `metrics` facade; the embedding binary decides
//! whether a recorder is installed.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const PLANS_TOTAL: &str = "vcomp_plans_total";
    pub const PLAN_FAILURES_TOTAL: &str = "vcomp_plan_failures_total";
    pub const PLAN_DURATION_SECONDS: &str = "vcomp_plan_duration_seconds";
    pub const PROBES_TOTAL: &str = "vcomp_probes_total";
    pub const RENDERS_TOTAL: &str = "vcomp_renders_total";
    pub const FFMPEG_DURATION_SECONDS: &str = "vcomp_ffmpeg_duration_seconds";
}

/// Record a successfully planned composition.
pub fn record_plan(action: &str, duration_secs: f64) {
    let labels = [("action", action.to_string())];
    counter!(names::PLANS_TOTAL, &labels).increment(1);
    histogram!(names::PLAN_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a planning failure by error category.
pub fn record_plan_failure(action: &str, kind: &str) {
    let labels = [("action", action.to_string()), ("kind", kind.to_string())];
    counter!(names::PLAN_FAILURES_TOTAL, &labels).increment(1);
}

/// Record one probe call.
pub fn record_probe(kind: &str, success: bool) {
    let labels = [
        ("kind", kind.to_string()),
        ("success", success.to_string()),
    ];
    counter!(names::PROBES_TOTAL, &labels).increment(1);
}

/// Record one engine invocation.
pub fn record_render(action: &str, success: bool, duration_secs: f64) {
    let labels = [
        ("action", action.to_string()),
        ("success", success.to_string()),
    ];
    counter!(names::RENDERS_TOTAL, &labels).increment(1);
    histogram!(names::FFMPEG_DURATION_SECONDS, &labels).record(duration_secs);
}
