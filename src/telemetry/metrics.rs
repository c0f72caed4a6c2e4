//! Metrics facade wiring for the frame pool.
//!
//! Emits through the `metrics` crate; without an installed recorder every
//! call is a no-op.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

pub const DISPATCH_TOTAL: &str = "frame_pool_dispatch_total";
pub const ITEMS_TOTAL: &str = "frame_pool_items_total";
pub const ITEM_FAILURES_TOTAL: &str = "frame_pool_item_failures_total";
pub const DISPATCH_DURATION_MS: &str = "frame_pool_dispatch_duration_ms";
pub const WORKERS: &str = "frame_pool_workers";
pub const THROTTLING_RATIO: &str = "frame_pool_throttling_ratio";

/// Register metric descriptions with the installed recorder.
///
/// Call once after installing a recorder; safe to skip.
pub fn init_metrics() {
    describe_counter!(DISPATCH_TOTAL, Unit::Count, "Frames dispatched");
    describe_counter!(ITEMS_TOTAL, Unit::Count, "Work items enqueued across all frames");
    describe_counter!(
        ITEM_FAILURES_TOTAL,
        Unit::Count,
        "Work items whose frame job returned an error or panicked"
    );
    describe_histogram!(
        DISPATCH_DURATION_MS,
        Unit::Milliseconds,
        "Wall time from enqueue to barrier release"
    );
    describe_gauge!(WORKERS, Unit::Count, "Live worker threads");
    describe_gauge!(THROTTLING_RATIO, "Throttling ratio of the last frame");
}

/// Record a completed dispatch.
pub fn record_dispatch(items: usize, elapsed: Duration) {
    counter!(DISPATCH_TOTAL).increment(1);
    counter!(ITEMS_TOTAL).increment(items as u64);
    histogram!(DISPATCH_DURATION_MS).record(elapsed.as_secs_f64() * 1000.0);
}

/// Record one contained item failure; `kind` is `"error"` or `"panic"`.
pub fn record_item_failure(kind: &'static str) {
    counter!(ITEM_FAILURES_TOTAL, "kind" => kind).increment(1);
}

pub fn record_worker_count(workers: usize) {
    gauge!(WORKERS).set(workers as f64);
}

pub fn record_throttling_ratio(ratio: f32) {
    gauge!(THROTTLING_RATIO).set(f64::from(ratio));
}
