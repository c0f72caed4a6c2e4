//! Telemetry for the frame pool.
//!
//! Provides structured logging, per-frame tracing spans, and metrics.

mod logging;
mod metrics;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{
    init_metrics, record_dispatch, record_item_failure, record_throttling_ratio,
    record_worker_count, DISPATCH_DURATION_MS, DISPATCH_TOTAL, ITEMS_TOTAL, ITEM_FAILURES_TOTAL,
    THROTTLING_RATIO, WORKERS,
};
pub use spans::{FrameSpan, SpanExt};
