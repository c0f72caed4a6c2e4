//! Span utilities and extension traits for frame pool tracing.

use tracing::{info_span, Span};

/// Extension trait for adding context to spans.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Factory for per-frame dispatch spans.
pub struct FrameSpan;

impl FrameSpan {
    /// Create a dispatch span.
    ///
    /// `frame`, `items`, `latency_ms`, `status` and `error.message` start
    /// empty and are filled in as the dispatch progresses.
    pub fn new(workers: usize) -> Span {
        info_span!(
            "frame_dispatch",
            workers = workers,
            frame = tracing::field::Empty,
            items = tracing::field::Empty,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    }
}
