//! Load-driven throttling ratio.
//!
//! The pool treats the ratio as opaque; callers compute it between frames
//! and pass it to `FramePool::dispatch`. `LoadThrottle` derives it from a
//! trailing average of frame durations against a frame budget: no
//! throttling while frames fit the budget, rising toward 1 as they overrun.

use std::time::Duration;

/// Default weight given to the newest frame in the trailing average.
pub const DEFAULT_SMOOTHING: f64 = 0.1;

/// Computes a throttling ratio in `[0, 1]` from recent frame durations.
#[derive(Debug, Clone)]
pub struct LoadThrottle {
    target: Duration,
    smoothing: f64,
    trailing_ms: Option<f64>,
    ratio: f32,
}

impl LoadThrottle {
    /// Create a throttle for the given frame budget.
    pub fn new(target: Duration) -> Self {
        Self::with_smoothing(target, DEFAULT_SMOOTHING)
    }

    /// `smoothing` is clamped to `(0, 1]`; 1 reacts to the last frame only.
    pub fn with_smoothing(target: Duration, smoothing: f64) -> Self {
        let smoothing = if smoothing.is_finite() {
            smoothing.clamp(f64::EPSILON, 1.0)
        } else {
            DEFAULT_SMOOTHING
        };
        Self {
            target,
            smoothing,
            trailing_ms: None,
            ratio: 0.0,
        }
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    /// Ratio computed after the last recorded frame.
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Trailing average frame time, if any frame was recorded.
    pub fn trailing_frame_time(&self) -> Option<Duration> {
        self.trailing_ms
            .map(|ms| Duration::from_secs_f64(ms / 1000.0))
    }

    /// Fold one frame's duration into the average and return the new ratio.
    pub fn record_frame(&mut self, elapsed: Duration) -> f32 {
        let sample = elapsed.as_secs_f64() * 1000.0;
        let trailing = match self.trailing_ms {
            Some(prev) => prev + self.smoothing * (sample - prev),
            None => sample,
        };
        self.trailing_ms = Some(trailing);

        let target = self.target.as_secs_f64() * 1000.0;
        self.ratio = if target <= 0.0 {
            0.0
        } else if trailing <= target {
            0.0
        } else {
            (1.0 - target / trailing).clamp(0.0, 1.0) as f32
        };
        self.ratio
    }

    /// Forget history, e.g. after the worker count changed.
    pub fn reset(&mut self) {
        self.trailing_ms = None;
        self.ratio = 0.0;
    }
}
