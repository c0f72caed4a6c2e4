//! Per-item frame job capability.
//!
//! A `FrameJob` is the only thing a worker knows about the data it moves.
//! The pool hands every dequeued item to `process` together with the
//! frame context and the calling worker's private statistics.

use thiserror::Error;

/// Frame-wide values captured by a worker when it wakes for a frame.
///
/// Both fields are fixed for the whole frame; the pool only changes them
/// inside the next `dispatch`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Monotonically increasing frame number, starting at 1.
    pub frame: u64,
    /// Load throttling ratio in `[0, 1]`; 0 means no throttling.
    pub throttling_ratio: f32,
}

/// Errors a frame job reports for a single item.
///
/// Workers log and count these; they never abort the frame.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Item processing failed: {0}")]
    Failed(String),
}

impl JobError {
    /// Returns true if this error should be logged as a warning rather than
    /// at debug level.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Caller-supplied per-item operation run on the pool's worker threads.
pub trait FrameJob: Send + Sync + 'static {
    /// Work item handle, usually a cheap clone such as `Arc<Participant>`.
    type Item: Send + 'static;

    /// Per-worker aggregate state, read and reset via `for_each_worker`.
    type Stats: Default + Send + 'static;

    /// Process one item for the given frame.
    ///
    /// Called concurrently from every worker; items arrive in no particular
    /// order.
    fn process(
        &self,
        item: Self::Item,
        ctx: &FrameContext,
        stats: &mut Self::Stats,
    ) -> Result<(), JobError>;
}
