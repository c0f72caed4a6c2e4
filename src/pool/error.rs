//! Pool error types.
//!
//! Every variant is a caller precondition violation or a resource failure;
//! none is returned after counters have been touched.

use thiserror::Error;

/// Errors for frame pool operations.
#[derive(Debug, Error, PartialEq)]
pub enum PoolError {
    #[error("Pool has no workers; dispatch would never complete")]
    NoWorkers,

    #[error("Dispatch outstanding: {started} started, {finished} finished")]
    DispatchOutstanding { started: usize, finished: usize },

    #[error("Throttling ratio must be within [0, 1], got {0}")]
    InvalidThrottlingRatio(f32),

    #[error("Requested {requested} workers, limit is {max}")]
    TooManyWorkers { requested: usize, max: usize },

    #[error("Failed to spawn worker thread: {0}")]
    ThreadSpawnFailed(String),
}

impl PoolError {
    /// Returns true if the error is a caller contract violation rather than
    /// an OS resource failure.
    pub fn is_misuse(&self) -> bool {
        !matches!(self, Self::ThreadSpawnFailed(_))
    }
}
