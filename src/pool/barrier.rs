//! Cyclic start/finish barrier for a resizable worker set.
//!
//! `std::sync::Barrier` has a fixed party count, so the pool keeps its own:
//! one mutex guarding the frame state and three counters, one condition
//! variable workers park on, one the dispatcher parks on.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};

use super::error::PoolError;
use crate::job::FrameContext;

/// State guarded by the barrier mutex.
#[derive(Debug, Default)]
struct BarrierState {
    frame: u64,
    throttling_ratio: f32,
    started: usize,
    finished: usize,
    stopped: usize,
    outstanding: bool,
}

/// What a parked worker was woken for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Wake {
    Frame(FrameContext),
    Stop,
}

/// Start/finish barrier shared by the pool and its workers.
#[derive(Debug, Default)]
pub(crate) struct FrameBarrier {
    state: Mutex<BarrierState>,
    worker_cv: Condvar,
    pool_cv: Condvar,
}

impl FrameBarrier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current frame number (0 before the first dispatch).
    pub(crate) fn frame(&self) -> u64 {
        self.state.lock().frame
    }

    pub(crate) fn throttling_ratio(&self) -> f32 {
        self.state.lock().throttling_ratio
    }

    /// Fail unless the previous dispatch has fully completed.
    pub(crate) fn check_idle(&self) -> Result<(), PoolError> {
        let state = self.state.lock();
        if state.outstanding || state.started != state.finished {
            return Err(PoolError::DispatchOutstanding {
                started: state.started,
                finished: state.finished,
            });
        }
        Ok(())
    }

    // ---- worker side ----

    /// Park until a frame newer than `last_frame` is published or `stop` is
    /// raised. Claims a start slot when returning a frame.
    pub(crate) fn wait_for_frame(&self, last_frame: u64, stop: &AtomicBool) -> Wake {
        let mut state = self.state.lock();
        loop {
            // Stop flags are only raised under this lock.
            if stop.load(Ordering::Acquire) {
                return Wake::Stop;
            }
            if state.outstanding && state.frame != last_frame {
                state.started += 1;
                return Wake::Frame(FrameContext {
                    frame: state.frame,
                    throttling_ratio: state.throttling_ratio,
                });
            }
            self.worker_cv.wait(&mut state);
        }
    }

    /// Report that this worker drained the queue for the current frame.
    pub(crate) fn finish(&self) {
        {
            let mut state = self.state.lock();
            debug_assert!(state.finished < state.started);
            state.finished += 1;
        }
        self.pool_cv.notify_one();
    }

    /// Report that this worker left its loop for good.
    pub(crate) fn report_stopped(&self) {
        {
            let mut state = self.state.lock();
            state.stopped += 1;
        }
        self.pool_cv.notify_one();
    }

    // ---- pool side ----

    /// Publish a new frame and wake every parked worker.
    ///
    /// Caller must have checked `check_idle` and loaded the queue.
    pub(crate) fn begin_frame(&self, throttling_ratio: f32) -> u64 {
        let frame = {
            let mut state = self.state.lock();
            state.frame += 1;
            state.throttling_ratio = throttling_ratio;
            state.started = 0;
            state.finished = 0;
            state.outstanding = true;
            state.frame
        };
        self.worker_cv.notify_all();
        frame
    }

    /// Block until `workers` workers have finished the current frame.
    pub(crate) fn wait_finished(&self, workers: usize) {
        let mut state = self.state.lock();
        while state.finished < workers {
            self.pool_cv.wait(&mut state);
        }
        debug_assert_eq!(state.started, workers);
        state.outstanding = false;
    }

    /// Raise the given stop flags and wake every parked worker.
    pub(crate) fn signal_stop<'a, I>(&self, flags: I)
    where
        I: IntoIterator<Item = &'a AtomicBool>,
    {
        {
            let mut state = self.state.lock();
            state.stopped = 0;
            for flag in flags {
                flag.store(true, Ordering::Release);
            }
        }
        self.worker_cv.notify_all();
    }

    /// Block until `count` workers have reported stopped, then forget them.
    pub(crate) fn wait_stopped(&self, count: usize) {
        let mut state = self.state.lock();
        while state.stopped < count {
            self.pool_cv.wait(&mut state);
        }
        state.stopped = 0;
    }
}
