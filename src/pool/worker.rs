//! Worker threads: park, drain the shared queue for one frame, report back.
//!
//! A worker owns nothing the pool depends on for lifetime. It holds the
//! shared queue/barrier and the job by `Arc`, and the pool joins it before
//! releasing its slot.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use super::barrier::Wake;
use super::config::PoolConfig;
use super::error::PoolError;
use super::Shared;
use crate::job::{FrameContext, FrameJob};
use crate::telemetry;

/// Statistics the pool keeps for every worker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// Frames this worker woke up for.
    pub frames: u64,
    pub items_processed: u64,
    /// Items whose job returned an error or panicked.
    pub items_failed: u64,
    /// Time spent draining the queue, in microseconds.
    pub busy_time_us: u64,
}

impl WorkerStats {
    /// Add another worker's (or another period's) counters to this one.
    pub fn merge(&mut self, other: &WorkerStats) {
        self.frames += other.frames;
        self.items_processed += other.items_processed;
        self.items_failed += other.items_failed;
        self.busy_time_us += other.busy_time_us;
    }

    fn record_frame(&mut self, processed: u64, failed: u64, busy: Duration) {
        self.frames += 1;
        self.items_processed += processed;
        self.items_failed += failed;
        self.busy_time_us += busy.as_micros() as u64;
    }
}

/// Worker-private data, locked by the worker for the length of a frame and
/// by the pool only between frames.
pub(crate) struct WorkerLocal<S> {
    pub(crate) stats: WorkerStats,
    pub(crate) state: S,
}

/// Mutable view of one worker handed out by `FramePool::for_each_worker`.
pub struct WorkerView<'a, S> {
    id: usize,
    stats: &'a mut WorkerStats,
    state: &'a mut S,
}

impl<'a, S> WorkerView<'a, S> {
    /// Stable id assigned when the worker was spawned.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn stats(&self) -> &WorkerStats {
        &*self.stats
    }

    pub fn reset_stats(&mut self) {
        *self.stats = WorkerStats::default();
    }

    /// The frame job's per-worker statistics.
    pub fn state(&self) -> &S {
        &*self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut *self.state
    }

    /// Return the job statistics and replace them with defaults.
    pub fn take_state(&mut self) -> S
    where
        S: Default,
    {
        std::mem::take(&mut *self.state)
    }
}

/// Pool-side handle of a worker thread.
pub(crate) struct Worker<S> {
    id: usize,
    stop: Arc<AtomicBool>,
    local: Arc<Mutex<WorkerLocal<S>>>,
    handle: Option<JoinHandle<()>>,
}

impl<S: Default + Send + 'static> Worker<S> {
    /// Spawn a worker thread parked until the frame after `current_frame`.
    pub(crate) fn spawn<J>(
        id: usize,
        config: &PoolConfig,
        shared: Arc<Shared<J::Item>>,
        job: Arc<J>,
        current_frame: u64,
    ) -> Result<Self, PoolError>
    where
        J: FrameJob<Stats = S>,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let local = Arc::new(Mutex::new(WorkerLocal {
            stats: WorkerStats::default(),
            state: S::default(),
        }));

        let mut builder = thread::Builder::new().name(format!("{}-{}", config.thread_name_prefix, id));
        if config.stack_size > 0 {
            builder = builder.stack_size(config.stack_size);
        }

        let stop_clone = stop.clone();
        let local_clone = local.clone();
        let handle = builder
            .spawn(move || {
                run_loop(id, &shared, job.as_ref(), &stop_clone, &local_clone, current_frame);
            })
            .map_err(|e| PoolError::ThreadSpawnFailed(e.to_string()))?;

        Ok(Self {
            id,
            stop,
            local,
            handle: Some(handle),
        })
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn stop_flag(&self) -> &AtomicBool {
        &self.stop
    }

    /// Lock the worker's data and run `f` on a view of it.
    pub(crate) fn with_view<R>(&self, f: impl FnOnce(WorkerView<'_, S>) -> R) -> R {
        let mut guard = self.local.lock();
        let local = &mut *guard;
        f(WorkerView {
            id: self.id,
            stats: &mut local.stats,
            state: &mut local.state,
        })
    }

    /// Join the thread. Only valid once the worker has reported stopped.
    pub(crate) fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(worker = self.id, "worker thread panicked outside item processing");
            }
        }
    }
}

/// Worker thread main loop.
fn run_loop<J: FrameJob>(
    id: usize,
    shared: &Shared<J::Item>,
    job: &J,
    stop: &AtomicBool,
    local: &Mutex<WorkerLocal<J::Stats>>,
    mut last_frame: u64,
) {
    tracing::debug!(worker = id, "worker started");

    loop {
        let ctx = match shared.barrier.wait_for_frame(last_frame, stop) {
            Wake::Stop => {
                tracing::debug!(worker = id, "worker stopping");
                shared.barrier.report_stopped();
                return;
            }
            Wake::Frame(ctx) => ctx,
        };
        last_frame = ctx.frame;

        let start = Instant::now();
        let (processed, failed) = {
            let mut guard = local.lock();
            let (processed, failed) = drain(id, shared, job, &ctx, &mut guard.state);
            guard.stats.record_frame(processed, failed, start.elapsed());
            (processed, failed)
        };

        tracing::trace!(worker = id, frame = ctx.frame, processed, failed, "worker finished frame");
        shared.barrier.finish();
    }
}

/// Pop and process items until the queue is empty.
///
/// Returns `(processed, failed)`. Job errors and panics are contained here.
fn drain<J: FrameJob>(
    id: usize,
    shared: &Shared<J::Item>,
    job: &J,
    ctx: &FrameContext,
    stats: &mut J::Stats,
) -> (u64, u64) {
    let mut processed = 0u64;
    let mut failed = 0u64;

    while let Some(item) = shared.queue.try_pop() {
        processed += 1;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.process(item, ctx, stats)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                failed += 1;
                telemetry::record_item_failure("error");
                if e.is_warning() {
                    tracing::warn!(worker = id, frame = ctx.frame, error = %e, "frame job failed");
                } else {
                    tracing::debug!(worker = id, frame = ctx.frame, error = %e, "frame job skipped item");
                }
            }
            Err(payload) => {
                failed += 1;
                telemetry::record_item_failure("panic");
                tracing::error!(
                    worker = id,
                    frame = ctx.frame,
                    panic = %panic_message(payload.as_ref()),
                    "frame job panicked"
                );
            }
        }
    }

    (processed, failed)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
