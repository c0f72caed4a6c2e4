//! Per-frame worker pool.
//!
//! The pool owns a lock-free work queue and a resizable set of worker
//! threads. Each `dispatch` loads the queue, publishes a new frame, wakes
//! every worker, and blocks until all of them have drained the queue.
//!
//! A `FramePool` is driven from a single thread: `dispatch`,
//! `set_worker_count` and `for_each_worker` all take `&mut self`, so none of
//! them can overlap an outstanding frame.

mod barrier;
mod config;
mod error;
mod queue;
mod worker;

use std::sync::Arc;
use std::time::Instant;

use tracing::Span;

use crate::job::FrameJob;
use crate::telemetry::{self, FrameSpan, SpanExt};
use barrier::FrameBarrier;
use worker::Worker;

pub use config::{PoolConfig, DEFAULT_MAX_WORKERS};
pub use error::PoolError;
pub use queue::WorkQueue;
pub use worker::{WorkerStats, WorkerView};

/// State shared between the pool and its workers.
pub(crate) struct Shared<T> {
    pub(crate) queue: WorkQueue<T>,
    pub(crate) barrier: FrameBarrier,
}

/// Resizable worker pool that processes one frame of items per `dispatch`.
pub struct FramePool<J: FrameJob> {
    config: PoolConfig,
    job: Arc<J>,
    shared: Arc<Shared<J::Item>>,
    workers: Vec<Worker<J::Stats>>,
    next_worker_id: usize,
}

impl<J: FrameJob> FramePool<J> {
    /// Create a pool sized by `config` (auto-detected when `worker_threads`
    /// is 0).
    pub fn new(config: PoolConfig, job: J) -> Result<Self, PoolError> {
        Self::with_shared_job(config, Arc::new(job))
    }

    /// Create a pool around a job the caller also keeps a handle to.
    pub fn with_shared_job(config: PoolConfig, job: Arc<J>) -> Result<Self, PoolError> {
        let threads = config.resolved_threads();
        let mut pool = Self {
            config,
            job,
            shared: Arc::new(Shared {
                queue: WorkQueue::new(),
                barrier: FrameBarrier::new(),
            }),
            workers: Vec::with_capacity(threads),
            next_worker_id: 0,
        };
        pool.set_worker_count(threads)?;
        Ok(pool)
    }

    /// Number of live workers.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Last dispatched frame number (0 before the first dispatch).
    pub fn frame(&self) -> u64 {
        self.shared.barrier.frame()
    }

    /// Throttling ratio of the last dispatched frame.
    pub fn throttling_ratio(&self) -> f32 {
        self.shared.barrier.throttling_ratio()
    }

    /// Items currently sitting in the queue. Zero between frames.
    pub fn pending_items(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Resize the worker set to exactly `count` workers.
    ///
    /// Shrinking stops the most recently added workers and joins them before
    /// returning. Rejected while a dispatch is outstanding.
    pub fn set_worker_count(&mut self, count: usize) -> Result<(), PoolError> {
        if count > self.config.max_workers {
            return Err(PoolError::TooManyWorkers {
                requested: count,
                max: self.config.max_workers,
            });
        }
        self.shared.barrier.check_idle()?;

        let current = self.workers.len();
        if count == current {
            return Ok(());
        }

        if count > current {
            self.grow(count)?;
        } else {
            self.shrink(count);
        }

        tracing::info!(from = current, to = count, "worker pool resized");
        telemetry::record_worker_count(self.workers.len());
        Ok(())
    }

    fn grow(&mut self, count: usize) -> Result<(), PoolError> {
        let frame = self.shared.barrier.frame();
        while self.workers.len() < count {
            let worker = Worker::spawn(
                self.next_worker_id,
                &self.config,
                self.shared.clone(),
                self.job.clone(),
                frame,
            )
            .map_err(|e| {
                tracing::error!(error = %e, live = self.workers.len(), "worker spawn failed");
                telemetry::record_worker_count(self.workers.len());
                e
            })?;
            self.next_worker_id += 1;
            self.workers.push(worker);
        }
        Ok(())
    }

    fn shrink(&mut self, count: usize) {
        let removed = self.workers.split_off(count);
        self.shared
            .barrier
            .signal_stop(removed.iter().map(|w| w.stop_flag()));
        self.shared.barrier.wait_stopped(removed.len());

        for worker in removed {
            tracing::debug!(worker = worker.id(), "joining stopped worker");
            worker.join();
        }
    }

    /// Run one frame: process every item on the worker threads and return
    /// once all workers have drained the queue.
    ///
    /// `throttling_ratio` must lie in `[0, 1]`; it is handed unchanged to
    /// the frame job for every item of this frame.
    pub fn dispatch<I>(&mut self, items: I, throttling_ratio: f32) -> Result<(), PoolError>
    where
        I: IntoIterator<Item = J::Item>,
    {
        let span = FrameSpan::new(self.workers.len());
        let _enter = span.enter();

        let result = self.run_frame(items, throttling_ratio, &span);
        span.record_result(&result);
        result
    }

    fn run_frame<I>(&mut self, items: I, throttling_ratio: f32, span: &Span) -> Result<(), PoolError>
    where
        I: IntoIterator<Item = J::Item>,
    {
        if !(0.0..=1.0).contains(&throttling_ratio) {
            return Err(PoolError::InvalidThrottlingRatio(throttling_ratio));
        }
        if self.workers.is_empty() {
            return Err(PoolError::NoWorkers);
        }
        self.shared.barrier.check_idle()?;

        let start = Instant::now();
        let workers = self.workers.len();

        // Drain the caller's iterator before touching the queue: if it
        // panics, nothing from this frame is left behind for the next one.
        let batch: Vec<J::Item> = items.into_iter().collect();
        let count = batch.len();
        for item in batch {
            self.shared.queue.push(item);
        }

        let frame = self.shared.barrier.begin_frame(throttling_ratio);
        self.shared.barrier.wait_finished(workers);
        debug_assert!(self.shared.queue.is_empty());

        let elapsed = start.elapsed();
        span.record("frame", frame);
        span.record("items", count);
        span.record("latency_ms", elapsed.as_secs_f64() * 1000.0);
        tracing::debug!(frame, items = count, workers, "frame dispatched");
        telemetry::record_dispatch(count, elapsed);
        telemetry::record_throttling_ratio(throttling_ratio);
        Ok(())
    }

    /// Call `f` once per live worker, in spawn order.
    pub fn for_each_worker<F>(&mut self, mut f: F)
    where
        F: FnMut(WorkerView<'_, J::Stats>),
    {
        for worker in &self.workers {
            worker.with_view(&mut f);
        }
    }

    /// Sum of the pool-maintained statistics across all live workers.
    pub fn total_stats(&mut self) -> WorkerStats {
        let mut total = WorkerStats::default();
        self.for_each_worker(|view| total.merge(view.stats()));
        total
    }

    /// Stop and join every worker. Safe to call more than once.
    pub fn shutdown(&mut self) -> Result<(), PoolError> {
        self.set_worker_count(0)
    }
}

impl<J: FrameJob> Drop for FramePool<J> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!(error = %e, "frame pool teardown failed");
        }
    }
}
