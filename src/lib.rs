//! Frame Pool
//!
//! A per-frame worker pool for mixer-style servers: each frame, a batch of
//! participant updates is fanned out across a resizable set of worker
//! threads, and the caller blocks on a barrier until every worker has
//! drained the batch.
//!
//! # Design
//!
//! - **Queue**: one lock-free MPMC queue shared by all workers, so uneven
//!   per-item cost balances itself without work stealing.
//! - **Barrier**: one mutex, two condition variables; the lock is never held
//!   while an item is processed.
//! - **Job**: per-item work is a `FrameJob` composed into the pool by
//!   `Arc`, independent of thread lifecycle.
//! - **Resizing**: only between frames; shrinking joins removed threads
//!   before returning.
//!
//! ```no_run
//! use frame_pool::{FrameContext, FrameJob, FramePool, JobError, PoolConfig};
//!
//! struct Echo;
//!
//! impl FrameJob for Echo {
//!     type Item = u32;
//!     type Stats = u64;
//!
//!     fn process(&self, _: u32, _: &FrameContext, sent: &mut u64) -> Result<(), JobError> {
//!         *sent += 1;
//!         Ok(())
//!     }
//! }
//!
//! let mut pool = FramePool::new(PoolConfig::with_threads(4), Echo).unwrap();
//! pool.dispatch(0..100, 0.0).unwrap();
//! pool.for_each_worker(|mut w| println!("worker {} sent {}", w.id(), w.take_state()));
//! ```

pub mod config;
pub mod job;
pub mod pool;
pub mod telemetry;
pub mod throttle;

pub use job::{FrameContext, FrameJob, JobError};
pub use pool::{FramePool, PoolConfig, PoolError, WorkQueue, WorkerStats, WorkerView};
pub use throttle::LoadThrottle;
