//! Worker set resizing tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use frame_pool::{FrameContext, FrameJob, FramePool, JobError, PoolConfig, PoolError};

/// Counts drops of per-worker job state. Only `removed_workers_are_joined`
/// uses this job, so the static is not shared between tests.
static STATE_DROPS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct TrackedState {
    items: u64,
}

impl Drop for TrackedState {
    fn drop(&mut self) {
        STATE_DROPS.fetch_add(1, Ordering::SeqCst);
    }
}

struct TrackedJob;

impl FrameJob for TrackedJob {
    type Item = u32;
    type Stats = TrackedState;

    fn process(&self, _: u32, _: &FrameContext, stats: &mut TrackedState) -> Result<(), JobError> {
        stats.items += 1;
        Ok(())
    }
}

#[derive(Default)]
struct CountJob {
    seen: AtomicUsize,
}

impl FrameJob for CountJob {
    type Item = u32;
    type Stats = u64;

    fn process(&self, _: u32, _: &FrameContext, stats: &mut u64) -> Result<(), JobError> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        *stats += 1;
        Ok(())
    }
}

fn reachable<J: FrameJob>(pool: &mut FramePool<J>) -> Vec<usize> {
    let mut ids = Vec::new();
    pool.for_each_worker(|view| ids.push(view.id()));
    ids
}

#[test]
fn grow_and_shrink_change_reachable_workers() {
    let mut pool = FramePool::new(PoolConfig::with_threads(2), CountJob::default()).unwrap();
    assert_eq!(reachable(&mut pool), vec![0, 1]);

    pool.set_worker_count(5).unwrap();
    assert_eq!(pool.worker_count(), 5);
    assert_eq!(reachable(&mut pool), vec![0, 1, 2, 3, 4]);

    // Most recently added workers go first.
    pool.set_worker_count(3).unwrap();
    assert_eq!(reachable(&mut pool), vec![0, 1, 2]);

    // Ids are never reused.
    pool.set_worker_count(4).unwrap();
    assert_eq!(reachable(&mut pool), vec![0, 1, 2, 5]);
}

#[test]
fn removed_workers_are_joined() {
    let mut pool = FramePool::new(PoolConfig::with_threads(5), TrackedJob).unwrap();
    pool.dispatch(0..100u32, 0.0).unwrap();
    assert_eq!(STATE_DROPS.load(Ordering::SeqCst), 0);

    pool.set_worker_count(2).unwrap();
    // Joined threads have released their state by the time resize returns.
    assert_eq!(STATE_DROPS.load(Ordering::SeqCst), 3);

    let mut remaining = 0;
    pool.for_each_worker(|view| remaining += view.state().items);
    assert!(remaining <= 100);

    pool.dispatch(0..10u32, 0.0).unwrap();
    drop(pool);
    assert_eq!(STATE_DROPS.load(Ordering::SeqCst), 5);
}

#[test]
fn same_count_is_noop() {
    let mut pool = FramePool::new(PoolConfig::with_threads(3), CountJob::default()).unwrap();
    pool.set_worker_count(3).unwrap();
    assert_eq!(reachable(&mut pool), vec![0, 1, 2]);
}

#[test]
fn workers_added_after_frames_join_next_frame() {
    let mut pool = FramePool::new(PoolConfig::with_threads(1), CountJob::default()).unwrap();
    for _ in 0..3 {
        pool.dispatch(0..10u32, 0.0).unwrap();
    }

    pool.set_worker_count(4).unwrap();
    pool.dispatch(0..400u32, 0.0).unwrap();
    assert_eq!(pool.job().seen.load(Ordering::SeqCst), 430);

    // New workers skip frames dispatched before they existed.
    let mut frames = Vec::new();
    pool.for_each_worker(|view| frames.push(view.stats().frames));
    assert_eq!(frames, vec![4, 1, 1, 1]);
}

#[test]
fn shrink_to_one_then_dispatch() {
    let mut pool = FramePool::new(PoolConfig::with_threads(4), CountJob::default()).unwrap();
    pool.dispatch(0..40u32, 0.0).unwrap();
    pool.set_worker_count(1).unwrap();
    pool.dispatch(0..40u32, 0.0).unwrap();
    assert_eq!(pool.job().seen.load(Ordering::SeqCst), 80);

    let mut sole = 0;
    pool.for_each_worker(|view| sole = view.stats().frames);
    assert_eq!(sole, 2);
}

#[test]
fn shutdown_is_idempotent() {
    let mut pool = FramePool::new(PoolConfig::with_threads(3), CountJob::default()).unwrap();
    pool.dispatch(0..9u32, 0.0).unwrap();

    pool.shutdown().unwrap();
    assert_eq!(pool.worker_count(), 0);
    pool.shutdown().unwrap();
    assert_eq!(pool.worker_count(), 0);
    assert_eq!(pool.dispatch(0..1u32, 0.0), Err(PoolError::NoWorkers));
}

#[test]
fn resize_beyond_cap_rejected() {
    let config = PoolConfig {
        worker_threads: 2,
        max_workers: 4,
        ..Default::default()
    };
    let mut pool = FramePool::new(config, CountJob::default()).unwrap();
    let err = pool.set_worker_count(8).unwrap_err();
    assert!(err.is_misuse());
    assert_eq!(pool.worker_count(), 2);
}

#[test]
fn repeated_resizing_does_not_leak_or_hang() {
    let mut pool = FramePool::new(PoolConfig::with_threads(1), CountJob::default()).unwrap();
    let start = Instant::now();
    for round in 0..50u32 {
        pool.set_worker_count((round % 6 + 1) as usize).unwrap();
        pool.dispatch(0..20u32, 0.0).unwrap();
    }
    assert_eq!(pool.job().seen.load(Ordering::SeqCst), 1000);
    assert!(start.elapsed() < Duration::from_secs(30));
}
