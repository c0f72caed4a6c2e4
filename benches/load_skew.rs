//! Load skew benchmarks.
//!
//! Items with uneven cost: the shared queue should keep every worker busy
//! until the frame drains.

use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use frame_pool::{FrameContext, FrameJob, FramePool, JobError, PoolConfig};

/// Spins for `item` microseconds.
struct SpinJob;

impl FrameJob for SpinJob {
    type Item = u64;
    type Stats = ();

    fn process(&self, item: u64, _: &FrameContext, _: &mut ()) -> Result<(), JobError> {
        let budget = Duration::from_micros(item);
        let start = Instant::now();
        while start.elapsed() < budget {
            std::hint::spin_loop();
        }
        Ok(())
    }
}

fn skewed_costs() -> Vec<u64> {
    // A few heavy participants among many light ones.
    (0..64u64).map(|i| if i % 16 == 0 { 400 } else { 10 + i }).collect()
}

fn bench_skewed_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("skewed_frame");
    group.sample_size(30);
    let costs = skewed_costs();

    for workers in [1, 2, 4] {
        let mut pool = FramePool::new(PoolConfig::with_threads(workers), SpinJob).expect("pool");
        group.bench_function(BenchmarkId::new("workers", workers), |b| {
            b.iter(|| pool.dispatch(costs.iter().copied(), 0.0).expect("dispatch"))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_skewed_frame);
criterion_main!(benches);
