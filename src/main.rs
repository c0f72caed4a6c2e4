//! Frame pool simulator.
//!
//! Drives a `FramePool` the way a mixer drives it: every frame, each
//! connected participant's pending update is processed on the worker
//! threads, throttling follows load, and per-worker statistics are pulled
//! and reset between frames.
//!
//! ## CLI Subcommands
//!
//! - `frame-pool-sim` or `frame-pool-sim run` - Run the simulation (default)
//! - `frame-pool-sim config show` - Print effective configuration as JSON
//! - `frame-pool-sim config defaults` - Print documented defaults

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::Serialize;

use frame_pool::config::{self as fp_config, EnvConfig};
use frame_pool::telemetry::{init_logging, init_metrics};
use frame_pool::{
    FrameContext, FrameJob, FramePool, JobError, LoadThrottle, PoolError, WorkerStats,
};

/// One connected participant with a pending network update.
struct Participant {
    id: u32,
    /// Simulated processing cost of a full update.
    cost: Duration,
    /// Every so often a participant sends garbage.
    malformed: bool,
}

/// What each worker sent during the frames since the last report.
#[derive(Debug, Default, Clone, Serialize)]
struct MixStats {
    updates_sent: u64,
    bytes_sent: u64,
    throttled_updates: u64,
}

impl MixStats {
    fn merge(&mut self, other: &MixStats) {
        self.updates_sent += other.updates_sent;
        self.bytes_sent += other.bytes_sent;
        self.throttled_updates += other.throttled_updates;
    }
}

/// Simulated per-participant mix: spins for the participant's cost, scaled
/// down by the frame's throttling ratio.
struct SimulatedMix;

impl FrameJob for SimulatedMix {
    type Item = Arc<Participant>;
    type Stats = MixStats;

    fn process(
        &self,
        item: Arc<Participant>,
        ctx: &FrameContext,
        stats: &mut MixStats,
    ) -> Result<(), JobError> {
        if item.malformed {
            return Err(JobError::InvalidItem(format!("participant {}", item.id)));
        }

        let scale = 1.0 - f64::from(ctx.throttling_ratio);
        let budget = item.cost.mul_f64(scale.max(0.1));
        let start = Instant::now();
        while start.elapsed() < budget {
            std::hint::spin_loop();
        }

        stats.updates_sent += 1;
        stats.bytes_sent += (budget.as_micros() as u64).max(1) * 4;
        if ctx.throttling_ratio > 0.0 {
            stats.throttled_updates += 1;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize)]
struct WorkerReport {
    id: usize,
    /// Worker was removed by a resize before the run ended.
    retired: bool,
    stats: WorkerStats,
    mix: MixStats,
}

/// Fold every live worker's counters into `reports` and reset them.
fn harvest(pool: &mut FramePool<SimulatedMix>, reports: &mut BTreeMap<usize, WorkerReport>) {
    pool.for_each_worker(|mut worker| {
        let report = reports.entry(worker.id()).or_insert_with(|| WorkerReport {
            id: worker.id(),
            ..Default::default()
        });
        report.stats.merge(worker.stats());
        report.mix.merge(&worker.take_state());
        worker.reset_stats();
    });
}

/// Resize the pool, keeping the counters of any workers it removes.
fn resize(
    pool: &mut FramePool<SimulatedMix>,
    count: usize,
    reports: &mut BTreeMap<usize, WorkerReport>,
) -> Result<(), PoolError> {
    harvest(pool, reports);
    pool.set_worker_count(count)?;

    let mut live = Vec::with_capacity(count);
    pool.for_each_worker(|worker| live.push(worker.id()));
    for report in reports.values_mut() {
        if !live.contains(&report.id) {
            report.retired = true;
        }
    }
    Ok(())
}

struct RunArgs {
    frames: u64,
    participants: u32,
    config_path: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("run");

    match command {
        "run" | "" => match parse_run_args(&args[args.len().min(2)..]) {
            Ok(run_args) => run(run_args),
            Err(e) => {
                eprintln!("{}", e);
                print_usage();
                ExitCode::from(2u8)
            }
        },
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            match subcommand {
                "show" => match serde_json::to_string_pretty(&fp_config::load().effective_config()) {
                    Ok(json) => {
                        println!("{}", json);
                        ExitCode::SUCCESS
                    }
                    Err(e) => {
                        eprintln!("Failed to render config: {}", e);
                        ExitCode::FAILURE
                    }
                },
                "defaults" => {
                    print_defaults();
                    ExitCode::SUCCESS
                }
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_usage();
                    ExitCode::FAILURE
                }
            }
        }
        "help" | "--help" | "-h" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("frame-pool-sim {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn parse_run_args(args: &[String]) -> Result<RunArgs, String> {
    let mut run_args = RunArgs {
        frames: 200,
        participants: 64,
        config_path: None,
    };

    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| format!("Missing value for {}", flag))?;
        match flag.as_str() {
            "--frames" => {
                run_args.frames = value
                    .parse()
                    .map_err(|_| format!("Invalid --frames: {}", value))?;
            }
            "--participants" => {
                run_args.participants = value
                    .parse()
                    .map_err(|_| format!("Invalid --participants: {}", value))?;
            }
            "--config" => run_args.config_path = Some(PathBuf::from(value)),
            other => return Err(format!("Unknown option: {}", other)),
        }
    }
    Ok(run_args)
}

fn load_config(path: Option<&PathBuf>) -> Result<EnvConfig, String> {
    match path {
        Some(path) => fp_config::load_file(path).map_err(|e| e.to_string()),
        None => Ok(fp_config::load()),
    }
}

fn run(args: RunArgs) -> ExitCode {
    let config = match load_config(args.config_path.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2u8);
        }
    };

    if let Err(e) = init_logging(&config.log) {
        eprintln!("Logging init failed: {}", e);
        return ExitCode::from(2u8);
    }
    init_metrics();

    let participants = make_participants(args.participants);
    let mut throttle = LoadThrottle::new(config.target_frame);

    let mut pool = match FramePool::new(config.pool.clone(), SimulatedMix) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to start worker pool");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        workers = pool.worker_count(),
        participants = participants.len(),
        frames = args.frames,
        "simulation started"
    );

    let mut reports = BTreeMap::new();
    let full_size = pool.worker_count();
    for frame in 0..args.frames {
        // Halfway through, shed workers as a mixer would under CPU pressure.
        if frame == args.frames / 2 && full_size > 1 {
            if let Err(e) = resize(&mut pool, full_size / 2, &mut reports) {
                tracing::error!(error = %e, "resize failed");
                return ExitCode::FAILURE;
            }
            throttle.reset();
        }

        let start = Instant::now();
        if let Err(e) = pool.dispatch(participants.iter().cloned(), throttle.ratio()) {
            tracing::error!(error = %e, frame, "dispatch failed");
            return ExitCode::FAILURE;
        }
        throttle.record_frame(start.elapsed());
    }

    harvest(&mut pool, &mut reports);
    let reports: Vec<&WorkerReport> = reports.values().collect();

    match serde_json::to_string_pretty(&reports) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to render report: {}", e),
    }

    if let Err(e) = pool.shutdown() {
        tracing::error!(error = %e, "shutdown failed");
        return ExitCode::FAILURE;
    }
    tracing::info!(final_ratio = throttle.ratio(), "simulation finished");
    ExitCode::SUCCESS
}

fn make_participants(count: u32) -> Vec<Arc<Participant>> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|id| {
            Arc::new(Participant {
                id,
                cost: Duration::from_micros(rng.gen_range(50..800)),
                malformed: rng.gen_ratio(1, 50),
            })
        })
        .collect()
}

fn print_defaults() {
    println!("FRAME_POOL_THREADS=0");
    println!("FRAME_POOL_MAX_WORKERS=256");
    println!("FRAME_POOL_STACK_SIZE=2097152");
    println!("FRAME_POOL_THREAD_PREFIX=frame-worker");
    println!("FRAME_POOL_TARGET_FRAME_MS=20");
    println!("FRAME_POOL_LOG_LEVEL=info");
    println!("FRAME_POOL_LOG_FORMAT=json");
    println!("FRAME_POOL_LOG_FILE=");
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "frame-pool-sim v{}

USAGE:
    frame-pool-sim [COMMAND] [OPTIONS]

COMMANDS:
    run          Run the mixer simulation (default)
    config       Show configuration (show, defaults)
    version      Show version information
    help         Show this help message

RUN OPTIONS:
    --frames N        Frames to dispatch (default: 200)
    --participants N  Simulated participants (default: 64)
    --config PATH     TOML config file; FRAME_POOL_* env vars override it
                      (FRAME_POOL_LOG_FILE sends logs to a file)",
        version
    );
}
