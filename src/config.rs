//! Configuration loading from environment variables and TOML files.
//!
//! Values come from `FRAME_POOL_*` environment variables, optionally layered
//! over a TOML file. Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `FRAME_POOL_THREADS` | 0 | Worker threads (0 = auto) |
//! | `FRAME_POOL_MAX_WORKERS` | 256 | Upper bound for resizing |
//! | `FRAME_POOL_STACK_SIZE` | 2097152 | Worker stack size (bytes) |
//! | `FRAME_POOL_THREAD_PREFIX` | frame-worker | Worker thread name prefix |
//! | `FRAME_POOL_TARGET_FRAME_MS` | 20 | Frame budget for load throttling |
//! | `FRAME_POOL_LOG_LEVEL` | info | Log filter |
//! | `FRAME_POOL_LOG_FORMAT` | json | `json` or `pretty` |
//! | `FRAME_POOL_LOG_FILE` | (stderr) | Write logs to this file instead |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pool::{PoolConfig, DEFAULT_MAX_WORKERS};
use crate::telemetry::{LogConfig, LogFormat};

const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
const MIN_STACK_SIZE: usize = 64 * 1024;
const DEFAULT_TARGET_FRAME_MS: u64 = 20;

/// Errors reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid config file: {0}")]
    Parse(String),
}

/// Optional settings read from a TOML file. Missing keys keep defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub threads: Option<usize>,
    pub max_workers: Option<usize>,
    pub stack_size: Option<usize>,
    pub thread_prefix: Option<String>,
    pub target_frame_ms: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Effective configuration summary (serializable).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EffectiveConfig {
    pub threads: usize,
    pub max_workers: usize,
    pub stack_size: usize,
    pub thread_prefix: String,
    pub target_frame_ms: u64,
    pub log_level: String,
    pub log_format: String,
    pub log_file: Option<String>,
}

/// All configuration after env overrides.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub pool: PoolConfig,
    pub target_frame: Duration,
    pub log: LogConfig,
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_string(key: &str, default: String) -> String {
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val.trim().to_string(),
        _ => default,
    }
}

fn load_pool_config(file: &FileConfig) -> PoolConfig {
    let max_workers = parse_usize(
        "FRAME_POOL_MAX_WORKERS",
        file.max_workers.unwrap_or(DEFAULT_MAX_WORKERS),
    );
    let max_workers = max_workers.max(1);
    let threads = parse_usize("FRAME_POOL_THREADS", file.threads.unwrap_or(0));
    let threads = threads.min(max_workers);
    let stack_size = parse_usize(
        "FRAME_POOL_STACK_SIZE",
        file.stack_size.unwrap_or(DEFAULT_STACK_SIZE),
    );
    let stack_size = stack_size.max(MIN_STACK_SIZE); // floor: 64 KiB
    let prefix = parse_string(
        "FRAME_POOL_THREAD_PREFIX",
        file.thread_prefix.clone().unwrap_or_else(|| "frame-worker".to_string()),
    );

    PoolConfig {
        worker_threads: threads,
        max_workers,
        stack_size,
        thread_name_prefix: prefix,
    }
}

fn load_log_config(file: &FileConfig) -> LogConfig {
    let level = parse_string(
        "FRAME_POOL_LOG_LEVEL",
        file.log_level.clone().unwrap_or_else(|| "info".to_string()),
    );
    let format = parse_string(
        "FRAME_POOL_LOG_FORMAT",
        file.log_format.clone().unwrap_or_else(|| "json".to_string()),
    );
    let output_path = match std::env::var("FRAME_POOL_LOG_FILE") {
        Ok(val) if !val.trim().is_empty() => Some(PathBuf::from(val.trim())),
        _ => file.log_file.clone(),
    };
    LogConfig {
        format: format.parse::<LogFormat>().unwrap_or_default(),
        level,
        output_path,
        ..Default::default()
    }
}

fn load_layered(file: &FileConfig) -> EnvConfig {
    let target_ms = parse_u64(
        "FRAME_POOL_TARGET_FRAME_MS",
        file.target_frame_ms.unwrap_or(DEFAULT_TARGET_FRAME_MS),
    );
    let target_ms = target_ms.max(1);

    EnvConfig {
        pool: load_pool_config(file),
        target_frame: Duration::from_millis(target_ms),
        log: load_log_config(file),
    }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    load_layered(&FileConfig::default())
}

/// Load a TOML file, then apply environment overrides on top.
pub fn load_file(path: &Path) -> Result<EnvConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let file = FileConfig::from_toml(&text)?;
    Ok(load_layered(&file))
}

impl EnvConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            threads: self.pool.resolved_threads(),
            max_workers: self.pool.max_workers,
            stack_size: self.pool.stack_size,
            thread_prefix: self.pool.thread_name_prefix.clone(),
            target_frame_ms: self.target_frame.as_millis() as u64,
            log_level: self.log.level.clone(),
            log_format: self.log.format.as_str().to_string(),
            log_file: self
                .log
                .output_path
                .as_ref()
                .map(|p| p.display().to_string()),
        }
    }
}
