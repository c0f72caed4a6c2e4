//! Worker pool configuration.

/// Default cap on the number of workers a pool may be resized to.
pub const DEFAULT_MAX_WORKERS: usize = 256;

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Number of worker threads (0 = auto-detect).
    pub worker_threads: usize,
    /// Upper bound accepted by `set_worker_count`.
    pub max_workers: usize,
    /// Stack size per thread in bytes (0 = platform default).
    pub stack_size: usize,
    /// Thread name prefix; workers are named `{prefix}-{id}`.
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0, // Auto-detect
            max_workers: DEFAULT_MAX_WORKERS,
            stack_size: 2 * 1024 * 1024, // 2MB
            thread_name_prefix: "frame-worker".to_string(),
        }
    }
}

impl PoolConfig {
    /// Create config with specific thread count.
    pub fn with_threads(count: usize) -> Self {
        Self {
            worker_threads: count,
            ..Default::default()
        }
    }

    /// Config for a mixer that shares the machine with a network thread:
    /// one core is left to the caller.
    pub fn for_mixer() -> Self {
        let cores = num_cpus::get();
        Self {
            worker_threads: cores.saturating_sub(1).max(1),
            ..Default::default()
        }
    }

    /// Worker count the pool starts with.
    pub fn resolved_threads(&self) -> usize {
        let threads = if self.worker_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.worker_threads
        };
        threads.min(self.max_workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_detect_is_nonzero() {
        let config = PoolConfig::default();
        assert_eq!(config.worker_threads, 0);
        assert!(config.resolved_threads() >= 1);
    }

    #[test]
    fn test_explicit_threads_respected() {
        assert_eq!(PoolConfig::with_threads(3).resolved_threads(), 3);
    }

    #[test]
    fn test_resolved_threads_capped() {
        let config = PoolConfig {
            worker_threads: 1000,
            max_workers: 8,
            ..Default::default()
        };
        assert_eq!(config.resolved_threads(), 8);
    }

    #[test]
    fn test_mixer_preset_leaves_a_core() {
        let config = PoolConfig::for_mixer();
        assert!(config.worker_threads >= 1);
        assert!(config.worker_threads <= num_cpus::get().max(1));
    }
}
