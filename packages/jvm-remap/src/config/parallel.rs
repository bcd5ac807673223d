//! Parallelism Configuration

use super::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Worker pool used for per-entry class rewriting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParallelConfig {
    /// Number of workers (0=auto, 1..=256)
    pub num_workers: usize,

    /// Thread stack size in MB (1..=64)
    pub stack_size_mb: usize,
}

impl ParallelConfig {
    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.num_workers > 256 {
            return Err(ConfigError::range_with_hint(
                "num_workers",
                self.num_workers,
                0,
                256,
                "Number of workers must be reasonable (0=auto)",
            ));
        }

        if self.stack_size_mb < 1 || self.stack_size_mb > 64 {
            return Err(ConfigError::range_with_hint(
                "stack_size_mb",
                self.stack_size_mb,
                1,
                64,
                "Stack size must be reasonable",
            ));
        }

        Ok(())
    }

    /// Single worker; output is identical either way.
    pub fn sequential() -> Self {
        Self {
            num_workers: 1,
            ..Self::default()
        }
    }

    /// Effective worker count (`0` resolves to the number of CPUs).
    pub fn workers(&self) -> usize {
        match self.num_workers {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }

    pub fn stack_size_bytes(&self) -> usize {
        self.stack_size_mb * 1024 * 1024
    }

    /// Dedicated pool so transforms never touch the global rayon pool.
    pub fn build_pool(&self) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers())
            .stack_size(self.stack_size_bytes())
            .thread_name(|i| format!("jvm-remap-worker-{}", i))
            .build()
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_workers: 0, // Auto
            stack_size_mb: 8,
        }
    }
}
