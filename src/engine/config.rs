// src/engine/config.rs
//
// Engine configuration: worker count and pool drain timeout.
// Defaults can be overridden from the environment.

use crate::engine::pool;
use std::time::Duration;
use tracing::warn;

/// Worker count override (0 = detect)
pub const THREADS_ENV: &str = "BRIGHTEN_THREADS";

/// Worker-pool drain timeout override, in milliseconds
pub const POOL_TIMEOUT_ENV: &str = "BRIGHTEN_POOL_TIMEOUT_MS";

/// Default bound on waiting for the worker pool to drain.
pub const DEFAULT_POOL_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// `None` detects available parallelism.
    pub workers: Option<usize>,
    pub pool_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: None,
            pool_timeout: DEFAULT_POOL_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `BRIGHTEN_THREADS` / `BRIGHTEN_POOL_TIMEOUT_MS`.
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(THREADS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(0) => config.workers = None,
                Ok(n) => config.workers = Some(n),
                Err(_) => warn!(var = THREADS_ENV, value = %raw, "ignoring invalid worker count"),
            }
        }
        if let Some(raw) = lookup(POOL_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.pool_timeout = Duration::from_millis(ms),
                Err(_) => warn!(var = POOL_TIMEOUT_ENV, value = %raw, "ignoring invalid timeout"),
            }
        }
        config
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 { None } else { Some(workers) };
        self
    }

    pub fn with_pool_timeout(mut self, timeout: Duration) -> Self {
        self.pool_timeout = timeout;
        self
    }

    /// Concrete worker count, clamped to `pool::MAX_WORKERS`.
    pub fn resolved_workers(&self) -> usize {
        pool::resolve_workers(self.workers)
    }
}
