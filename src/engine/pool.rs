// src/engine/pool.rs
//
// Worker-count detection and the shared rayon pool.
//
// **Thread Count Calculation**:
// - Uses std::thread::available_parallelism() to respect cgroup/CPU quota
// - Fallback is MIN_WORKERS when detection fails
// - Explicit requests above MAX_WORKERS are clamped with a warning
//
// The global rayon pool is initialized lazily on first use. Requests for a
// different worker count get a dedicated pool instead of resizing it.

use crate::error::{BrightnessError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Upper bound on workers; larger requests are clamped
pub const MAX_WORKERS: usize = 1024;

/// At least one worker always runs
pub const MIN_WORKERS: usize = 1;

static GLOBAL_THREAD_POOL: OnceLock<ThreadPool> = OnceLock::new();

/// Parallelism reported by the OS, never below `MIN_WORKERS`.
pub fn detected_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_WORKERS)
        .max(MIN_WORKERS)
}

/// Turn an optional request into a concrete worker count.
///
/// `None` and `Some(0)` mean "detect"; anything above `MAX_WORKERS` is clamped.
pub fn resolve_workers(requested: Option<usize>) -> usize {
    match requested {
        None | Some(0) => detected_parallelism(),
        Some(n) if n > MAX_WORKERS => {
            warn!(requested = n, max = MAX_WORKERS, "clamping worker count");
            MAX_WORKERS
        }
        Some(n) => n,
    }
}

/// Shared rayon pool sized to `detected_parallelism()`.
pub(crate) fn global_pool() -> Result<&'static ThreadPool> {
    if let Some(pool) = GLOBAL_THREAD_POOL.get() {
        return Ok(pool);
    }
    let pool = build_pool(detected_parallelism())?;
    // A concurrent initializer may have won; its pool is equivalent.
    Ok(GLOBAL_THREAD_POOL.get_or_init(|| pool))
}

pub(crate) fn build_pool(num_threads: usize) -> Result<ThreadPool> {
    let num_threads = num_threads.max(MIN_WORKERS);
    debug!(num_threads, "building rayon pool");
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("brighten-rayon-{i}"))
        .build()
        .map_err(|e| {
            BrightnessError::internal_panic(format!(
                "failed to create rayon pool with {num_threads} threads: {e}"
            ))
        })
}
