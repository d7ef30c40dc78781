// src/engine.rs
//
// The core of parallel-brightness. Adds a signed delta to every component of
// a raster, clamped to [0, 255], using one of several execution strategies:
// 1. Sequential baseline on the calling thread
// 2. Fixed threads, one per contiguous row range
// 3. Worker pool fed one task per row, with a bounded drain
// 4. rayon work-stealing
//
// Every strategy produces byte-identical output for the same input and delta.
//
// This file is a facade that delegates to the modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod api;
mod buffer;
mod common;
mod config;
mod fixed;
mod io;
pub mod kernel;
pub mod partition;
mod pool;
mod sequential;
mod work_stealing;
mod worker_pool;

pub use api::ImageProcessor;
pub use buffer::{PixelBuffer, RowBand, MAX_CHANNELS};
pub use common::ExecutionReport;
pub use config::{EngineConfig, DEFAULT_POOL_TIMEOUT, POOL_TIMEOUT_ENV, THREADS_ENV};
pub use fixed::FixedThreads;
pub use io::{load_buffer, output_format_for, save_buffer, DEFAULT_JPEG_QUALITY};
pub use partition::{partition, RowRange};
pub use pool::{detected_parallelism, resolve_workers, MAX_WORKERS};
pub use sequential::SequentialRunner;
pub use work_stealing::WorkStealing;
pub use worker_pool::{InterruptHandle, WorkerPool};

use crate::error::Result;
use crate::ops::Strategy;

/// A strategy that runs a per-row job over a buffer on several threads.
///
/// Implementations hand each row to exactly one invocation of `job` as a
/// disjoint `&mut [u8]`, and do not return until every thread they started
/// has stopped touching the buffer.
pub trait ParallelExecutor {
    fn strategy(&self) -> Strategy;

    /// Requested worker count (the report says how many actually ran).
    fn workers(&self) -> usize;

    /// Call `job(y, row)` once for every row `y`.
    fn for_each_row<F>(&self, buffer: &mut PixelBuffer, job: F) -> Result<ExecutionReport>
    where
        F: Fn(usize, &mut [u8]) + Sync;

    fn adjust_brightness(&self, buffer: &mut PixelBuffer, delta: i32) -> Result<ExecutionReport> {
        let channels = buffer.channels() as usize;
        self.for_each_row(buffer, move |_, row| kernel::apply_row(row, channels, delta))
    }
}

impl ParallelExecutor for SequentialRunner {
    fn strategy(&self) -> Strategy {
        Strategy::Sequential
    }

    fn workers(&self) -> usize {
        1
    }

    fn for_each_row<F>(&self, buffer: &mut PixelBuffer, job: F) -> Result<ExecutionReport>
    where
        F: Fn(usize, &mut [u8]) + Sync,
    {
        Ok(SequentialRunner::for_each_row(self, buffer, job))
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Brighten `buffer` in place on the calling thread. Cannot fail.
pub fn adjust_brightness(buffer: &mut PixelBuffer, delta: i32) -> ExecutionReport {
    SequentialRunner.run(buffer, delta)
}

/// Brighten `buffer` in place with `strategy` and `worker_count` workers.
///
/// `worker_count == 0` is treated as 1 and counts above `MAX_WORKERS` are
/// clamped. The worker pool uses the default
/// drain timeout. On error the buffer may be partially transformed; see
/// `BrightnessError::buffer_is_degraded`.
pub fn adjust_brightness_parallel(
    buffer: &mut PixelBuffer,
    delta: i32,
    strategy: Strategy,
    worker_count: usize,
) -> Result<ExecutionReport> {
    let config = EngineConfig::default().with_workers(worker_count.max(1));
    adjust_brightness_with(buffer, delta, strategy, &config)
}

/// Brighten `buffer` in place with `strategy`, sized and bounded by `config`.
pub fn adjust_brightness_with(
    buffer: &mut PixelBuffer,
    delta: i32,
    strategy: Strategy,
    config: &EngineConfig,
) -> Result<ExecutionReport> {
    let workers = config.resolved_workers();
    match strategy {
        Strategy::Sequential => Ok(adjust_brightness(buffer, delta)),
        Strategy::FixedThreads => FixedThreads::new(workers).adjust_brightness(buffer, delta),
        Strategy::WorkerPool => WorkerPool::new(workers)
            .with_timeout(config.pool_timeout)
            .adjust_brightness(buffer, delta),
        Strategy::WorkStealing => WorkStealing::new(workers).adjust_brightness(buffer, delta),
    }
}
