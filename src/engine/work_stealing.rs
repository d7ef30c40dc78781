// src/engine/work_stealing.rs
//
// rayon strategy: rows are split across a work-stealing pool.

use crate::engine::buffer::PixelBuffer;
use crate::engine::common::{panic_message, ExecutionReport};
use crate::engine::pool;
use crate::engine::ParallelExecutor;
use crate::error::{BrightnessError, Result};
use crate::ops::Strategy;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::debug;

#[derive(Clone, Copy, Debug)]
pub struct WorkStealing {
    workers: usize,
}

impl WorkStealing {
    /// `workers == 0` is treated as 1.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    fn run_in_pool<R>(&self, op: impl FnOnce(&ThreadPool) -> R) -> Result<R> {
        // The shared pool already has the right size in the common case.
        let global = pool::global_pool()?;
        if global.current_num_threads() == self.workers {
            return Ok(op(global));
        }
        let dedicated = pool::build_pool(self.workers)?;
        Ok(op(&dedicated))
    }
}

impl ParallelExecutor for WorkStealing {
    fn strategy(&self) -> Strategy {
        Strategy::WorkStealing
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn for_each_row<F>(&self, buffer: &mut PixelBuffer, job: F) -> Result<ExecutionReport>
    where
        F: Fn(usize, &mut [u8]) + Sync,
    {
        let started = Instant::now();
        let rows = buffer.height() as usize;
        let stride = buffer.stride();
        let data = buffer.as_raw_mut();

        let outcome = self.run_in_pool(|pool| {
            catch_unwind(AssertUnwindSafe(|| {
                pool.install(|| {
                    data.par_chunks_mut(stride)
                        .enumerate()
                        .for_each(|(y, row)| job(y, row));
                })
            }))
        })?;
        if let Err(payload) = outcome {
            return Err(BrightnessError::worker_panicked(
                "rayon",
                panic_message(payload.as_ref()),
            ));
        }

        let report = ExecutionReport {
            strategy: Strategy::WorkStealing,
            workers: self.workers,
            tasks: rows,
            rows,
            elapsed: started.elapsed(),
        };
        debug!(
            workers = self.workers,
            rows,
            elapsed_ms = report.elapsed_ms(),
            "work-stealing pass finished"
        );
        Ok(report)
    }
}
