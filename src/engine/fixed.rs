// src/engine/fixed.rs
//
// Fixed-thread strategy: one named OS thread per non-empty row range.
//
// Each thread owns a disjoint `&mut` band of the buffer, so no locking is
// needed. All spawned threads are joined before returning, including when one
// of them panics.

use crate::engine::buffer::{PixelBuffer, RowBand};
use crate::engine::common::{panic_message, ExecutionReport};
use crate::engine::partition::{partition, RowRange};
use crate::engine::ParallelExecutor;
use crate::error::{BrightnessError, Result};
use crate::ops::Strategy;
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug)]
pub struct FixedThreads {
    workers: usize,
}

impl FixedThreads {
    /// `workers == 0` is treated as 1.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

/// One worker's share of the image.
struct RowRangeTask<'a> {
    index: usize,
    range: RowRange,
    band: RowBand<'a>,
}

impl RowRangeTask<'_> {
    fn run<F>(self, job: &F)
    where
        F: Fn(usize, &mut [u8]) + Sync,
    {
        for (y, row) in self.band.into_rows() {
            job(y, row);
        }
    }
}

impl ParallelExecutor for FixedThreads {
    fn strategy(&self) -> Strategy {
        Strategy::FixedThreads
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
        let ranges = partition(rows, self.workers);
        let bands = buffer.split_rows_mut(&ranges)?;

        let tasks: Vec<RowRangeTask<'_>> = ranges
            .iter()
            .zip(bands)
            .enumerate()
            .filter(|(_, (range, _))| !range.is_empty())
            .map(|(index, (&range, band))| RowRangeTask { index, range, band })
            .collect();
        let task_count = tasks.len();
        debug!(
            workers = self.workers,
            threads = task_count,
            rows,
            "starting fixed-thread pass"
        );

        let job = &job;
        let (spawned, mut failures) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(task_count);
            let mut failures = Vec::new();

            for task in tasks {
                let name = format!("brighten-{}", task.index);
                let range = task.range;
                match thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(scope, move || task.run(job))
                {
                    Ok(handle) => handles.push((name, range, handle)),
                    Err(e) => {
                        // Bands of unspawned tasks are never touched.
                        failures.push(BrightnessError::internal_panic(format!(
                            "failed to spawn {name}: {e}"
                        )));
                        break;
                    }
                }
            }

            let spawned = handles.len();
            for (name, range, handle) in handles {
                if let Err(payload) = handle.join() {
                    let message = panic_message(payload.as_ref());
                    warn!(worker = %name, ?range, %message, "worker panicked");
                    failures.push(BrightnessError::worker_panicked(name, message));
                }
            }
            (spawned, failures)
        });

        if !failures.is_empty() {
            return Err(failures.remove(0));
        }

        let report = ExecutionReport {
            strategy: Strategy::FixedThreads,
            workers: spawned,
            tasks: task_count,
            rows,
            elapsed: started.elapsed(),
        };
        debug!(elapsed_ms = report.elapsed_ms(), "fixed-thread pass finished");
        Ok(report)
    }
}
