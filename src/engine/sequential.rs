// src/engine/sequential.rs
//
// Single-threaded baseline. Every parallel strategy must produce exactly the
// bytes this runner produces.

use crate::engine::buffer::PixelBuffer;
use crate::engine::common::ExecutionReport;
use crate::engine::kernel;
use crate::ops::Strategy;
use std::time::Instant;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialRunner;

impl SequentialRunner {
    /// Visit every pixel in row-major order on the calling thread.
    pub fn run(&self, buffer: &mut PixelBuffer, delta: i32) -> ExecutionReport {
        let channels = buffer.channels() as usize;
        self.for_each_row(buffer, |_, row| kernel::apply_row(row, channels, delta))
    }

    pub fn for_each_row<F>(&self, buffer: &mut PixelBuffer, job: F) -> ExecutionReport
    where
        F: Fn(usize, &mut [u8]),
    {
        let started = Instant::now();
        let rows = buffer.height() as usize;
        for (y, row) in buffer.rows_mut().enumerate() {
            job(y, row);
        }
        let report = ExecutionReport {
            strategy: Strategy::Sequential,
            workers: 1,
            tasks: 1,
            rows,
            elapsed: started.elapsed(),
        };
        debug!(rows, elapsed_ms = report.elapsed_ms(), "sequential pass finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightens_every_pixel() {
        let mut buffer = PixelBuffer::new(4, 4, 3, 100).unwrap();
        let report = SequentialRunner.run(&mut buffer, 70);
        assert!(buffer.as_raw().iter().all(|&c| c == 170));
        assert_eq!(report.rows, 4);
        assert_eq!(report.strategy, Strategy::Sequential);
    }

    #[test]
    fn visits_rows_in_order() {
        let mut buffer = PixelBuffer::new(2, 5, 1, 0).unwrap();
        let seen = std::cell::RefCell::new(Vec::new());
        SequentialRunner.for_each_row(&mut buffer, |y, _| seen.borrow_mut().push(y));
        assert_eq!(seen.into_inner(), vec![0, 1, 2, 3, 4]);
    }
}
