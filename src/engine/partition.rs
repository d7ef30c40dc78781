// src/engine/partition.rs
//
// Row partitioning for the fixed-thread strategy.
//
// Worker `i` gets `height / n` rows starting at `i * (height / n)`; the last
// worker also takes the `height % n` leftover rows. Boundaries are therefore
// deterministic for a given (height, n), which keeps thread-to-row assignment
// reproducible across runs.

use std::fmt;
use std::ops::Range;

/// Contiguous run of rows. Empty ranges are valid and process nothing.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowRange {
    start: usize,
    len: usize,
}

impl RowRange {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// First row (inclusive).
    pub fn start_y(&self) -> usize {
        self.start
    }

    /// Last row (inclusive), or `None` for an empty range.
    pub fn end_y(&self) -> Option<usize> {
        self.len.checked_sub(1).map(|last| self.start + last)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Half-open row indices covered by this range.
    pub fn rows(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

impl fmt::Debug for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end_y() {
            Some(end) => write!(f, "[{}, {}]", self.start, end),
            None => write!(f, "[{}, empty]", self.start),
        }
    }
}

/// Split `height` rows into `worker_count` ranges.
///
/// `worker_count == 0` is treated as 1. Always returns exactly
/// `max(worker_count, 1)` ranges.
pub fn partition(height: usize, worker_count: usize) -> Vec<RowRange> {
    let workers = worker_count.max(1);
    let base = height / workers;
    let remainder = height % workers;

    (0..workers)
        .map(|i| {
            let extra = if i == workers - 1 { remainder } else { 0 };
            RowRange::new(i * base, base + extra)
        })
        .collect()
}
