// src/engine/worker_pool.rs
//
// Worker-pool strategy: a fixed set of persistent threads pulling single-row
// tasks from a shared FIFO queue.
//
// Lifecycle of one pass:
// 1. spawn `size` scoped workers, all blocked on an empty queue
// 2. enqueue one task per row, top to bottom, then close the queue
// 3. wait for the queue to drain, bounded by `timeout`
// 4. on timeout or interrupt, discard pending tasks; in-flight rows finish
// 5. join every worker before returning
//
// The timeout bounds the queue drain, not the caller's latency: a row that is
// already running is always waited for, so a row that never returns blocks
// the pass.
//
// Tasks borrow disjoint rows of the buffer, so the queue is the only shared
// state. A panicking row is caught on the worker, which keeps serving the
// queue; the failure is reported once the pool has drained.

use crate::engine::buffer::PixelBuffer;
use crate::engine::common::{panic_message, ExecutionReport};
use crate::engine::config::DEFAULT_POOL_TIMEOUT;
use crate::engine::ParallelExecutor;
use crate::error::{BrightnessError, Result};
use crate::ops::Strategy;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often a waiting caller re-checks its interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(10);

/// Cooperative cancellation for a running pool.
///
/// Cloning shares the flag. The flag stays set after a pass observes it, so
/// the caller can see the interruption; call `reset()` before reusing the pool.
#[derive(Clone, Debug, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone, Debug)]
pub struct WorkerPool {
    size: usize,
    timeout: Duration,
    interrupt: InterruptHandle,
}

impl WorkerPool {
    /// `size == 0` is treated as 1.
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            timeout: DEFAULT_POOL_TIMEOUT,
            interrupt: InterruptHandle::new(),
        }
    }

    /// Deadline for draining the queue. Rows still queued at the deadline are
    /// dropped; rows already running finish before the call returns.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interrupt(mut self, interrupt: InterruptHandle) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }
}

struct RowTask<'a> {
    y: usize,
    row: &'a mut [u8],
}

#[derive(Default)]
struct QueueState<'a> {
    pending: VecDeque<RowTask<'a>>,
    closed: bool,
    in_flight: usize,
    completed: usize,
    failures: Vec<BrightnessError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drain {
    Finished,
    TimedOut,
    Interrupted,
}

struct TaskQueue<'a> {
    state: Mutex<QueueState<'a>>,
    /// Signalled when a task is pushed or the queue closes
    available: Condvar,
    /// Signalled when the last outstanding task finishes
    idle: Condvar,
}

impl<'a> TaskQueue<'a> {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            available: Condvar::new(),
            idle: Condvar::new(),
        }
    }

    fn submit(&self, task: RowTask<'a>) {
        let mut state = self.state.lock();
        state.pending.push_back(task);
        drop(state);
        self.available.notify_one();
    }

    /// No more submissions; idle workers exit once the queue is empty.
    fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    /// Block until a task is available or the queue is closed and empty.
    fn next(&self) -> Option<RowTask<'a>> {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.pending.pop_front() {
                state.in_flight += 1;
                return Some(task);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    fn finish(&self, failure: Option<BrightnessError>) {
        let mut state = self.state.lock();
        state.in_flight -= 1;
        match failure {
            Some(err) => state.failures.push(err),
            None => state.completed += 1,
        }
        if state.pending.is_empty() && state.in_flight == 0 {
            self.idle.notify_all();
        }
    }

    fn await_termination(&self, timeout: Duration, interrupt: &InterruptHandle) -> Drain {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        loop {
            if state.pending.is_empty() && state.in_flight == 0 {
                return Drain::Finished;
            }
            if interrupt.is_interrupted() {
                return Drain::Interrupted;
            }
            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                return Drain::TimedOut;
            }
            let wake = match deadline {
                Some(d) => d.min(now + INTERRUPT_POLL),
                None => now + INTERRUPT_POLL,
            };
            self.idle.wait_until(&mut state, wake);
        }
    }

    /// Drop every pending task and close the queue. Returns how many were dropped.
    fn shutdown_now(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        state.closed = true;
        drop(state);
        self.available.notify_all();
        dropped
    }
}

fn worker_loop<F>(name: &str, queue: &TaskQueue<'_>, job: &F)
where
    F: Fn(usize, &mut [u8]) + Sync,
{
    while let Some(RowTask { y, row }) = queue.next() {
        let failure = catch_unwind(AssertUnwindSafe(|| job(y, row)))
            .err()
            .map(|payload| {
                let message = panic_message(payload.as_ref());
                warn!(worker = name, row = y, %message, "row task panicked");
                BrightnessError::worker_panicked(format!("{name} (row {y})"), message)
            });
        queue.finish(failure);
    }
}

impl ParallelExecutor for WorkerPool {
    fn strategy(&self) -> Strategy {
        Strategy::WorkerPool
    }

    fn workers(&self) -> usize {
        self.size
    }

    fn for_each_row<F>(&self, buffer: &mut PixelBuffer, job: F) -> Result<ExecutionReport>
    where
        F: Fn(usize, &mut [u8]) + Sync,
    {
        let started = Instant::now();
        let total = buffer.height() as usize;
        if self.interrupt.is_interrupted() {
            return Err(BrightnessError::interrupted("worker pool start", 0, total));
        }

        let rows = buffer.rows_mut();
        let queue = TaskQueue::new();
        let job = &job;
        let queue_ref = &queue;

        let (spawned, drain, mut join_failures) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.size);
            for i in 0..self.size {
                let name = format!("pool-worker-{i}");
                let worker_name = name.clone();
                match thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(scope, move || worker_loop(&worker_name, queue_ref, job))
                {
                    Ok(handle) => handles.push((name, handle)),
                    Err(e) => {
                        warn!(worker = %name, error = %e, "failed to spawn pool worker");
                        break;
                    }
                }
            }
            debug!(workers = handles.len(), rows = total, "worker pool started");

            let drain = if handles.is_empty() {
                None
            } else {
                for (y, row) in rows.enumerate() {
                    queue.submit(RowTask { y, row });
                }
                queue.close();
                let drain = queue.await_termination(self.timeout, &self.interrupt);
                if drain != Drain::Finished {
                    let dropped = queue.shutdown_now();
                    warn!(?drain, dropped, "worker pool stopped before draining");
                }
                Some(drain)
            };
            // Unblocks workers when nothing was submitted.
            queue.close();

            let spawned = handles.len();
            let mut join_failures = Vec::new();
            for (name, handle) in handles {
                if let Err(payload) = handle.join() {
                    join_failures
                        .push(BrightnessError::worker_panicked(name, panic_message(payload.as_ref())));
                }
            }
            (spawned, drain, join_failures)
        });

        let state = queue.state.into_inner();
        let completed = state.completed;
        let mut failures = state.failures;

        match drain {
            None => Err(BrightnessError::internal_panic(
                "failed to spawn any pool worker",
            )),
            Some(Drain::Interrupted) => Err(BrightnessError::interrupted(
                "worker pool drain",
                completed,
                total,
            )),
            Some(Drain::TimedOut) => Err(BrightnessError::pool_timeout(
                self.timeout,
                completed,
                total,
            )),
            Some(Drain::Finished) => {
                failures.append(&mut join_failures);
                if !failures.is_empty() {
                    return Err(failures.remove(0));
                }
                let report = ExecutionReport {
                    strategy: Strategy::WorkerPool,
                    workers: spawned,
                    tasks: total,
                    rows: total,
                    elapsed: started.elapsed(),
                };
                debug!(
                    completed,
                    elapsed_ms = report.elapsed_ms(),
                    "worker pool drained"
                );
                Ok(report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn brightens_every_row() {
        let mut buffer = PixelBuffer::new(4, 9, 4, 200).unwrap();
        let report = WorkerPool::new(3).adjust_brightness(&mut buffer, 70).unwrap();
        assert!(buffer.as_raw().iter().all(|&c| c == 255));
        assert_eq!(report.tasks, 9);
        assert_eq!(report.workers, 3);
    }

    #[test]
    fn one_task_per_row() {
        let mut buffer = PixelBuffer::new(3, 12, 1, 0).unwrap();
        let seen = Mutex::new(Vec::new());
        WorkerPool::new(4)
            .for_each_row(&mut buffer, |y, row| {
                assert_eq!(row.len(), 3);
                seen.lock().push(y);
            })
            .unwrap();
        let mut seen = seen.into_inner();
        seen.sort_unstable();
        assert_eq!(seen, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn rows_run_on_pool_threads() {
        let mut buffer = PixelBuffer::new(1, 32, 1, 0).unwrap();
        let names = Mutex::new(HashSet::new());
        WorkerPool::new(2)
            .for_each_row(&mut buffer, |_, _| {
                let name = thread::current().name().unwrap_or_default().to_string();
                names.lock().insert(name);
            })
            .unwrap();
        let names = names.into_inner();
        assert!(!names.is_empty());
        assert!(names.iter().all(|n| n.starts_with("pool-worker-")));
    }

    #[test]
    fn timeout_stops_waiting_and_joins_workers() {
        let mut buffer = PixelBuffer::new(2, 6, 1, 0).unwrap();
        let pool = WorkerPool::new(1).with_timeout(Duration::from_millis(20));
        let started = Instant::now();
        let err = pool
            .for_each_row(&mut buffer, |_, _| thread::sleep(Duration::from_millis(100)))
            .unwrap_err();
        match err {
            BrightnessError::PoolTimeout {
                completed, total, ..
            } => {
                assert_eq!(total, 6);
                assert!(completed < total);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Pending rows were dropped instead of being processed.
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn timeout_waits_for_in_flight_rows() {
        let mut buffer = PixelBuffer::new(2, 3, 1, 0).unwrap();
        let pool = WorkerPool::new(1).with_timeout(Duration::from_millis(50));
        let started = Instant::now();
        let err = pool
            .for_each_row(&mut buffer, |_, row| {
                thread::sleep(Duration::from_millis(300));
                row.fill(9);
            })
            .unwrap_err();
        assert!(matches!(err, BrightnessError::PoolTimeout { .. }));
        // The deadline passed long before the running row finished.
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(&buffer.as_raw()[..2], &[9, 9]);
        assert!(buffer.as_raw()[2..].iter().all(|&c| c == 0));
    }

    #[test]
    fn interrupt_during_drain() {
        let mut buffer = PixelBuffer::new(2, 4, 1, 0).unwrap();
        let pool = WorkerPool::new(2);
        let handle = pool.interrupt_handle();
        let err = pool
            .for_each_row(&mut buffer, |y, _| {
                if y == 0 {
                    handle.interrupt();
                }
                thread::sleep(Duration::from_millis(50));
            })
            .unwrap_err();
        assert!(matches!(err, BrightnessError::Interrupted { .. }));
        assert!(pool.interrupt_handle().is_interrupted());
    }

    #[test]
    fn interrupted_pool_refuses_to_start() {
        let mut buffer = PixelBuffer::new(2, 2, 1, 7).unwrap();
        let pool = WorkerPool::new(2);
        pool.interrupt_handle().interrupt();
        let err = pool.adjust_brightness(&mut buffer, 10).unwrap_err();
        assert!(matches!(
            err,
            BrightnessError::Interrupted { completed: 0, .. }
        ));
        assert!(buffer.as_raw().iter().all(|&c| c == 7));

        pool.interrupt_handle().reset();
        pool.adjust_brightness(&mut buffer, 10).unwrap();
        assert!(buffer.as_raw().iter().all(|&c| c == 17));
    }

    #[test]
    fn panicking_row_does_not_stall_the_pool() {
        let mut buffer = PixelBuffer::new(2, 10, 1, 0).unwrap();
        let processed = AtomicUsize::new(0);
        let err = WorkerPool::new(2)
            .for_each_row(&mut buffer, |y, row| {
                if y == 3 {
                    panic!("bad row");
                }
                row.fill(9);
                processed.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap_err();
        assert!(matches!(err, BrightnessError::WorkerPanicked { .. }));
        assert_eq!(processed.load(Ordering::SeqCst), 9);
    }
}
