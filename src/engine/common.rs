// src/engine/common.rs
//
// Common utilities shared across engine modules.

use crate::error::{BrightnessError, Result};
use crate::ops::Strategy;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

/// What a runner did, for the timing harness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionReport {
    pub strategy: Strategy,
    /// Threads that actually executed work
    pub workers: usize,
    /// Units of work dispatched (ranges or rows)
    pub tasks: usize,
    pub rows: usize,
    pub elapsed: Duration,
}

impl ExecutionReport {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run third-party code (codecs) so that a panic is returned as the error
/// built by `on_panic` from the panic message instead of unwinding through
/// the caller.
pub(crate) fn run_with_panic_policy<T, F, E>(f: F, on_panic: E) -> Result<T>
where
    F: FnOnce() -> Result<T>,
    E: FnOnce(String) -> BrightnessError,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(on_panic(panic_message(payload.as_ref()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_policy_converts_panics() {
        let result: Result<()> = run_with_panic_policy(
            || panic!("bad header"),
            |message| BrightnessError::decode_failed("in.png", message),
        );
        let err = result.unwrap_err();
        assert!(matches!(err, BrightnessError::DecodeFailed { .. }));
        assert_eq!(err.category(), crate::error::ErrorCategory::IoError);
        assert!(err.to_string().contains("in.png"));
        assert!(err.to_string().contains("bad header"));
    }

    #[test]
    fn panic_policy_passes_results_through() {
        let value = run_with_panic_policy(|| Ok(7), |m| BrightnessError::internal_panic(m)).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn panic_message_handles_owned_strings() {
        let payload: Box<dyn Any + Send> = Box::new(format!("row {}", 3));
        assert_eq!(panic_message(payload.as_ref()), "row 3");
    }
}
