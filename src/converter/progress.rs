// src/converter/progress.rs
//! Progress sink and the cancellation it carries.

use crate::error::CancelError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Progress reporting for one import run; owns cancellation.
pub trait Progress: Send + Sync {
    fn set_total(&self, total: i64);

    fn set_progress_message(&self, message: &str);

    /// Advances by `steps` and reports whether the run was cancelled.
    fn try_step(&self, steps: i64) -> Result<(), CancelError>;
}

/// Counter-based [`Progress`] implementation with a cancel switch.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total: AtomicI64,
    done: AtomicI64,
    cancelled: AtomicBool,
    message: Mutex<String>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> i64 {
        self.total.load(Ordering::SeqCst)
    }

    pub fn done(&self) -> i64 {
        self.done.load(Ordering::SeqCst)
    }

    pub fn message(&self) -> String {
        self.message.lock().clone()
    }
}

impl Progress for ProgressTracker {
    fn set_total(&self, total: i64) {
        self.total.store(total, Ordering::SeqCst);
    }

    fn set_progress_message(&self, message: &str) {
        log::debug!("progress: {}", message);
        *self.message.lock() = message.to_string();
    }

    fn try_step(&self, steps: i64) -> Result<(), CancelError> {
        if self.is_cancelled() {
            return Err(CancelError);
        }
        let done = self.done.fetch_add(steps, Ordering::SeqCst) + steps;
        if steps > 0 {
            log::debug!("progress {}/{}", done, self.total());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_steps_until_cancelled() {
        let tracker = ProgressTracker::new();
        tracker.set_total(4);
        tracker.try_step(1).unwrap();
        tracker.try_step(2).unwrap();
        assert_eq!(tracker.done(), 3);

        tracker.cancel();
        assert_eq!(tracker.try_step(1), Err(CancelError));
        assert_eq!(tracker.done(), 3);
    }
}
