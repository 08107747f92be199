// src/exec/progress.rs

use crate::exec::{EventSender, JobEvent};
use crate::trajectory::progress_fraction;

/// Converts observed output sizes into progress fractions.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    expected: Option<u64>,
    last: f64,
}

impl ProgressTracker {
    pub fn new(expected: Option<u64>) -> Self {
        Self {
            expected,
            last: 0.0,
        }
    }

    pub fn expected(&self) -> Option<u64> {
        self.expected
    }

    /// Fraction for an output of `current` bytes (`None` if the file does
    /// not exist yet). Never decreases and never exceeds 1.0.
    pub fn update(&mut self, current: Option<u64>) -> Option<f64> {
        let expected = self.expected?;
        if let Some(current) = current {
            self.last = self.last.max(progress_fraction(current, expected));
        }
        Some(self.last)
    }
}

/// Emits `Busy(true)` when created and `Busy(false)` when dropped, so the
/// indicator is cleared on every exit path.
#[derive(Debug)]
pub struct BusyGuard {
    events: EventSender,
}

impl BusyGuard {
    pub fn new(events: EventSender) -> Self {
        let _ = events.send(JobEvent::Busy(true));
        Self { events }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let _ = self.events.send(JobEvent::Busy(false));
    }
}
