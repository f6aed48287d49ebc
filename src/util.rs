//! Small shared helpers.

use std::time::{Duration, Instant};

/// Tracks the time budget of one decision exchange. A single deadline covers
/// connect, write and the whole read loop; once it is exhausted the exchange
/// is a transport failure.
#[derive(Clone, Debug)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    /// Start a new deadline with `ms` milliseconds of budget.
    pub fn new_ms(ms: u64) -> Self {
        Deadline {
            start: Instant::now(),
            budget: Duration::from_millis(ms),
        }
    }

    /// Returns true if the budget has already been exhausted.
    pub fn exceeded(&self) -> bool {
        self.start.elapsed() >= self.budget
    }

    /// Remaining budget; zero once exceeded.
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.start.elapsed())
    }

    /// Remaining budget in whole milliseconds.
    pub fn remaining_ms(&self) -> u64 {
        self.remaining().as_millis() as u64
    }
}
