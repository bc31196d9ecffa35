use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

/// Remaining allowance below which the session must wrap up.
const LOW_WATER: Duration = Duration::from_secs(1);

/// The remaining-time figure is noisy right after startup; the first
/// checks are skipped for this long.
const WARMUP: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    Healthy,
    /// Budget under the low-water mark: flush what is held and stop.
    Low,
}

/// Tracks the wall-clock allowance granted by the hosting invocation.
///
/// Read-only with respect to the clock; `poll` never blocks. Each session
/// owns its own monitor, all built against the same invocation deadline.
#[derive(Debug)]
pub struct TimeBudgetMonitor {
    started: Instant,
    deadline: Instant,
    warned: bool,
}

impl TimeBudgetMonitor {
    pub fn new(remaining: Duration) -> Self {
        Self::until(Instant::now() + remaining)
    }

    pub fn until(deadline: Instant) -> Self {
        Self {
            started: Instant::now(),
            deadline,
            warned: false,
        }
    }

    /// Time left before the invocation is forcibly terminated.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Checkpoint for the streaming loop. `Low` is a cancellation signal:
    /// the warning is logged once, and every later poll stays `Low`.
    pub fn poll(&mut self) -> BudgetStatus {
        if self.started.elapsed() < WARMUP {
            return BudgetStatus::Healthy;
        }
        let remaining = self.remaining();
        if remaining >= LOW_WATER {
            return BudgetStatus::Healthy;
        }
        if !self.warned {
            self.warned = true;
            warn!("time left before timeout: {}ms", remaining.as_millis());
        }
        BudgetStatus::Low
    }
}
