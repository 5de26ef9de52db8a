use std::future::pending;
use std::pin::Pin;

use tokio::time::{Instant, Sleep, sleep_until};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeadlineState {
    Armed,
    Fired,
    Cancelled,
}

/// Single-shot, cancellable deadline timer.
///
/// `fired()` completes once, when the deadline instant passes. After
/// `cancel()` or after it has fired, `fired()` never completes again, so a
/// deadline that lost the race cannot produce a second signal.
#[derive(Debug)]
pub struct Deadline {
    at: Instant,
    sleep: Pin<Box<Sleep>>,
    state: DeadlineState,
}

impl Deadline {
    /// Arms a deadline that passes at `at`.
    pub fn arm_at(at: Instant) -> Self {
        Self {
            at,
            sleep: Box::pin(sleep_until(at)),
            state: DeadlineState::Armed,
        }
    }

    pub fn at(&self) -> Instant {
        self.at
    }

    /// Disarms the timer. Returns `false` if it had already fired or been cancelled.
    pub fn cancel(&mut self) -> bool {
        if self.state == DeadlineState::Armed {
            self.state = DeadlineState::Cancelled;
            true
        } else {
            false
        }
    }

    /// Completes when the deadline passes. Cancel-safe.
    pub async fn fired(&mut self) {
        if self.state != DeadlineState::Armed {
            return pending().await;
        }
        self.sleep.as_mut().await;
        self.state = DeadlineState::Fired;
    }
}
