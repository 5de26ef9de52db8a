use tokio::time::Instant;

/// Trait for monotonic reaction-time clocks
pub trait Timer: Clone + Send + Sync {
    fn now(&self) -> Instant;

    /// Milliseconds between two readings, saturating at zero.
    fn millis_between(&self, earlier: Instant, later: Instant) -> u64 {
        let ms = later.saturating_duration_since(earlier).as_millis();
        u64::try_from(ms).unwrap_or(u64::MAX)
    }
}

/// Tokio-backed monotonic clock. Follows paused time in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicTimer;

impl Timer for MonotonicTimer {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
