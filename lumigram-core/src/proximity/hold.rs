use std::time::{Duration, Instant};

/// Logical clock for the hold-to-confirm gesture.
///
/// Progress is a pure function of the sampled instant, so callers may tick at
/// any cadence without affecting the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldTimer {
    started_at: Instant,
    duration: Duration,
}

impl HoldTimer {
    /// Start a hold at `started_at` lasting `duration`.
    #[must_use]
    pub const fn start(started_at: Instant, duration: Duration) -> Self {
        Self {
            started_at,
            duration,
        }
    }

    /// Time held as of `now`. Instants before the start count as zero.
    #[must_use]
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Fraction of the hold completed as of `now`, in `[0, 1]`.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "ratio of elapsed to total")]
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed(now).as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    /// Whether the full duration has elapsed as of `now`.
    #[must_use]
    pub fn is_complete(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.duration
    }
}
