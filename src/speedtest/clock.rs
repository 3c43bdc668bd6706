use std::time::Duration;
use tokio::time::Instant;

/// Wall-clock timer for one measurement window.
///
/// Backed by `tokio::time::Instant` so a paused test runtime drives it.
#[derive(Debug, Clone, Copy)]
pub struct SampleClock {
    start: Instant,
}

impl SampleClock {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn started_at(&self) -> Instant {
        self.start
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// Whether `budget` has run out since the clock started.
    pub fn exceeded(&self, budget: Duration) -> bool {
        self.elapsed() >= budget
    }

    /// Fraction of `budget` consumed so far, clamped to `[0, 1]`.
    pub fn fraction_of(&self, budget: Duration) -> f64 {
        if budget.is_zero() {
            return 1.0;
        }
        (self.elapsed().as_secs_f64() / budget.as_secs_f64()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_follows_paused_time() {
        let clock = SampleClock::start();
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!((clock.elapsed_ms() - 250.0).abs() < 1.0);
        assert!(!clock.exceeded(Duration::from_secs(1)));
        assert!((clock.fraction_of(Duration::from_secs(1)) - 0.25).abs() < 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn fraction_is_clamped() {
        let clock = SampleClock::start();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(clock.exceeded(Duration::from_secs(2)));
        assert_eq!(clock.fraction_of(Duration::from_secs(2)), 1.0);
        assert_eq!(clock.fraction_of(Duration::ZERO), 1.0);
    }
}
