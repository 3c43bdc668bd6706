//! Byte count to bit-rate conversion.

/// Megabits per second for `bytes` moved in `elapsed_ms` milliseconds.
///
/// Callers must not pass a zero `elapsed_ms`; [`RateEstimator`] guards this.
pub fn rate_mbps(bytes: u64, elapsed_ms: f64) -> f64 {
    (bytes as f64 * 8.0) / (elapsed_ms / 1000.0) / 1_000_000.0
}

/// One periodic reading of a throughput phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSample {
    /// Seconds since the phase started
    pub time_s: f64,
    /// Rate over the interval since the previous sample
    pub instant_mbps: f64,
    /// Rate over the whole phase so far
    pub cumulative_mbps: f64,
}

/// Turns successive (total bytes, elapsed) readings into rate samples.
#[derive(Debug, Default)]
pub struct RateEstimator {
    last_bytes: u64,
    last_ms: f64,
}

impl RateEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading of the accumulator. Returns `None` until some time
    /// has elapsed.
    pub fn observe(&mut self, total_bytes: u64, elapsed_ms: f64) -> Option<RateSample> {
        if elapsed_ms <= 0.0 {
            return None;
        }

        let cumulative_mbps = rate_mbps(total_bytes, elapsed_ms);
        let interval_ms = elapsed_ms - self.last_ms;
        let instant_mbps = if interval_ms > 0.0 {
            rate_mbps(total_bytes.saturating_sub(self.last_bytes), interval_ms)
        } else {
            cumulative_mbps
        };

        self.last_bytes = total_bytes;
        self.last_ms = elapsed_ms;

        Some(RateSample {
            time_s: elapsed_ms / 1000.0,
            instant_mbps,
            cumulative_mbps,
        })
    }
}
