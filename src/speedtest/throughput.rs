//! Shared machinery for the fixed-duration throughput phases.
//!
//! A phase opens a [`PhaseWindow`] (clock, budget, shared byte counter,
//! cancellation token), builds one future per stream borrowing the window,
//! and hands them to [`PhaseWindow::drive`], which joins them while sampling
//! the counter on a fixed interval.

use super::clock::SampleClock;
use super::rate::{rate_mbps, RateEstimator};
use super::{Direction, TestUpdate};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Bytes moved during one phase, shared by all of its streams.
#[derive(Debug, Default)]
pub struct ByteCounter(AtomicU64);

impl ByteCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, bytes: u64) {
        self.0.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputResult {
    pub total_bytes: u64,
    pub elapsed: Duration,
    pub mbps: f64,
}

impl ThroughputResult {
    pub fn new(total_bytes: u64, elapsed: Duration) -> Self {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let mbps = if elapsed_ms > 0.0 {
            rate_mbps(total_bytes, elapsed_ms)
        } else {
            0.0
        };
        Self {
            total_bytes,
            elapsed,
            mbps,
        }
    }

    /// No stream moved a single byte.
    pub fn is_empty(&self) -> bool {
        self.total_bytes == 0
    }
}

pub struct PhaseWindow<'a> {
    clock: SampleClock,
    budget: Duration,
    counter: ByteCounter,
    cancel: &'a CancellationToken,
}

impl<'a> PhaseWindow<'a> {
    pub fn open(budget: Duration, cancel: &'a CancellationToken) -> Self {
        Self {
            clock: SampleClock::start(),
            budget,
            counter: ByteCounter::new(),
            cancel,
        }
    }

    pub fn counter(&self) -> &ByteCounter {
        &self.counter
    }

    pub fn cancel(&self) -> &CancellationToken {
        self.cancel
    }

    pub fn deadline(&self) -> Instant {
        self.clock.started_at() + self.budget
    }

    /// Whether streams should stop issuing new work.
    pub fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.clock.exceeded(self.budget)
    }

    /// Run `streams` to completion, emitting a rate sample every
    /// `sample_interval`, and measure the phase.
    pub async fn drive<I>(
        &self,
        direction: Direction,
        streams: I,
        sample_interval: Duration,
        progress_tx: &mpsc::Sender<TestUpdate>,
    ) -> ThroughputResult
    where
        I: IntoIterator,
        I::Item: Future<Output = ()>,
    {
        let all = futures::future::join_all(streams);
        tokio::pin!(all);

        let mut ticker =
            tokio::time::interval_at(Instant::now() + sample_interval, sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut estimator = RateEstimator::new();

        loop {
            tokio::select! {
                _ = &mut all => break,
                _ = ticker.tick() => {
                    let reading = estimator.observe(self.counter.total(), self.clock.elapsed_ms());
                    if let Some(sample) = reading {
                        // A slow host loses samples rather than stalling the streams.
                        let _ = progress_tx.try_send(TestUpdate::ThroughputProgress {
                            direction,
                            fraction: self.clock.fraction_of(self.budget),
                            sample,
                        });
                    }
                }
            }
        }

        let result = ThroughputResult::new(self.counter.total(), self.clock.elapsed());
        if self.cancel.is_cancelled() {
            info!(?direction, bytes = result.total_bytes, "phase cancelled");
        } else if result.is_empty() {
            warn!(?direction, "no bytes transferred");
        } else {
            info!(
                ?direction,
                bytes = result.total_bytes,
                elapsed_ms = result.elapsed.as_millis() as u64,
                mbps = result.mbps,
                "phase done"
            );
        }
        result
    }
}
