use super::clock::SampleClock;
use super::transport::Transport;
use super::TestUpdate;
use crate::settings::Settings;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Round-trip times in collection order, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencySamples {
    samples: Vec<f64>,
}

impl LatencySamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rtt_ms: f64) {
        self.samples.push(rtt_ms);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Best-case latency: the minimum sample.
    pub fn ping(&self) -> Option<f64> {
        self.samples.iter().copied().reduce(f64::min)
    }

    /// Mean absolute difference between consecutive samples. Needs two samples.
    pub fn jitter(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let total: f64 = self
            .samples
            .windows(2)
            .map(|pair| (pair[0] - pair[1]).abs())
            .sum();
        Some(total / (self.samples.len() - 1) as f64)
    }

    pub fn stats(&self) -> LatencyStats {
        LatencyStats {
            ping_ms: self.ping(),
            jitter_ms: self.jitter(),
            samples: self.samples.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyStats {
    pub ping_ms: Option<f64>,
    pub jitter_ms: Option<f64>,
    pub samples: Vec<f64>,
}

pub struct LatencyProber {
    ping_count: usize,
}

impl LatencyProber {
    pub fn new(ping_count: usize) -> Self {
        Self { ping_count }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.ping_count)
    }

    /// Run `ping_count` sequential probes. Failed probes are dropped; the
    /// loop only stops early on cancellation.
    pub async fn run(
        &self,
        transport: &dyn Transport,
        cancel: &CancellationToken,
        progress_tx: &mpsc::Sender<TestUpdate>,
    ) -> LatencyStats {
        let mut samples = LatencySamples::new();

        for i in 0..self.ping_count {
            if cancel.is_cancelled() {
                break;
            }

            let clock = SampleClock::start();
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = transport.probe() => outcome,
            };

            let sample_ms = match outcome {
                Ok(()) => {
                    let rtt = clock.elapsed_ms();
                    samples.push(rtt);
                    Some(rtt)
                }
                Err(e) => {
                    debug!(iteration = i, error = %e, "latency probe failed");
                    None
                }
            };

            let _ = progress_tx
                .send(TestUpdate::LatencyProgress {
                    completed: i + 1,
                    total: self.ping_count,
                    sample_ms,
                })
                .await;
        }

        let stats = samples.stats();
        if samples.is_empty() {
            warn!(attempts = self.ping_count, "no latency probe succeeded");
        } else {
            info!(
                ping_ms = ?stats.ping_ms,
                jitter_ms = ?stats.jitter_ms,
                samples = samples.len(),
                "latency phase done"
            );
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speedtest::testing::{FakeTransport, ProbeScript};
    use std::time::Duration;

    fn samples(values: &[f64]) -> LatencySamples {
        let mut s = LatencySamples::new();
        for v in values {
            s.push(*v);
        }
        s
    }

    #[test]
    fn ping_is_minimum_not_mean_or_last() {
        let s = samples(&[40.0, 12.0, 55.0, 30.0]);
        assert_eq!(s.ping(), Some(12.0));
    }

    #[test]
    fn jitter_averages_consecutive_differences() {
        // |20-30| + |30-25| + |25-45| = 35 over 3 pairs
        let s = samples(&[20.0, 30.0, 25.0, 45.0]);
        let jitter = s.jitter().unwrap();
        assert!((jitter - 35.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn jitter_needs_two_samples() {
        let single = samples(&[18.0]);
        assert_eq!(single.ping(), Some(18.0));
        assert_eq!(single.jitter(), None);

        let empty = LatencySamples::new();
        assert_eq!(empty.ping(), None);
        assert_eq!(empty.jitter(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probes_are_dropped_but_loop_runs_full_count() {
        let transport = FakeTransport::new().with_probes(ProbeScript::Sequence(vec![
            Some(Duration::from_millis(30)),
            None,
            Some(Duration::from_millis(10)),
            None,
            Some(Duration::from_millis(20)),
        ]));
        let (tx, mut rx) = mpsc::channel(64);

        let stats = LatencyProber::new(10)
            .run(&transport, &CancellationToken::new(), &tx)
            .await;
        drop(tx);

        assert_eq!(transport.probe_calls(), 10);
        assert_eq!(stats.samples.len(), 3);
        assert!((stats.ping_ms.unwrap() - 10.0).abs() < 1.5);
        // |30-10| + |10-20| over 2 pairs
        assert!((stats.jitter_ms.unwrap() - 15.0).abs() < 1.5);

        let mut progress = Vec::new();
        while let Some(update) = rx.recv().await {
            if let TestUpdate::LatencyProgress { completed, .. } = update {
                progress.push(completed);
            }
        }
        assert_eq!(progress, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn all_failures_leave_results_unset() {
        let transport = FakeTransport::new().with_probes(ProbeScript::AlwaysFail);
        let (tx, _rx) = mpsc::channel(64);

        let stats = LatencyProber::new(10)
            .run(&transport, &CancellationToken::new(), &tx)
            .await;

        assert_eq!(transport.probe_calls(), 10);
        assert!(stats.samples.is_empty());
        assert_eq!(stats.ping_ms, None);
        assert_eq!(stats.jitter_ms, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_probing() {
        let transport = FakeTransport::new()
            .with_probes(ProbeScript::Constant(Duration::from_millis(100)));
        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::channel(64);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            trigger.cancel();
        });

        let stats = LatencyProber::new(10).run(&transport, &cancel, &tx).await;
        assert_eq!(stats.samples.len(), 2);
        assert!(transport.probe_calls() < 10);
    }
}
