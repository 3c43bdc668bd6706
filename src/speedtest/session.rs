use super::chart::RateChart;
use super::{Direction, FinalResult, TestPhase, TestUpdate};
use tokio::time::Instant;

/// Share of overall progress covered by the latency phase.
const LATENCY_END: f64 = 10.0;
/// Overall progress at which the download phase ends and upload begins.
const DOWNLOAD_END: f64 = 55.0;

/// State of one measurement run as seen by the host.
#[derive(Debug, Clone)]
pub struct Session {
    phase: TestPhase,
    started_at: Option<Instant>,
    progress: f64,
    current_mbps: f64,
    result: FinalResult,
    latency_samples: Vec<f64>,
    chart: RateChart,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(RateChart::default())
    }
}

impl Session {
    pub fn new(chart: RateChart) -> Self {
        Self {
            phase: TestPhase::Idle,
            started_at: None,
            progress: 0.0,
            current_mbps: 0.0,
            result: FinalResult::default(),
            latency_samples: Vec::new(),
            chart,
        }
    }

    pub fn with_chart_capacity(capacity: usize) -> Self {
        Self::new(RateChart::with_capacity(capacity))
    }

    pub fn phase(&self) -> TestPhase {
        self.phase
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Overall progress, `0..=100`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Latest instantaneous rate of the running throughput phase.
    pub fn current_mbps(&self) -> f64 {
        self.current_mbps
    }

    pub fn result(&self) -> &FinalResult {
        &self.result
    }

    pub fn latency_samples(&self) -> &[f64] {
        &self.latency_samples
    }

    pub fn chart(&self) -> &RateChart {
        &self.chart
    }

    /// Back to an empty idle session.
    pub fn reset(&mut self) {
        self.phase = TestPhase::Idle;
        self.started_at = None;
        self.progress = 0.0;
        self.current_mbps = 0.0;
        self.result = FinalResult::default();
        self.latency_samples.clear();
        self.chart.clear();
    }

    /// Reset and enter the first phase.
    pub fn begin(&mut self) {
        self.reset();
        self.phase = TestPhase::Latency;
        self.started_at = Some(Instant::now());
    }

    /// Stop where we are. Results computed so far stay readable.
    pub fn cancel(&mut self) {
        self.phase = TestPhase::Idle;
        self.current_mbps = 0.0;
    }

    pub fn apply(&mut self, update: TestUpdate) {
        if !self.phase.is_running() {
            return;
        }

        match update {
            TestUpdate::PhaseStarted(phase) => {
                self.phase = phase;
                match phase {
                    TestPhase::Download => self.enter_throughput(LATENCY_END),
                    TestPhase::Upload => self.enter_throughput(DOWNLOAD_END),
                    _ => {}
                }
            }
            TestUpdate::LatencyProgress {
                completed,
                total,
                sample_ms,
            } => {
                if let Some(rtt) = sample_ms {
                    self.latency_samples.push(rtt);
                }
                if total > 0 {
                    self.progress = completed as f64 / total as f64 * LATENCY_END;
                }
            }
            TestUpdate::LatencyComplete(stats) => {
                self.result.ping_ms = stats.ping_ms;
                self.result.jitter_ms = stats.jitter_ms;
                self.latency_samples = stats.samples;
                self.progress = LATENCY_END;
            }
            TestUpdate::ThroughputProgress {
                direction,
                fraction,
                sample,
            } => {
                if direction.phase() != self.phase {
                    return;
                }
                let (start, end) = progress_span(direction);
                self.progress = start + fraction.clamp(0.0, 1.0) * (end - start);
                self.current_mbps = sample.instant_mbps;
                self.chart.push(sample);
            }
            TestUpdate::ThroughputComplete { direction, result } => {
                // A phase that moved nothing reports no rate at all.
                let mbps = (!result.is_empty()).then_some(result.mbps);
                match direction {
                    Direction::Download => self.result.download_mbps = mbps,
                    Direction::Upload => self.result.upload_mbps = mbps,
                }
                self.progress = progress_span(direction).1;
            }
            TestUpdate::Finished => {
                self.phase = TestPhase::Complete;
                self.progress = 100.0;
                self.current_mbps = 0.0;
            }
        }
    }

    fn enter_throughput(&mut self, progress: f64) {
        self.chart.clear();
        self.current_mbps = 0.0;
        self.progress = progress;
    }
}

fn progress_span(direction: Direction) -> (f64, f64) {
    match direction {
        Direction::Download => (LATENCY_END, DOWNLOAD_END),
        Direction::Upload => (DOWNLOAD_END, 100.0),
    }
}
