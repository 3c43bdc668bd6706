pub mod chart;
pub mod clock;
pub mod download;
pub mod ping;
pub mod rate;
pub mod sequencer;
pub mod session;
pub mod throughput;
pub mod transport;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

use ping::LatencyStats;
use rate::RateSample;
use throughput::ThroughputResult;

/// The four scalars a session reports. Each stays `None` until the phase
/// that produces it completes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FinalResult {
    pub ping_ms: Option<f64>,
    pub jitter_ms: Option<f64>,
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPhase {
    Idle,
    Latency,
    Download,
    Upload,
    Complete,
}

impl TestPhase {
    pub fn is_running(self) -> bool {
        matches!(self, TestPhase::Latency | TestPhase::Download | TestPhase::Upload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
}

impl Direction {
    pub fn phase(self) -> TestPhase {
        match self {
            Direction::Download => TestPhase::Download,
            Direction::Upload => TestPhase::Upload,
        }
    }
}

/// Events a running measurement sends to its host.
#[derive(Debug, Clone)]
pub enum TestUpdate {
    PhaseStarted(TestPhase),
    LatencyProgress {
        completed: usize,
        total: usize,
        sample_ms: Option<f64>,
    },
    LatencyComplete(LatencyStats),
    ThroughputProgress {
        direction: Direction,
        /// Share of the phase's time budget already used, `0..=1`
        fraction: f64,
        sample: RateSample,
    },
    ThroughputComplete {
        direction: Direction,
        result: ThroughputResult,
    },
    Finished,
}
