use super::throughput::{PhaseWindow, ThroughputResult};
use super::transport::Transport;
use super::{Direction, TestUpdate};
use crate::settings::Settings;
use bytes::Bytes;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct UploadTest {
    data: Bytes,
    streams: usize,
    duration: Duration,
    sample_interval: Duration,
}

impl UploadTest {
    pub fn new(streams: usize, duration: Duration, payload_bytes: usize) -> Self {
        let mut rng = rand::rngs::StdRng::from_entropy();
        let mut data = vec![0u8; payload_bytes];
        rng.fill(&mut data[..]);
        Self {
            data: Bytes::from(data),
            streams,
            duration,
            sample_interval: Duration::from_millis(200),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.upload_streams,
            settings.upload_duration,
            settings.upload_payload_bytes,
        )
        .with_sample_interval(settings.sample_interval)
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub async fn run(
        &self,
        transport: &dyn Transport,
        cancel: &CancellationToken,
        progress_tx: &mpsc::Sender<TestUpdate>,
    ) -> ThroughputResult {
        let window = PhaseWindow::open(self.duration, cancel);
        let streams = (0..self.streams).map(|id| upload_stream(id, transport, &window, &self.data));
        window
            .drive(Direction::Upload, streams, self.sample_interval, progress_tx)
            .await
    }
}

/// POST the payload back to back until the window closes. A POST that
/// completes after the budget still counts.
async fn upload_stream(id: usize, transport: &dyn Transport, window: &PhaseWindow<'_>, payload: &Bytes) {
    let cancel = window.cancel();

    while !window.should_stop() {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return,
            outcome = transport.upload(payload.clone()) => outcome,
        };
        match outcome {
            Ok(()) => window.counter().add(payload.len() as u64),
            Err(e) => {
                debug!(stream = id, error = %e, "upload request failed");
                return;
            }
        }
    }
}
