use super::throughput::{PhaseWindow, ThroughputResult};
use super::transport::Transport;
use super::{Direction, TestUpdate};
use crate::settings::Settings;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep_until;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct DownloadTest {
    streams: usize,
    duration: Duration,
    payload_bytes: u64,
    sample_interval: Duration,
}

impl DownloadTest {
    pub fn new(streams: usize, duration: Duration, payload_bytes: u64) -> Self {
        Self {
            streams,
            duration,
            payload_bytes,
            sample_interval: Duration::from_millis(200),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.download_streams,
            settings.download_duration,
            settings.download_payload_bytes,
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
        let streams =
            (0..self.streams).map(|id| download_stream(id, transport, &window, self.payload_bytes));
        window
            .drive(Direction::Download, streams, self.sample_interval, progress_tx)
            .await
    }
}

/// Fetch `payload_bytes` bodies back to back until the window closes,
/// counting every chunk as it arrives. Reads still pending at the deadline
/// are abandoned; any failure ends this stream only.
async fn download_stream(id: usize, transport: &dyn Transport, window: &PhaseWindow<'_>, payload_bytes: u64) {
    let cancel = window.cancel();
    let deadline = window.deadline();

    while !window.should_stop() {
        let response = tokio::select! {
            _ = cancel.cancelled() => return,
            _ = sleep_until(deadline) => return,
            response = transport.download(payload_bytes) => response,
        };
        let mut body = match response {
            Ok(body) => body,
            Err(e) => {
                debug!(stream = id, error = %e, "download request failed");
                return;
            }
        };

        loop {
            if cancel.is_cancelled() {
                return;
            }
            let next = tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep_until(deadline) => return,
                next = body.next() => next,
            };
            match next {
                Some(Ok(chunk)) => window.counter().add(chunk.len() as u64),
                Some(Err(e)) => {
                    debug!(stream = id, error = %e, "download read failed");
                    return;
                }
                None => break,
            }
        }
    }
}
