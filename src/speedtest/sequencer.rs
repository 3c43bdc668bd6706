//! Runs the phases in order and hands their updates to the host's session.

use super::download::DownloadTest;
use super::ping::LatencyProber;
use super::session::Session;
use super::transport::Transport;
use super::upload::UploadTest;
use super::{Direction, TestPhase, TestUpdate};
use crate::settings::Settings;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

const UPDATE_BUFFER: usize = 64;

/// Latency, then download, then upload. Stops at the first phase boundary
/// after `cancel` fires without announcing further phases.
pub async fn run_speed_test(
    transport: Arc<dyn Transport>,
    settings: Settings,
    cancel: CancellationToken,
    update_tx: mpsc::Sender<TestUpdate>,
) {
    let _ = update_tx
        .send(TestUpdate::PhaseStarted(TestPhase::Latency))
        .await;
    let latency = LatencyProber::from_settings(&settings)
        .run(transport.as_ref(), &cancel, &update_tx)
        .await;
    if cancel.is_cancelled() {
        info!("speed test cancelled during latency phase");
        return;
    }
    let _ = update_tx.send(TestUpdate::LatencyComplete(latency)).await;

    let _ = update_tx
        .send(TestUpdate::PhaseStarted(TestPhase::Download))
        .await;
    let download = DownloadTest::from_settings(&settings)
        .run(transport.as_ref(), &cancel, &update_tx)
        .await;
    if cancel.is_cancelled() {
        info!("speed test cancelled during download phase");
        return;
    }
    let _ = update_tx
        .send(TestUpdate::ThroughputComplete {
            direction: Direction::Download,
            result: download,
        })
        .await;

    let _ = update_tx
        .send(TestUpdate::PhaseStarted(TestPhase::Upload))
        .await;
    let upload = UploadTest::from_settings(&settings)
        .run(transport.as_ref(), &cancel, &update_tx)
        .await;
    if cancel.is_cancelled() {
        info!("speed test cancelled during upload phase");
        return;
    }
    let _ = update_tx
        .send(TestUpdate::ThroughputComplete {
            direction: Direction::Upload,
            result: upload,
        })
        .await;

    info!("speed test complete");
    let _ = update_tx.send(TestUpdate::Finished).await;
}

struct ActiveRun {
    cancel: CancellationToken,
    updates: mpsc::Receiver<TestUpdate>,
}

/// Owns the in-flight run, if any, and feeds its updates into a [`Session`].
pub struct PhaseSequencer {
    transport: Arc<dyn Transport>,
    active: Option<ActiveRun>,
}

impl PhaseSequencer {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            active: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Discard any run in flight, reset `session` and start a fresh run.
    pub fn start(&mut self, session: &mut Session, settings: Settings) {
        self.abandon();
        session.begin();

        let (update_tx, updates) = mpsc::channel(UPDATE_BUFFER);
        let cancel = CancellationToken::new();
        tokio::spawn(run_speed_test(
            Arc::clone(&self.transport),
            settings,
            cancel.clone(),
            update_tx,
        ));
        info!("speed test started");

        self.active = Some(ActiveRun { cancel, updates });
    }

    /// Stop the run in flight. Results already in `session` are kept.
    pub fn cancel(&mut self, session: &mut Session) {
        if self.abandon() {
            info!("speed test cancelled");
        }
        session.cancel();
    }

    /// Apply every update already queued. Returns how many were applied.
    pub fn pump(&mut self, session: &mut Session) -> usize {
        let mut applied = 0;
        while let Some(active) = self.active.as_mut() {
            match active.updates.try_recv() {
                Ok(update) => {
                    session.apply(update);
                    applied += 1;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.active = None;
                }
            }
        }
        applied
    }

    /// Wait for the next update and apply it. Returns `false` once the run
    /// has ended and every update has been applied.
    pub async fn next(&mut self, session: &mut Session) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        match active.updates.recv().await {
            Some(update) => {
                session.apply(update);
                true
            }
            None => {
                self.active = None;
                false
            }
        }
    }

    /// Trip the token of the run in flight and drop its update channel.
    fn abandon(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                // The task exits at its next suspension point; nothing
                // waits for it.
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speedtest::testing::{DownloadScript, FakeTransport, ProbeScript, UploadScript};
    use crate::speedtest::FinalResult;
    use std::time::Duration;

    fn fast_settings() -> Settings {
        Settings {
            ping_count: 3,
            download_streams: 2,
            download_duration: Duration::from_secs(2),
            upload_streams: 2,
            upload_duration: Duration::from_secs(2),
            upload_payload_bytes: 1000,
            ..Settings::default()
        }
    }

    fn working_transport() -> Arc<FakeTransport> {
        Arc::new(
            FakeTransport::new()
                .with_probes(ProbeScript::Constant(Duration::from_millis(20)))
                .with_downloads(DownloadScript::Endless {
                    chunk: 125_000,
                    every: Duration::from_millis(150),
                })
                .with_uploads(UploadScript::Constant(Duration::from_millis(100))),
        )
    }

    async fn run_until(
        sequencer: &mut PhaseSequencer,
        session: &mut Session,
        phase: TestPhase,
    ) {
        while session.phase() != phase {
            assert!(sequencer.next(session).await, "run ended before {phase:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_run_reaches_complete_with_all_results() {
        let transport = working_transport();
        let mut sequencer = PhaseSequencer::new(transport.clone());
        let mut session = Session::default();

        sequencer.start(&mut session, fast_settings());
        while sequencer.next(&mut session).await {}

        assert_eq!(session.phase(), TestPhase::Complete);
        assert_eq!(session.progress(), 100.0);
        assert!(!sequencer.is_running());

        let result = session.result();
        assert!((result.ping_ms.unwrap() - 20.0).abs() < 1.5);
        assert!(result.jitter_ms.unwrap() < 1.5);
        // 2 streams x 13 chunks x 125 kB over 2 s = 13 Mbps
        assert!((result.download_mbps.unwrap() - 13.0).abs() < 0.5);
        // 2 streams x 1000 B / 100 ms = 0.16 Mbps
        assert!((result.upload_mbps.unwrap() - 0.16).abs() < 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_download_keeps_results_and_skips_upload() {
        let transport = working_transport();
        let mut sequencer = PhaseSequencer::new(transport.clone());
        let mut session = Session::default();

        sequencer.start(&mut session, fast_settings());
        run_until(&mut sequencer, &mut session, TestPhase::Download).await;
        assert!(sequencer.next(&mut session).await);

        sequencer.cancel(&mut session);
        assert_eq!(session.phase(), TestPhase::Idle);
        assert!(!sequencer.is_running());

        // Give the abandoned task ample time to run on if it were going to.
        tokio::time::sleep(Duration::from_secs(30)).await;
        sequencer.pump(&mut session);

        assert_eq!(transport.upload_calls(), 0);
        assert_eq!(session.phase(), TestPhase::Idle);
        let result = session.result();
        assert!(result.ping_ms.is_some());
        assert!(result.jitter_ms.is_some());
        assert_eq!(result.download_mbps, None);
        assert_eq!(result.upload_mbps, None);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_resets_results_before_first_phase() {
        let transport = working_transport();
        let mut sequencer = PhaseSequencer::new(transport.clone());
        let mut session = Session::default();

        sequencer.start(&mut session, fast_settings());
        run_until(&mut sequencer, &mut session, TestPhase::Upload).await;
        assert!(session.result().download_mbps.is_some());

        sequencer.start(&mut session, fast_settings());
        assert_eq!(session.phase(), TestPhase::Latency);
        assert_eq!(session.result(), &FinalResult::default());
        assert_eq!(session.progress(), 0.0);

        while sequencer.next(&mut session).await {}
        assert_eq!(session.phase(), TestPhase::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn total_failure_completes_with_unset_results() {
        let transport = Arc::new(FakeTransport::new().with_probes(ProbeScript::AlwaysFail));
        let mut sequencer = PhaseSequencer::new(transport.clone());
        let mut session = Session::default();

        sequencer.start(&mut session, fast_settings());
        while sequencer.next(&mut session).await {}

        assert_eq!(session.phase(), TestPhase::Complete);
        assert_eq!(session.result(), &FinalResult::default());
        assert_eq!(transport.probe_calls(), 3);
        assert_eq!(transport.download_calls(), 2);
        assert_eq!(transport.upload_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pump_drains_without_blocking() {
        let transport = working_transport();
        let mut sequencer = PhaseSequencer::new(transport.clone());
        let mut session = Session::default();

        assert_eq!(sequencer.pump(&mut session), 0);
        sequencer.start(&mut session, fast_settings());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sequencer.pump(&mut session) > 0);
        assert!(!session.latency_samples().is_empty());
    }
}
