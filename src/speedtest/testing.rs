//! Scripted [`Transport`] for deterministic tests on a paused clock.

use super::transport::{ByteStream, Transport};
use crate::error::{Result, SpeedTestError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::io;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

pub enum ProbeScript {
    AlwaysFail,
    Constant(Duration),
    /// Call `i` takes `script[i]`, `None` fails; calls past the end fail.
    Sequence(Vec<Option<Duration>>),
}

pub enum DownloadScript {
    AlwaysFail,
    /// The first `failures` requests fail. The next `bodies` requests yield
    /// `chunks` chunks of `chunk` bytes, one every `every`. Later requests
    /// stall without ever yielding.
    Paced {
        failures: usize,
        bodies: usize,
        chunk: usize,
        chunks: usize,
        every: Duration,
    },
    /// Every request yields an endless body of `chunk`-byte chunks.
    Endless { chunk: usize, every: Duration },
}

pub enum UploadScript {
    AlwaysFail,
    /// Every POST takes the given time and succeeds.
    Constant(Duration),
}

pub struct FakeTransport {
    probes: ProbeScript,
    downloads: DownloadScript,
    uploads: UploadScript,
    probe_calls: AtomicUsize,
    download_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    uploaded_bytes: AtomicU64,
}

fn refused() -> SpeedTestError {
    SpeedTestError::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "scripted failure"))
}

fn paced_body(chunk: usize, chunks: Option<usize>, every: Duration) -> ByteStream {
    futures::stream::unfold(0usize, move |sent| async move {
        if chunks.is_some_and(|limit| sent >= limit) {
            return None;
        }
        tokio::time::sleep(every).await;
        Some((Ok(Bytes::from(vec![0u8; chunk])), sent + 1))
    })
    .boxed()
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            probes: ProbeScript::Constant(Duration::from_millis(10)),
            downloads: DownloadScript::AlwaysFail,
            uploads: UploadScript::AlwaysFail,
            probe_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            uploaded_bytes: AtomicU64::new(0),
        }
    }

    pub fn with_probes(mut self, script: ProbeScript) -> Self {
        self.probes = script;
        self
    }

    pub fn with_downloads(mut self, script: DownloadScript) -> Self {
        self.downloads = script;
        self
    }

    pub fn with_uploads(mut self, script: UploadScript) -> Self {
        self.uploads = script;
        self
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn probe(&self) -> Result<()> {
        let call = self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let delay = match &self.probes {
            ProbeScript::AlwaysFail => None,
            ProbeScript::Constant(d) => Some(*d),
            ProbeScript::Sequence(script) => script.get(call).copied().flatten(),
        };
        match delay {
            Some(d) => {
                tokio::time::sleep(d).await;
                Ok(())
            }
            None => Err(refused()),
        }
    }

    async fn download(&self, _bytes: u64) -> Result<ByteStream> {
        let call = self.download_calls.fetch_add(1, Ordering::SeqCst);
        match &self.downloads {
            DownloadScript::AlwaysFail => Err(refused()),
            DownloadScript::Paced {
                failures,
                bodies,
                chunk,
                chunks,
                every,
            } => {
                if call < *failures {
                    Err(refused())
                } else if call < failures + bodies {
                    Ok(paced_body(*chunk, Some(*chunks), *every))
                } else {
                    Ok(futures::stream::pending().boxed())
                }
            }
            DownloadScript::Endless { chunk, every } => Ok(paced_body(*chunk, None, *every)),
        }
    }

    async fn upload(&self, payload: Bytes) -> Result<()> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        match &self.uploads {
            UploadScript::AlwaysFail => Err(refused()),
            UploadScript::Constant(d) => {
                tokio::time::sleep(*d).await;
                self.uploaded_bytes
                    .fetch_add(payload.len() as u64, Ordering::SeqCst);
                Ok(())
            }
        }
    }
}
