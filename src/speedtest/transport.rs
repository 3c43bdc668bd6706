//! Network operations used by the measurement phases.
//!
//! [`Transport`] is the seam between the measurement logic and the wire:
//! [`HttpTransport`] talks to the real endpoints with reqwest, tests plug in
//! a scripted implementation.

use crate::error::{Result, SpeedTestError};
use crate::settings::Settings;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use std::time::Duration;
use tracing::debug;

/// Body of a download response, yielded chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// One minimal round trip to the latency endpoint.
    async fn probe(&self) -> Result<()>;

    /// Request `bytes` bytes from the download endpoint and return the body
    /// stream once headers arrive.
    async fn download(&self, bytes: u64) -> Result<ByteStream>;

    /// POST `payload` to the upload endpoint and wait for the response.
    async fn upload(&self, payload: Bytes) -> Result<()>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    ping_url: String,
    download_url: String,
    upload_url: String,
    probe_timeout: Duration,
}

impl HttpTransport {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            ping_url: settings.ping_url.clone(),
            download_url: settings.download_url.clone(),
            upload_url: settings.upload_url.clone(),
            probe_timeout: settings.probe_timeout,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn probe(&self) -> Result<()> {
        let response = self
            .client
            .get(&self.ping_url)
            .timeout(self.probe_timeout)
            .send()
            .await?
            .error_for_status()?;
        // Round trip ends when the (tiny) body is in.
        response.bytes().await?;
        Ok(())
    }

    async fn download(&self, bytes: u64) -> Result<ByteStream> {
        let response = self
            .client
            .get(&self.download_url)
            .query(&[("bytes", bytes)])
            .send()
            .await?
            .error_for_status()?;
        debug!(status = %response.status(), bytes, "download response");
        Ok(response.bytes_stream().map_err(SpeedTestError::from).boxed())
    }

    async fn upload(&self, payload: Bytes) -> Result<()> {
        self.client
            .post(&self.upload_url)
            .body(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
