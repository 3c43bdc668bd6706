use crate::error::{Result, SpeedTestError};
use crate::speedtest::chart::DEFAULT_CHART_CAPACITY;
use std::time::Duration;

pub const DEFAULT_PING_URL: &str = "https://1.1.1.1/cdn-cgi/trace";
pub const DEFAULT_DOWNLOAD_URL: &str = "https://speed.cloudflare.com/__down";
pub const DEFAULT_UPLOAD_URL: &str = "https://speed.cloudflare.com/__up";

#[derive(Debug, Clone)]
pub struct Settings {
    pub ping_url: String,
    pub ping_count: usize,
    pub probe_timeout: Duration,

    pub download_url: String,
    pub download_streams: usize,
    pub download_duration: Duration,
    pub download_payload_bytes: u64,

    pub upload_url: String,
    pub upload_streams: usize,
    pub upload_duration: Duration,
    pub upload_payload_bytes: usize,

    pub connect_timeout: Duration,
    pub sample_interval: Duration,
    pub chart_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ping_url: DEFAULT_PING_URL.to_string(),
            ping_count: 10,
            probe_timeout: Duration::from_secs(5),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            download_streams: 4,
            download_duration: Duration::from_secs(10),
            download_payload_bytes: 25_000_000,
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            upload_streams: 2,
            upload_duration: Duration::from_secs(8),
            upload_payload_bytes: 1024 * 1024,
            connect_timeout: Duration::from_secs(10),
            sample_interval: Duration::from_millis(200),
            chart_capacity: DEFAULT_CHART_CAPACITY,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let checks: [(bool, &str); 9] = [
            (self.ping_count > 0, "ping count must be at least 1"),
            (self.download_streams > 0, "download streams must be at least 1"),
            (self.upload_streams > 0, "upload streams must be at least 1"),
            (!self.download_duration.is_zero(), "download duration must be non-zero"),
            (!self.upload_duration.is_zero(), "upload duration must be non-zero"),
            (self.download_payload_bytes > 0, "download payload must be non-empty"),
            (self.upload_payload_bytes > 0, "upload payload must be non-empty"),
            (!self.sample_interval.is_zero(), "sample interval must be non-zero"),
            (self.chart_capacity > 0, "chart capacity must be at least 1"),
        ];

        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, reason)) => Err(SpeedTestError::Config(reason.to_string())),
            None => Ok(()),
        }
    }

    pub fn increase(&mut self, field: SettingsField) {
        match field {
            SettingsField::PingCount => {
                self.ping_count = (self.ping_count + 5).min(50);
            }
            SettingsField::DownloadStreams => {
                self.download_streams = (self.download_streams + 1).min(16);
            }
            SettingsField::DownloadDuration => {
                self.download_duration = (self.download_duration + Duration::from_secs(5))
                    .min(Duration::from_secs(60));
            }
            SettingsField::UploadStreams => {
                self.upload_streams = (self.upload_streams + 1).min(8);
            }
            SettingsField::UploadDuration => {
                self.upload_duration = (self.upload_duration + Duration::from_secs(5))
                    .min(Duration::from_secs(60));
            }
        }
    }

    pub fn decrease(&mut self, field: SettingsField) {
        match field {
            SettingsField::PingCount => {
                self.ping_count = self.ping_count.saturating_sub(5).max(5);
            }
            SettingsField::DownloadStreams => {
                self.download_streams = self.download_streams.saturating_sub(1).max(1);
            }
            SettingsField::DownloadDuration => {
                self.download_duration = self
                    .download_duration
                    .saturating_sub(Duration::from_secs(5))
                    .max(Duration::from_secs(5));
            }
            SettingsField::UploadStreams => {
                self.upload_streams = self.upload_streams.saturating_sub(1).max(1);
            }
            SettingsField::UploadDuration => {
                self.upload_duration = self
                    .upload_duration
                    .saturating_sub(Duration::from_secs(5))
                    .max(Duration::from_secs(5));
            }
        }
    }
}

/// Command line / environment overrides for [`Settings`].
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SettingsArgs {
    /// Latency endpoint
    #[arg(long, env = "SPEEDGAUGE_PING_URL")]
    pub ping_url: Option<String>,

    /// Number of latency round trips
    #[arg(long, env = "SPEEDGAUGE_PING_COUNT")]
    pub ping_count: Option<usize>,

    /// Per-probe timeout, e.g. "5s"
    #[arg(long, env = "SPEEDGAUGE_PROBE_TIMEOUT", value_parser = humantime::parse_duration)]
    pub probe_timeout: Option<Duration>,

    /// Download endpoint (takes a `bytes` query parameter)
    #[arg(long, env = "SPEEDGAUGE_DOWNLOAD_URL")]
    pub download_url: Option<String>,

    /// Concurrent download streams
    #[arg(long, env = "SPEEDGAUGE_DOWNLOAD_STREAMS")]
    pub download_streams: Option<usize>,

    /// Download phase duration, e.g. "10s"
    #[arg(long, env = "SPEEDGAUGE_DOWNLOAD_DURATION", value_parser = humantime::parse_duration)]
    pub download_duration: Option<Duration>,

    /// Bytes requested per download request
    #[arg(long, env = "SPEEDGAUGE_DOWNLOAD_PAYLOAD")]
    pub download_payload: Option<u64>,

    /// Upload endpoint
    #[arg(long, env = "SPEEDGAUGE_UPLOAD_URL")]
    pub upload_url: Option<String>,

    /// Concurrent upload streams
    #[arg(long, env = "SPEEDGAUGE_UPLOAD_STREAMS")]
    pub upload_streams: Option<usize>,

    /// Upload phase duration, e.g. "8s"
    #[arg(long, env = "SPEEDGAUGE_UPLOAD_DURATION", value_parser = humantime::parse_duration)]
    pub upload_duration: Option<Duration>,

    /// Bytes sent per upload request
    #[arg(long, env = "SPEEDGAUGE_UPLOAD_PAYLOAD")]
    pub upload_payload: Option<usize>,

    /// Connection setup timeout, e.g. "10s"
    #[arg(long, env = "SPEEDGAUGE_CONNECT_TIMEOUT", value_parser = humantime::parse_duration)]
    pub connect_timeout: Option<Duration>,

    /// Interval between live rate samples, e.g. "200ms"
    #[arg(long, env = "SPEEDGAUGE_SAMPLE_INTERVAL", value_parser = humantime::parse_duration)]
    pub sample_interval: Option<Duration>,
}

impl SettingsArgs {
    /// Apply the overrides on top of the defaults and validate the result.
    pub fn into_settings(self) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(v) = self.ping_url {
            settings.ping_url = v;
        }
        if let Some(v) = self.ping_count {
            settings.ping_count = v;
        }
        if let Some(v) = self.probe_timeout {
            settings.probe_timeout = v;
        }
        if let Some(v) = self.download_url {
            settings.download_url = v;
        }
        if let Some(v) = self.download_streams {
            settings.download_streams = v;
        }
        if let Some(v) = self.download_duration {
            settings.download_duration = v;
        }
        if let Some(v) = self.download_payload {
            settings.download_payload_bytes = v;
        }
        if let Some(v) = self.upload_url {
            settings.upload_url = v;
        }
        if let Some(v) = self.upload_streams {
            settings.upload_streams = v;
        }
        if let Some(v) = self.upload_duration {
            settings.upload_duration = v;
        }
        if let Some(v) = self.upload_payload {
            settings.upload_payload_bytes = v;
        }
        if let Some(v) = self.connect_timeout {
            settings.connect_timeout = v;
        }
        if let Some(v) = self.sample_interval {
            settings.sample_interval = v;
        }

        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    PingCount,
    DownloadStreams,
    DownloadDuration,
    UploadStreams,
    UploadDuration,
}

impl SettingsField {
    pub const ALL: [SettingsField; 5] = [
        SettingsField::PingCount,
        SettingsField::DownloadStreams,
        SettingsField::DownloadDuration,
        SettingsField::UploadStreams,
        SettingsField::UploadDuration,
    ];

    pub fn next(self) -> Self {
        match self {
            SettingsField::PingCount => SettingsField::DownloadStreams,
            SettingsField::DownloadStreams => SettingsField::DownloadDuration,
            SettingsField::DownloadDuration => SettingsField::UploadStreams,
            SettingsField::UploadStreams => SettingsField::UploadDuration,
            SettingsField::UploadDuration => SettingsField::PingCount,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SettingsField::PingCount => SettingsField::UploadDuration,
            SettingsField::DownloadStreams => SettingsField::PingCount,
            SettingsField::DownloadDuration => SettingsField::DownloadStreams,
            SettingsField::UploadStreams => SettingsField::DownloadDuration,
            SettingsField::UploadDuration => SettingsField::UploadStreams,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SettingsField::PingCount => "Ping samples",
            SettingsField::DownloadStreams => "Download streams",
            SettingsField::DownloadDuration => "Download time",
            SettingsField::UploadStreams => "Upload streams",
            SettingsField::UploadDuration => "Upload time",
        }
    }

    pub fn value(self, settings: &Settings) -> String {
        match self {
            SettingsField::PingCount => settings.ping_count.to_string(),
            SettingsField::DownloadStreams => settings.download_streams.to_string(),
            SettingsField::DownloadDuration => format!("{} s", settings.download_duration.as_secs()),
            SettingsField::UploadStreams => settings.upload_streams.to_string(),
            SettingsField::UploadDuration => format!("{} s", settings.upload_duration.as_secs()),
        }
    }
}
