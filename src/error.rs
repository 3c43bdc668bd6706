//! Error types for speedgauge

use thiserror::Error;

/// Errors raised by the measurement core.
///
/// Network failures never reach the session: the prober and the streams
/// consume them and drop the sample or end the stream.
#[derive(Error, Debug)]
pub enum SpeedTestError {
    /// HTTP transport error (connect, status, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error (log file, socket)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid settings
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for SpeedTestError
pub type Result<T> = std::result::Result<T, SpeedTestError>;
