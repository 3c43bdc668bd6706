//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over the `--log-level` default. The
//! interactive UI owns the terminal, so it only logs when a file is given.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub enum LogTarget<'a> {
    Off,
    Stderr,
    File(&'a Path),
}

pub fn init(level: LevelFilter, target: LogTarget<'_>) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let installed = match target {
        LogTarget::Off => return Ok(()),
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_line_number(true)
            .try_init(),
        LogTarget::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_line_number(true)
                .try_init()
        }
    };

    installed.map_err(|e| anyhow!("failed to initialise logging: {e}"))
}
