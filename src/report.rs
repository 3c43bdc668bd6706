//! Human-readable rendering of results, shared by both hosts.

use crate::speedtest::session::Session;
use crate::speedtest::FinalResult;
use std::fmt::Write;

const UNSET: &str = "—";

/// Whole milliseconds, or a dash when unset.
pub fn format_latency(ms: Option<f64>) -> String {
    match ms {
        Some(ms) => format!("{:.0} ms", ms),
        None => UNSET.to_string(),
    }
}

/// Two decimals in Mbps, or a dash when unset.
pub fn format_rate(mbps: Option<f64>) -> String {
    match mbps {
        Some(mbps) => format!("{:.2} Mbps", mbps),
        None => UNSET.to_string(),
    }
}

/// Compact live reading for the gauge.
pub fn format_speed(mbps: f64) -> String {
    if mbps >= 1000.0 {
        format!("{:.2} Gbps", mbps / 1000.0)
    } else if mbps > 0.0 {
        format!("{:.1} Mbps", mbps)
    } else {
        UNSET.to_string()
    }
}

/// Upper bound of the gauge scale for a live reading.
pub fn gauge_scale(mbps: f64) -> f64 {
    if mbps > 500.0 {
        1000.0
    } else if mbps > 100.0 {
        500.0
    } else {
        100.0
    }
}

pub fn summary(result: &FinalResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Ping:     {}", format_latency(result.ping_ms));
    let _ = writeln!(out, "Jitter:   {}", format_latency(result.jitter_ms));
    let _ = writeln!(out, "Download: {}", format_rate(result.download_mbps));
    let _ = writeln!(out, "Upload:   {}", format_rate(result.upload_mbps));
    out
}

pub fn session_summary(session: &Session) -> String {
    let mut out = format!("Status:   {:?}\n", session.phase());
    if let Some(started) = session.started_at() {
        let _ = writeln!(out, "Elapsed:  {:.1} s", started.elapsed().as_secs_f64());
    }
    out.push_str(&summary(session.result()));
    out
}
