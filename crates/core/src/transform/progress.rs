//! Transcode progress.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Fractional completion of a running transcode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    fraction: f64,
}

impl ProgressEvent {
    /// Creates an event, clamping `fraction` into [0.0, 1.0].
    pub fn new(fraction: f64) -> Self {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        Self { fraction }
    }

    /// The event sent once the process has exited successfully.
    pub fn complete() -> Self {
        Self { fraction: 1.0 }
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Percentage rounded to one decimal.
    pub fn percent(&self) -> f64 {
        (self.fraction * 1000.0).round() / 10.0
    }
}

/// Turns ffmpeg `-progress` output into progress events.
///
/// Only `out_time_ms` lines are used. Despite the name ffmpeg reports them
/// in microseconds.
#[derive(Debug)]
pub struct ProgressParser {
    duration_secs: Option<f64>,
    time_regex: Option<Regex>,
    key_value_regex: Option<Regex>,
}

impl ProgressParser {
    pub fn new(duration_secs: Option<f64>) -> Self {
        Self {
            duration_secs: duration_secs.filter(|d| *d > 0.0),
            time_regex: Regex::new(r"^out_time_ms=(\d+)$").ok(),
            key_value_regex: Regex::new(r"^[a-z0-9_]+=\S*$").ok(),
        }
    }

    /// Returns an event for lines reporting elapsed output time.
    pub fn parse_line(&self, line: &str) -> Option<ProgressEvent> {
        let duration = self.duration_secs?;
        let caps = self.time_regex.as_ref()?.captures(line.trim())?;
        let micros = caps.get(1)?.as_str().parse::<f64>().ok()?;
        Some(ProgressEvent::new(micros / 1_000_000.0 / duration))
    }

    /// Whether the line belongs to the `-progress` key/value stream rather
    /// than to ffmpeg's diagnostics.
    pub fn is_progress_line(&self, line: &str) -> bool {
        self.key_value_regex
            .as_ref()
            .is_some_and(|re| re.is_match(line.trim()))
    }
}
