//! Source metadata read with ffprobe.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::TranscoderError;

/// Arguments passed to ffprobe before the input path.
pub const FFPROBE_ARGS: [&str; 6] = [
    "-v",
    "error",
    "-print_format",
    "json",
    "-show_format",
    "-show_streams",
];

/// Basic information about a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub duration_secs: f64,
    /// Container format, e.g. "matroska".
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<u8>,
}

impl ProbeInfo {
    /// Resolution as `WIDTHxHEIGHT`, if there is a video stream.
    pub fn resolution(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
            _ => None,
        }
    }

    /// Whether ffprobe found at least one audio or video stream.
    pub fn is_valid(&self) -> bool {
        self.video_codec.is_some() || self.audio_codec.is_some()
    }
}

/// Parses `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_output(path: &Path, output: &str) -> Result<ProbeInfo, TranscoderError> {
    #[derive(Deserialize)]
    struct ProbeOutput {
        format: ProbeFormat,
        #[serde(default)]
        streams: Vec<ProbeStream>,
    }

    #[derive(Deserialize)]
    struct ProbeFormat {
        format_name: String,
        duration: Option<String>,
        size: Option<String>,
        bit_rate: Option<String>,
    }

    #[derive(Deserialize)]
    struct ProbeStream {
        codec_type: String,
        codec_name: Option<String>,
        sample_rate: Option<String>,
        channels: Option<u8>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }

    let probe: ProbeOutput =
        serde_json::from_str(output).map_err(|e| TranscoderError::ParseError {
            reason: format!("Failed to parse ffprobe output: {}", e),
        })?;

    let audio_stream = probe.streams.iter().find(|s| s.codec_type == "audio");
    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");

    let format_name = probe
        .format
        .format_name
        .split(',')
        .next()
        .unwrap_or("unknown");

    Ok(ProbeInfo {
        path: path.to_path_buf(),
        size_bytes: probe
            .format
            .size
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0),
        duration_secs: probe
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0),
        format: format_name.to_string(),
        bitrate_kbps: probe
            .format
            .bit_rate
            .as_deref()
            .and_then(|b| b.parse::<u32>().ok())
            .map(|b| b / 1000),
        video_codec: video_stream.and_then(|s| s.codec_name.clone()),
        width: video_stream.and_then(|s| s.width),
        height: video_stream.and_then(|s| s.height),
        frame_rate: video_stream
            .and_then(|s| s.r_frame_rate.as_deref())
            .and_then(parse_frame_rate),
        audio_codec: audio_stream.and_then(|s| s.codec_name.clone()),
        audio_sample_rate: audio_stream
            .and_then(|s| s.sample_rate.as_deref())
            .and_then(|r| r.parse::<u32>().ok()),
        audio_channels: audio_stream.and_then(|s| s.channels),
    })
}

/// Parses a frame rate like "24000/1001" or "25".
fn parse_frame_rate(rate: &str) -> Option<f32> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f32>().ok()?;
            let den = den.parse::<f32>().ok()?;
            (den > 0.0).then(|| num / den)
        }
        None => rate.parse::<f32>().ok(),
    }
}
