//! FFmpeg subprocess backend.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::binaries::FfmpegBinaries;
use super::config::TranscoderConfig;
use super::error::TranscoderError;
use super::probe::{parse_probe_output, ProbeInfo, FFPROBE_ARGS};
use super::progress::{ProgressEvent, ProgressParser};
use super::traits::Transcoder;
use super::types::TranscodeRequest;

/// Diagnostic lines kept from ffmpeg's stderr for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Transcoder driving the ffmpeg and ffprobe executables.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    /// Creates a new FFmpeg transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Builds the ffmpeg argument list for a request.
    fn build_args(&self, request: &TranscodeRequest) -> Vec<String> {
        let mut args = vec!["-y".to_string()];

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.extend([
            "-i".to_string(),
            request.input.to_string_lossy().to_string(),
        ]);

        args.extend(request.options.to_args());

        args.extend([
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);

        args.push(request.output.to_string_lossy().to_string());
        args
    }

    fn spawn_error(path: &Path, e: std::io::Error) -> TranscoderError {
        if e.kind() == ErrorKind::NotFound {
            TranscoderError::BinaryNotFound {
                path: path.to_path_buf(),
            }
        } else {
            TranscoderError::Io(e)
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn check_binary(&self, path: &Path) -> Result<PathBuf, TranscoderError> {
        let status = Command::new(path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| Self::spawn_error(path, e))?;

        if !status.success() {
            return Err(TranscoderError::BinaryCheckFailed {
                path: path.to_path_buf(),
                reason: format!("-version exited with code: {:?}", status.code()),
            });
        }

        Ok(path.to_path_buf())
    }

    async fn probe(
        &self,
        binaries: &FfmpegBinaries,
        input: &Path,
    ) -> Result<ProbeInfo, TranscoderError> {
        if !input.exists() {
            return Err(TranscoderError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let output = Command::new(&binaries.ffprobe)
            .args(FFPROBE_ARGS)
            .arg(input)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Self::spawn_error(&binaries.ffprobe, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TranscoderError::probe_failed(
                format!("ffprobe exited with code: {:?}", output.status.code()),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_probe_output(input, &stdout)
    }

    async fn transcode(
        &self,
        binaries: &FfmpegBinaries,
        request: TranscodeRequest,
        progress_tx: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<(), TranscoderError> {
        let args = self.build_args(&request);
        debug!(binary = %binaries.ffmpeg.display(), ?args, "Spawning ffmpeg");

        let mut child = Command::new(&binaries.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Self::spawn_error(&binaries.ffmpeg, e))?;

        let stderr = child.stderr.take().ok_or_else(|| {
            TranscoderError::Io(std::io::Error::other("ffmpeg stderr was not captured"))
        })?;
        let mut reader = BufReader::new(stderr);

        let parser = ProgressParser::new(request.duration_secs);
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut buf = Vec::new();

        // ffmpeg echoes metadata verbatim, which need not be UTF-8.
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Stopped reading ffmpeg stderr");
                    break;
                }
            }
            let line = String::from_utf8_lossy(&buf).trim_end().to_string();

            if let Some(event) = parser.parse_line(&line) {
                let _ = progress_tx.send(event);
                continue;
            }
            if parser.is_progress_line(&line) || line.trim().is_empty() {
                continue;
            }
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }

        let status = child.wait().await?;
        if !status.success() {
            let stderr = Vec::from(tail).join("\n");
            return Err(TranscoderError::process_failed(
                format!("ffmpeg exited with code: {:?}", status.code()),
                status.code(),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }

        if request.mode.validate {
            let info = self.probe(binaries, &request.output).await?;
            if !info.is_valid() {
                warn!(output = %request.output.display(), "ffmpeg produced an unreadable file");
                return Err(TranscoderError::InvalidOutput {
                    path: request.output.clone(),
                });
            }
        }

        let _ = progress_tx.send(ProgressEvent::complete());
        Ok(())
    }
}
