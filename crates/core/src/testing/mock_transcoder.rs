//! Mock transcoder for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::transform::{
    FfmpegBinaries, ProbeInfo, ProgressEvent, TranscodeRequest, Transcoder, TranscoderError,
};

/// Mock implementation of the Transcoder trait.
///
/// Provides controllable behavior for testing:
/// - Track transcode requests for assertions
/// - Fail capability checks for chosen paths
/// - Control probe results and probe/transcode failures
/// - Replay a fixed list of progress fractions
///
/// Probing a path that does not exist on disk fails with
/// `TranscoderError::InputNotFound`, like the real backend.
#[derive(Debug, Clone, Default)]
pub struct MockTranscoder {
    /// Recorded transcode requests.
    requests: Arc<RwLock<Vec<TranscodeRequest>>>,
    /// Paths whose capability check fails.
    failing_binaries: Arc<RwLock<HashSet<PathBuf>>>,
    /// Pre-configured probe results by path.
    probe_results: Arc<RwLock<HashMap<PathBuf, ProbeInfo>>>,
    /// If set, the next probe fails with this error.
    probe_error: Arc<RwLock<Option<TranscoderError>>>,
    /// If set, the next transcode fails with this error after sending progress.
    transcode_error: Arc<RwLock<Option<TranscoderError>>>,
    /// Progress fractions sent during each transcode.
    progress_steps: Arc<RwLock<Vec<f64>>>,
}

impl MockTranscoder {
    /// Create a new mock transcoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded transcode requests.
    pub async fn recorded_requests(&self) -> Vec<TranscodeRequest> {
        self.requests.read().await.clone()
    }

    /// Make the capability check fail for `path`.
    pub async fn fail_binary_check(&self, path: impl AsRef<Path>) {
        self.failing_binaries
            .write()
            .await
            .insert(path.as_ref().to_path_buf());
    }

    /// Set a probe result for a specific path.
    pub async fn set_probe_result(&self, path: impl AsRef<Path>, info: ProbeInfo) {
        self.probe_results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), info);
    }

    /// Configure the next probe to fail with the given error.
    pub async fn set_probe_error(&self, error: TranscoderError) {
        *self.probe_error.write().await = Some(error);
    }

    /// Configure the next transcode to fail with the given error.
    pub async fn set_transcode_error(&self, error: TranscoderError) {
        *self.transcode_error.write().await = Some(error);
    }

    /// Set the progress fractions reported by each transcode.
    pub async fn set_progress_steps(&self, steps: Vec<f64>) {
        *self.progress_steps.write().await = steps;
    }

    /// Create a default ProbeInfo for testing.
    fn create_default_info(path: &Path) -> ProbeInfo {
        ProbeInfo {
            path: path.to_path_buf(),
            size_bytes: 100 * 1024 * 1024, // 100 MB
            duration_secs: 60.0,
            format: "mov".to_string(),
            bitrate_kbps: Some(8000),
            video_codec: Some("h264".to_string()),
            width: Some(1280),
            height: Some(720),
            frame_rate: Some(25.0),
            audio_codec: Some("aac".to_string()),
            audio_sample_rate: Some(48000),
            audio_channels: Some(2),
        }
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn check_binary(&self, path: &Path) -> Result<PathBuf, TranscoderError> {
        if self.failing_binaries.read().await.contains(path) {
            return Err(TranscoderError::BinaryCheckFailed {
                path: path.to_path_buf(),
                reason: "mock check failure".to_string(),
            });
        }
        Ok(path.to_path_buf())
    }

    async fn probe(
        &self,
        _binaries: &FfmpegBinaries,
        input: &Path,
    ) -> Result<ProbeInfo, TranscoderError> {
        if let Some(err) = self.probe_error.write().await.take() {
            return Err(err);
        }

        if let Some(info) = self.probe_results.read().await.get(input) {
            return Ok(info.clone());
        }

        if !input.exists() {
            return Err(TranscoderError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        Ok(Self::create_default_info(input))
    }

    async fn transcode(
        &self,
        _binaries: &FfmpegBinaries,
        request: TranscodeRequest,
        progress_tx: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<(), TranscoderError> {
        self.requests.write().await.push(request);

        for step in self.progress_steps.read().await.iter() {
            let _ = progress_tx.send(ProgressEvent::new(*step));
        }

        match self.transcode_error.write().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
