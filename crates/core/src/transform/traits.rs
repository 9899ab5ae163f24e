//! Trait definitions for the transform module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use super::binaries::FfmpegBinaries;
use super::error::{TranscoderError, TransformError};
use super::probe::ProbeInfo;
use super::progress::ProgressEvent;
use super::types::{FilePair, InputRef, TranscodeRequest};

/// A backend able to probe and transcode media files.
///
/// Binary paths are passed on every call; implementations hold no
/// per-activation state.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Checks that the binary at `path` is usable and returns the path it
    /// resolved to.
    async fn check_binary(&self, path: &Path) -> Result<PathBuf, TranscoderError>;

    /// Reads basic information about a media file.
    async fn probe(
        &self,
        binaries: &FfmpegBinaries,
        input: &Path,
    ) -> Result<ProbeInfo, TranscoderError>;

    /// Runs a transcode to completion.
    ///
    /// Progress events are sent as they are parsed. A closed receiver does
    /// not stop the transcode.
    async fn transcode(
        &self,
        binaries: &FfmpegBinaries,
        request: TranscodeRequest,
        progress_tx: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<(), TranscoderError>;
}

/// A pipeline stage as driven by the host.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Returns the name of this stage.
    fn name(&self) -> &str;

    /// Validates configuration and inputs before any work starts.
    async fn prepare(&mut self, inputs: &[InputRef]) -> Result<(), TransformError>;

    /// Processes file pairs one at a time, stopping at the first failure.
    async fn process(&mut self, pairs: Vec<FilePair>) -> Result<(), TransformError>;
}
