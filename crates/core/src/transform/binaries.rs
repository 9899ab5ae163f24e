//! Binary resolution and preflight validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::TransformError;
use super::task_config::TaskConfig;
use super::traits::Transcoder;

/// File name of the probing binary, looked up next to ffmpeg.
pub const FFPROBE_FILE_NAME: &str = "ffprobe";

/// The executables a transform depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryKind {
    Ffmpeg,
    Ffprobe,
}

impl BinaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ffmpeg => "ffmpeg",
            Self::Ffprobe => "ffprobe",
        }
    }
}

impl fmt::Display for BinaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved paths of ffmpeg and ffprobe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FfmpegBinaries {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl FfmpegBinaries {
    /// Derives ffprobe from the ffmpeg path: same directory, same extension.
    pub fn from_ffmpeg(ffmpeg: impl Into<PathBuf>) -> Self {
        let ffmpeg = ffmpeg.into();
        let mut ffprobe = ffmpeg.with_file_name(FFPROBE_FILE_NAME);
        if let Some(ext) = ffmpeg.extension() {
            ffprobe.set_extension(ext);
        }
        Self { ffmpeg, ffprobe }
    }

    /// Resolves binaries from the task's `command`.
    pub fn resolve(config: &TaskConfig) -> Result<Self, TransformError> {
        match &config.command {
            Some(command) if !command.as_os_str().is_empty() => Ok(Self::from_ffmpeg(command)),
            _ => Err(TransformError::missing_binary(
                BinaryKind::Ffmpeg,
                "ffmpeg binary not defined",
            )),
        }
    }

    pub fn path(&self, kind: BinaryKind) -> &Path {
        match kind {
            BinaryKind::Ffmpeg => &self.ffmpeg,
            BinaryKind::Ffprobe => &self.ffprobe,
        }
    }

    /// Runs the capability check on ffprobe, then ffmpeg.
    ///
    /// A binary passes when the check succeeds and the path it reports
    /// exists on disk. The first failure is returned.
    pub async fn validate<T>(&self, transcoder: &T) -> Result<(), TransformError>
    where
        T: Transcoder + ?Sized,
    {
        for kind in [BinaryKind::Ffprobe, BinaryKind::Ffmpeg] {
            let path = self.path(kind);
            let checked = transcoder
                .check_binary(path)
                .await
                .map_err(|e| TransformError::from_binary_check(kind, e))?;

            if !checked.exists() {
                return Err(TransformError::missing_binary(
                    kind,
                    format!("{} does not exist", checked.display()),
                ));
            }
        }
        Ok(())
    }
}
