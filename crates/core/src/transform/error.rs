//! Error types for the transform module.
//!
//! Two layers: [`TranscoderError`] is what a backend reports, and
//! [`TransformError`] is the only error that leaves the stage. The
//! `TransformError::from_*` constructors do the translation, one per stage
//! in which a backend error can surface.

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::binaries::BinaryKind;

/// Errors reported by a transcoding backend.
#[derive(Debug, Error)]
pub enum TranscoderError {
    /// The executable could not be spawned because it does not exist.
    #[error("Binary not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// The executable ran but did not pass the capability check.
    #[error("Binary check failed for {path}: {reason}")]
    BinaryCheckFailed { path: PathBuf, reason: String },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// FFprobe exited unsuccessfully.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Failed to parse FFprobe output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    /// The produced file is not a readable media file.
    #[error("Output is not a valid media file: {path}")]
    InvalidOutput { path: PathBuf },

    /// FFmpeg exited unsuccessfully.
    #[error("Transcode failed: {reason}")]
    ProcessFailed {
        reason: String,
        exit_code: Option<i32>,
        stderr: Option<String>,
    },

    /// I/O error while driving the subprocess.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TranscoderError {
    /// Creates a new process failed error.
    pub fn process_failed(
        reason: impl Into<String>,
        exit_code: Option<i32>,
        stderr: Option<String>,
    ) -> Self {
        Self::ProcessFailed {
            reason: reason.into(),
            exit_code,
            stderr,
        }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Message including captured stderr, if any.
    pub fn detail(&self) -> String {
        match self {
            Self::ProbeFailed {
                stderr: Some(stderr),
                ..
            }
            | Self::ProcessFailed {
                stderr: Some(stderr),
                ..
            } => format!("{}: {}", self, stderr.trim()),
            _ => self.to_string(),
        }
    }

    fn is_not_found(&self) -> bool {
        match self {
            Self::InputNotFound { .. } => true,
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// The kinds of failure a transform can end with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    TransformMissingBinary,
    SourceShouldBeUnique,
    ErrorVideoNotFound,
    ErrorVideoError,
    TranscodeFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransformMissingBinary => "transform_missing_binary",
            Self::SourceShouldBeUnique => "source_should_be_unique",
            Self::ErrorVideoNotFound => "error_video_not_found",
            Self::ErrorVideoError => "error_video_error",
            Self::TranscodeFailed => "transcode_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the transform stage.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// A required binary is not configured or failed validation.
    #[error("missing {binary} binary: {reason}")]
    MissingBinary { binary: BinaryKind, reason: String },

    /// More than one source was matched for a single activation.
    #[error("only one source can be matched for transformation, got {count}")]
    SourceShouldBeUnique { count: usize },

    /// The input file is absent.
    #[error("video not found: {0}")]
    VideoNotFound(String),

    /// The input file could not be inspected.
    #[error("video error: {0}")]
    VideoError(String),

    /// The transcoding process failed.
    #[error("transcode failed: {message}")]
    TranscodeFailed {
        message: String,
        exit_code: Option<i32>,
    },
}

impl TransformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingBinary { .. } => ErrorKind::TransformMissingBinary,
            Self::SourceShouldBeUnique { .. } => ErrorKind::SourceShouldBeUnique,
            Self::VideoNotFound(_) => ErrorKind::ErrorVideoNotFound,
            Self::VideoError(_) => ErrorKind::ErrorVideoError,
            Self::TranscodeFailed { .. } => ErrorKind::TranscodeFailed,
        }
    }

    /// Creates a missing binary error.
    pub fn missing_binary(binary: BinaryKind, reason: impl Into<String>) -> Self {
        Self::MissingBinary {
            binary,
            reason: reason.into(),
        }
    }

    /// Translates a failed capability check. Every failure means the binary
    /// is unusable, whatever the backend reported.
    pub fn from_binary_check(binary: BinaryKind, err: TranscoderError) -> Self {
        Self::missing_binary(binary, err.to_string())
    }

    /// Translates a failure raised while probing the input.
    pub fn from_probe(err: TranscoderError) -> Self {
        if err.is_not_found() {
            Self::VideoNotFound(err.to_string())
        } else {
            Self::VideoError(err.detail())
        }
    }

    /// Translates a failure raised while the transcode was running.
    pub fn from_transcode(err: TranscoderError) -> Self {
        match err {
            TranscoderError::InputNotFound { .. } => Self::VideoNotFound(err.to_string()),
            TranscoderError::InvalidOutput { .. } => Self::VideoError(err.to_string()),
            TranscoderError::ProcessFailed { exit_code, .. } => Self::TranscodeFailed {
                message: err.detail(),
                exit_code,
            },
            other => Self::TranscodeFailed {
                message: other.detail(),
                exit_code: None,
            },
        }
    }
}
