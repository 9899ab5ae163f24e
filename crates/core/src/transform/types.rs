//! Types for the transform module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::options::OptionSet;

/// A file participating in a transform, as named by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Logical name used in status and log messages.
    pub name: String,
    /// Absolute path on the local filesystem.
    pub path: PathBuf,
}

impl FileRef {
    /// Creates a new file reference.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Creates a reference named after the last component of `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self { name, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Source file of a transform.
pub type InputRef = FileRef;

/// Destination file of a transform.
pub type OutputRef = FileRef;

/// One unit of work handed over by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePair {
    pub name: String,
    pub input: InputRef,
    pub output: OutputRef,
}

impl FilePair {
    /// Creates a pair named after its input.
    pub fn new(input: InputRef, output: OutputRef) -> Self {
        Self {
            name: input.name.clone(),
            input,
            output,
        }
    }
}

/// Lifecycle of a single file pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformState {
    Idle,
    Probed,
    OptionsBuilt,
    Running,
    Succeeded,
    Failed,
}

impl TransformState {
    /// Returns the snake_case name used in status updates.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probed => "probed",
            Self::OptionsBuilt => "options_built",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: TransformState) -> bool {
        match (self, next) {
            (Self::Idle, Self::Probed) => true,
            (Self::Probed, Self::OptionsBuilt) => true,
            (Self::OptionsBuilt, Self::Running) => true,
            (Self::Running, Self::Succeeded) => true,
            (from, Self::Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for TransformState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the backend treats the produced file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeMode {
    /// Probe the output after a successful run and reject it if it is not a
    /// readable media file.
    pub validate: bool,
}

impl TranscodeMode {
    /// Mode used by the transform stage: its own checks are authoritative.
    pub fn unchecked() -> Self {
        Self { validate: false }
    }
}

impl Default for TranscodeMode {
    fn default() -> Self {
        Self { validate: true }
    }
}

/// Everything the backend needs to run one transcode.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub options: OptionSet,
    pub mode: TranscodeMode,
    /// Source duration, used to turn elapsed output time into a fraction.
    pub duration_secs: Option<f64>,
}
