//! Per-activation configuration handed over by the host.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Free-form attribute table. Iteration follows insertion order.
pub type AttributeBag = Map<String, Value>;

/// Configuration for one transform activation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Path to the ffmpeg binary. The ffprobe path is derived from it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<PathBuf>,

    /// Transcoding attributes, plus an optional nested `custom` table of
    /// passthrough flags.
    #[serde(default)]
    pub options: AttributeBag,
}

impl TaskConfig {
    /// Creates a config pointing at the given ffmpeg binary.
    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        Self {
            command: Some(command.into()),
            options: AttributeBag::new(),
        }
    }

    /// Sets an attribute.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Returns a fresh copy of the attributes for one file pair to consume.
    pub fn working_options(&self) -> AttributeBag {
        self.options.clone()
    }
}
