//! Status sink that records everything it receives.

use serde_json::Value;
use std::sync::Mutex;

use crate::transform::{keys, LogLevel, StatusSink, StatusUpdate};

/// Records status updates for test assertions.
#[derive(Debug, Default)]
pub struct RecordingStatusSink {
    updates: Mutex<Vec<StatusUpdate>>,
}

impl RecordingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All updates, in the order they were received.
    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates
            .lock()
            .map(|updates| updates.clone())
            .unwrap_or_default()
    }

    /// Every value recorded under `key`.
    pub fn infos(&self, key: &str) -> Vec<Value> {
        self.updates()
            .into_iter()
            .filter_map(|update| match update {
                StatusUpdate::Info { key: k, value } if k == key => Some(value),
                _ => None,
            })
            .collect()
    }

    /// The latest value recorded under `key`.
    pub fn info(&self, key: &str) -> Option<Value> {
        self.infos(key).pop()
    }

    /// Transform states, in order.
    pub fn states(&self) -> Vec<String> {
        self.infos(keys::TRANSFORM_STATE)
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// Reported progress percentages, in order.
    pub fn progress(&self) -> Vec<f64> {
        self.infos(keys::TRANSFER_PROGRESS)
            .into_iter()
            .filter_map(|v| v.as_f64())
            .collect()
    }

    /// Log messages at `level`.
    pub fn logs(&self, level: LogLevel) -> Vec<String> {
        self.updates()
            .into_iter()
            .filter_map(|update| match update {
                StatusUpdate::Log { level: l, message } if l == level => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl StatusSink for RecordingStatusSink {
    fn set_info(&self, key: &str, value: Value) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(StatusUpdate::Info {
                key: key.to_string(),
                value,
            });
        }
    }

    fn log(&self, level: LogLevel, message: &str) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(StatusUpdate::Log {
                level,
                message: message.to_string(),
            });
        }
    }
}
