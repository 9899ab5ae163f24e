//! Status reporting towards the host.
//!
//! The stage never blocks on its sink: implementations must return
//! immediately. [`ChannelStatusSink`] queues updates on an unbounded channel
//! that the host drains at its own pace, in emission order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Keys used for status updates.
pub mod keys {
    pub const FFMPEG_BINARY: &str = "ffmpeg_binary";
    pub const FFPROBE_BINARY: &str = "ffprobe_binary";
    pub const FFMPEG_SIZE: &str = "ffmpeg_size";
    pub const FFMPEG_DURATION: &str = "ffmpeg_duration";
    pub const FFMPEG_RESOLUTION: &str = "ffmpeg_resolution";
    pub const FFMPEG_OPTIONS: &str = "ffmpeg_options";
    pub const TRANSCODER_OPTIONS: &str = "transcoder_options";
    pub const TRANSFORM_STATE: &str = "transform_state";
    pub const TRANSFER_PROGRESS: &str = "transfer_progress";
}

/// Severity of a message sent to the host's log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

/// One update as seen by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Info { key: String, value: Value },
    Log { level: LogLevel, message: String },
}

/// Receives status updates and log messages from the stage.
pub trait StatusSink: Send + Sync {
    /// Records a keyed piece of information about the running task.
    fn set_info(&self, key: &str, value: Value);

    /// Writes a message to the task log. Defaults to `tracing`.
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => debug!(target: "transform", "{}", message),
            LogLevel::Info => info!(target: "transform", "{}", message),
            LogLevel::Error => error!(target: "transform", "{}", message),
        }
    }
}

/// Sink that only logs, through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn set_info(&self, key: &str, value: Value) {
        debug!(target: "transform", key, %value, "status");
    }
}

/// Sink forwarding every update over an unbounded channel.
///
/// Updates sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelStatusSink {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl ChannelStatusSink {
    /// Creates a sink and the receiver the host drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusSink for ChannelStatusSink {
    fn set_info(&self, key: &str, value: Value) {
        let _ = self.tx.send(StatusUpdate::Info {
            key: key.to_string(),
            value,
        });
    }

    fn log(&self, level: LogLevel, message: &str) {
        let _ = self.tx.send(StatusUpdate::Log {
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_channel_sink_preserves_order() {
        let (sink, mut rx) = ChannelStatusSink::new();

        sink.set_info(keys::TRANSFER_PROGRESS, json!(0.0));
        sink.log(LogLevel::Info, "progress 0.5");
        sink.set_info(keys::TRANSFER_PROGRESS, json!(50.0));
        drop(sink);

        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }

        assert_eq!(
            updates,
            vec![
                StatusUpdate::Info {
                    key: "transfer_progress".to_string(),
                    value: json!(0.0)
                },
                StatusUpdate::Log {
                    level: LogLevel::Info,
                    message: "progress 0.5".to_string()
                },
                StatusUpdate::Info {
                    key: "transfer_progress".to_string(),
                    value: json!(50.0)
                },
            ]
        );
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelStatusSink::new();
        drop(rx);
        sink.set_info(keys::FFMPEG_SIZE, json!(1024));
        sink.log(LogLevel::Error, "ignored");
    }

    #[test]
    fn test_tracing_sink_accepts_updates() {
        let sink = TracingStatusSink;
        sink.set_info(keys::FFMPEG_DURATION, json!(12.5));
        sink.log(LogLevel::Debug, "debug message");
    }
}
