//! Transform module: transcodes one media file with ffmpeg.
//!
//! This module provides the [`FfmpegTransform`] pipeline stage and the
//! [`Transcoder`] trait it drives. A stage is built per activation from a
//! [`TaskConfig`], validated with `prepare`, and then handed file pairs with
//! `process`.
//!
//! # Features
//!
//! - ffprobe path derived from the configured ffmpeg path, both validated
//!   before any work starts
//! - Source probing (size, duration, resolution) reported before transcoding
//! - Known transcoding attributes mapped to ffmpeg flags, plus passthrough
//!   `custom` flags
//! - Progress forwarded to the host as each update is parsed
//! - Every failure translated into a [`TransformError`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use transform_core::transform::{
//!     ChannelStatusSink, FfmpegTranscoder, FfmpegTransform, FilePair, FileRef, TaskConfig,
//! };
//!
//! let config = TaskConfig::with_command("/usr/bin/ffmpeg")
//!     .with_option("video_codec", "libx264")
//!     .with_option("audio_bitrate", 128);
//! let (sink, mut updates) = ChannelStatusSink::new();
//!
//! let mut stage = FfmpegTransform::new(
//!     config,
//!     Arc::new(FfmpegTranscoder::with_defaults()),
//!     Arc::new(sink),
//! );
//!
//! let input = FileRef::from_path("/incoming/clip.mov");
//! stage.prepare(&[input.clone()]).await?;
//! stage
//!     .process([FilePair::new(input, FileRef::from_path("/outgoing/clip.mp4"))])
//!     .await?;
//! ```

mod binaries;
mod config;
mod error;
mod ffmpeg;
mod options;
mod probe;
mod progress;
mod stage;
mod status;
mod task_config;
mod traits;
mod types;

pub use binaries::{BinaryKind, FfmpegBinaries, FFPROBE_FILE_NAME};
pub use config::{TranscoderConfig, FFMPEG_LOG_LEVELS};
pub use error::{ErrorKind, TranscoderError, TransformError};
pub use ffmpeg::FfmpegTranscoder;
pub use options::{KnownAttribute, OptionSet, OptionValue, CUSTOM_KEY, TRANSCODE_THREADS};
pub use probe::{parse_probe_output, ProbeInfo};
pub use progress::{ProgressEvent, ProgressParser};
pub use stage::FfmpegTransform;
pub use status::{
    keys, ChannelStatusSink, LogLevel, StatusSink, StatusUpdate, TracingStatusSink,
};
pub use task_config::{AttributeBag, TaskConfig};
pub use traits::{Transcoder, Transform};
pub use types::{
    FilePair, FileRef, InputRef, OutputRef, TranscodeMode, TranscodeRequest, TransformState,
};
