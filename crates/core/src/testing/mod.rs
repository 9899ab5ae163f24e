//! Testing utilities and mock implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use transform_core::testing::{MockTranscoder, RecordingStatusSink};
//!
//! let transcoder = MockTranscoder::new();
//! transcoder.set_progress_steps(vec![0.0, 0.5, 1.0]).await;
//! let sink = Arc::new(RecordingStatusSink::new());
//!
//! // Build an FfmpegTransform with both, run it, then:
//! assert_eq!(sink.progress(), vec![0.0, 50.0, 100.0]);
//! ```

mod mock_transcoder;
mod recording_sink;

pub use mock_transcoder::MockTranscoder;
pub use recording_sink::RecordingStatusSink;
