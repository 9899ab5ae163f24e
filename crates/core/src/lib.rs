pub mod config;
pub mod metrics;
pub mod testing;
pub mod transform;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config, ConfigError,
    LoggingConfig,
};
pub use transform::{
    ChannelStatusSink, ErrorKind, FfmpegTranscoder, FfmpegTransform, FilePair, FileRef,
    StatusSink, StatusUpdate, TaskConfig, Transcoder, TranscoderConfig, Transform, TransformError,
};
