use super::{types::Config, ConfigError, LOG_LEVELS};
use crate::transform::FFMPEG_LOG_LEVELS;

/// Validate configuration
/// Currently validates:
/// - logging.level is a known tracing level
/// - transcoder.ffmpeg_log_level is a level ffmpeg accepts
///
/// A missing `task.command` is left to the transform, which reports it as a
/// missing binary.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "logging.level must be one of {:?}, got {:?}",
            LOG_LEVELS, config.logging.level
        )));
    }

    if !FFMPEG_LOG_LEVELS.contains(&config.transcoder.ffmpeg_log_level.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "transcoder.ffmpeg_log_level must be one of {:?}, got {:?}",
            FFMPEG_LOG_LEVELS, config.transcoder.ffmpeg_log_level
        )));
    }

    Ok(())
}
