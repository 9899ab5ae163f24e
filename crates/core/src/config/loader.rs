use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde_json::Value;
use std::path::Path;

use super::{types::Config, ConfigError};
use crate::transform::AttributeBag;

/// Load configuration from file with environment variable overrides
///
/// Variables are prefixed with `TRANSFORM_` and nest with `__`, e.g.
/// `TRANSFORM_TASK__COMMAND=/usr/bin/ffmpeg`.
///
/// Tables under `task.options` keep the order they have in the file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

    let mut config: Config = Figment::new()
        .merge(Toml::string(&content))
        .merge(Env::prefixed("TRANSFORM_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    // figment sorts table keys; restore the order written in the file.
    let file_order = load_config_from_str(&content)?.task.options;
    let options = std::mem::take(&mut config.task.options);
    config.task.options = ordered_like(options, &file_order);

    Ok(config)
}

/// Reorders `bag` to follow the key order of `reference`, recursing into
/// nested tables. Keys missing from `reference` (env overrides) go last.
fn ordered_like(mut bag: AttributeBag, reference: &AttributeBag) -> AttributeBag {
    let mut ordered = AttributeBag::new();

    for (key, reference_value) in reference {
        let Some(value) = bag.remove(key) else {
            continue;
        };
        let value = match (value, reference_value) {
            (Value::Object(table), Value::Object(reference_table)) => {
                Value::Object(ordered_like(table, reference_table))
            }
            (value, _) => value,
        };
        ordered.insert(key.clone(), value);
    }

    ordered.extend(bag);
    ordered
}

/// Load defaults with only environment variable overrides applied
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    Figment::new()
        .merge(Env::prefixed("TRANSFORM_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
