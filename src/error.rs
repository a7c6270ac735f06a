#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TicklerError {
    #[error("invalid reminder time '{0}': expected HH:MM with hour 0-23 and minute 0-59")]
    InvalidTimeFormat(String),

    #[error("index {index} out of range for registry of size {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no task with id '{0}'")]
    TaskNotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config key '{0}'")]
    InvalidConfigKey(String),

    #[error("invalid config value for '{key}': {msg}")]
    InvalidConfigValue { key: String, msg: String },
}
