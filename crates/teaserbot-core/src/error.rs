//! Error types shared across Teaserbot crates

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("invalid schedule time '{value}': expected HH:MM")]
    InvalidScheduleTime { value: String },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}
