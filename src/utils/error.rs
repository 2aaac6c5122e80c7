use thiserror::Error;

use crate::config::ConfigError;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or missing configuration (fatal before any fetch)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Feed fetch failed (network, timeout, non-2xx, unexpected body)
    #[error("feed fetch failed: {0}")]
    Feed(String),

    /// Webhook send failed
    #[error("notification send failed: {0}")]
    Notify(String),

    /// History file could not be written
    #[error("history persistence failed: {0}")]
    History(String),

    /// Interactive prompt could not be read
    #[error("prompt failed: {0}")]
    Prompt(String),
}

impl AppError {
    /// Process exit code for this error
    ///
    /// Configuration problems exit with 2, everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 2,
            _ => 1,
        }
    }

    pub fn feed(msg: impl Into<String>) -> Self {
        AppError::Feed(msg.into())
    }

    pub fn notify(msg: impl Into<String>) -> Self {
        AppError::Notify(msg.into())
    }

    pub fn history(msg: impl Into<String>) -> Self {
        AppError::History(msg.into())
    }
}
