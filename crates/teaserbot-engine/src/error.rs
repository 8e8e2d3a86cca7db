//! Engine error types

use crate::chat::ChatError;
use teaserbot_assistant::AssistantError;
use teaserbot_core::ChannelId;
use teaserbot_tools::StoreError;

/// Terminal failure of a single run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("run failed ({code}): {message}")]
    Failed { code: String, message: String },

    #[error("run incomplete: {reason}")]
    Incomplete { reason: String },

    #[error("assistant error: {0}")]
    Assistant(#[from] AssistantError),
}

impl RunError {
    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Machine-readable code for `Failed`, if this is one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Failed { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queued operation panicked: {0}")]
    Panicked(String),

    #[error("queued operation was dropped before completing")]
    Dropped,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("could not allocate a conversation thread for {channel}: {source}")]
    ThreadAllocation {
        channel: ChannelId,
        #[source]
        source: AssistantError,
    },

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("history replay failed for {channel}: {source}")]
    Replay {
        channel: ChannelId,
        #[source]
        source: ChatError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] ChatError),

    #[error("assistant error: {0}")]
    Assistant(#[from] AssistantError),
}

pub type EngineResult<T> = Result<T, EngineError>;
