//! Chat gateway collaborators: outbound delivery and channel history

use async_trait::async_trait;
use teaserbot_core::{ChannelId, HistoryMessage};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat bridge unavailable: {0}")]
    Unavailable(String),

    #[error("chat bridge rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Delivers bot output to chat channels.
#[async_trait]
pub trait ChatOutbox: Send + Sync {
    async fn send(&self, channel: &ChannelId, text: &str) -> Result<(), ChatError>;

    async fn react(&self, channel: &ChannelId, message_id: &str, emoji: &str)
        -> Result<(), ChatError>;
}

/// Reads prior messages of a channel.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Up to `limit` recent messages, in any order.
    async fn fetch_history(&self, channel: &ChannelId, limit: usize)
        -> Result<Vec<HistoryMessage>, ChatError>;
}
