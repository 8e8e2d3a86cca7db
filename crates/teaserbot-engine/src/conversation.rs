//! Channel → remote thread mapping
//!
//! Each channel gets exactly one thread for the lifetime of the process.
//! Allocation is lazy and guarded per channel: concurrent first calls for
//! the same channel share a single `create_thread` request, while distinct
//! channels never wait on each other.

use crate::error::{EngineError, EngineResult};
use dashmap::DashMap;
use std::sync::Arc;
use teaserbot_assistant::{AssistantClient, AssistantError, ThreadId};
use teaserbot_core::{ChannelId, Role};
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub struct ConversationStore {
    client: Arc<dyn AssistantClient>,
    threads: DashMap<ChannelId, Arc<OnceCell<ThreadId>>>,
}

impl ConversationStore {
    pub fn new(client: Arc<dyn AssistantClient>) -> Self {
        Self {
            client,
            threads: DashMap::new(),
        }
    }

    /// Return the channel's thread, creating it on first use.
    ///
    /// A failed allocation is not cached; the next call tries again.
    pub async fn get_or_create_thread(&self, channel: &ChannelId) -> EngineResult<ThreadId> {
        let cell = self
            .threads
            .entry(channel.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        cell.get_or_try_init(|| async {
            let thread = self.client.create_thread().await?;
            info!(channel = %channel, thread = %thread, "conversation thread created");
            Ok::<_, AssistantError>(thread)
        })
        .await
        .cloned()
        .map_err(|source| EngineError::ThreadAllocation {
            channel: channel.clone(),
            source,
        })
    }

    /// Append a message to the channel's conversation.
    pub async fn append_message(
        &self,
        channel: &ChannelId,
        role: Role,
        content: &str,
    ) -> EngineResult<ThreadId> {
        let thread = self.get_or_create_thread(channel).await?;
        self.client.append_message(&thread, role, content).await?;
        debug!(channel = %channel, role = role.as_str(), chars = content.len(), "message appended");
        Ok(thread)
    }

    /// Thread for the channel, if one was already allocated.
    pub fn thread_for(&self, channel: &ChannelId) -> Option<ThreadId> {
        self.threads.get(channel).and_then(|cell| cell.get().cloned())
    }

    /// Channels with an allocated thread, sorted.
    pub fn channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self
            .threads
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect();
        channels.sort();
        channels
    }

    /// Number of allocated threads.
    pub fn len(&self) -> usize {
        self.threads
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
