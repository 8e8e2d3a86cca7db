//! Channel flags: broadcast subscription and direct-message activation

use crate::chat::HistorySource;
use crate::conversation::ConversationStore;
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use teaserbot_core::{ChannelId, HistoryMessage, Role};
use teaserbot_tools::BrainteaserStore;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Render a user message the way it is appended to a conversation.
pub fn format_user_message(author_name: &str, author_id: &str, content: &str) -> String {
    format!("{} ({}): {}", author_name, author_id, content)
}

pub struct ChannelSessionRegistry {
    store: Arc<dyn BrainteaserStore>,
    history: Arc<dyn HistorySource>,
    conversations: Arc<ConversationStore>,
    replay_limit: usize,
    subscribed: DashSet<ChannelId>,
    activations: DashMap<ChannelId, Arc<OnceCell<()>>>,
    /// Last replayed timestamp per channel, and how many messages carrying
    /// that timestamp were appended. Cleared once activation succeeds.
    replay_marks: DashMap<ChannelId, (DateTime<Utc>, usize)>,
}

impl ChannelSessionRegistry {
    pub fn new(
        store: Arc<dyn BrainteaserStore>,
        history: Arc<dyn HistorySource>,
        conversations: Arc<ConversationStore>,
        replay_limit: usize,
    ) -> Self {
        Self {
            store,
            history,
            conversations,
            replay_limit,
            subscribed: DashSet::new(),
            activations: DashMap::new(),
            replay_marks: DashMap::new(),
        }
    }

    /// Replay the channel's recent history into its conversation on first
    /// contact. Returns whether this call performed the replay.
    ///
    /// Run this inside the channel's queued operation, since it appends to
    /// the channel's thread. Concurrent first calls replay once. A failed
    /// replay leaves the channel inactive; the retry resumes after the last
    /// message that was appended.
    pub async fn activate_if_needed(&self, channel: &ChannelId) -> EngineResult<bool> {
        let cell = self
            .activations
            .entry(channel.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        if cell.initialized() {
            return Ok(false);
        }

        let mut replayed = false;
        let flag = &mut replayed;
        cell.get_or_try_init(move || async move {
            self.replay(channel).await?;
            *flag = true;
            Ok::<_, EngineError>(())
        })
        .await?;
        self.replay_marks.remove(channel);
        Ok(replayed)
    }

    async fn replay(&self, channel: &ChannelId) -> EngineResult<usize> {
        let mut messages = self
            .history
            .fetch_history(channel, self.replay_limit)
            .await
            .map_err(|source| EngineError::Replay {
                channel: channel.clone(),
                source,
            })?;
        messages.sort_by_key(|m| m.timestamp);

        let mut mark = self.replay_marks.get(channel).map(|m| *m);
        let mut count = 0;
        for message in messages.iter().filter(|m| !m.content.trim().is_empty()) {
            if let Some((at, seen)) = mark.as_mut() {
                if message.timestamp < *at {
                    continue;
                }
                if message.timestamp == *at && *seen > 0 {
                    *seen -= 1;
                    continue;
                }
            }
            self.conversations
                .append_message(channel, message.role(), &replay_text(message))
                .await?;
            count += 1;
            self.replay_marks
                .entry(channel.clone())
                .and_modify(|(at, seen)| {
                    if *at == message.timestamp {
                        *seen += 1;
                    } else {
                        *at = message.timestamp;
                        *seen = 1;
                    }
                })
                .or_insert((message.timestamp, 1));
        }
        info!(channel = %channel, messages = count, "history replayed");
        Ok(count)
    }

    pub fn is_activated(&self, channel: &ChannelId) -> bool {
        self.activations
            .get(channel)
            .map_or(false, |cell| cell.initialized())
    }

    /// Persist the flag, then update the in-memory set.
    pub async fn set_subscribed(&self, channel: &ChannelId, subscribed: bool) -> EngineResult<()> {
        self.store
            .upsert_channel_subscription(channel.as_str(), subscribed)
            .await?;
        if subscribed {
            self.subscribed.insert(channel.clone());
        } else {
            self.subscribed.remove(channel);
        }
        info!(channel = %channel, subscribed, "channel subscription updated");
        Ok(())
    }

    pub fn is_subscribed(&self, channel: &ChannelId) -> bool {
        self.subscribed.contains(channel)
    }

    pub fn list_subscribed(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self.subscribed.iter().map(|c| c.key().clone()).collect();
        channels.sort();
        channels
    }

    /// Populate subscriptions from persistence. Returns how many were loaded.
    pub async fn load_from_store(&self) -> EngineResult<usize> {
        let channels = self.store.subscribed_channels().await?;
        for id in &channels {
            self.subscribed.insert(ChannelId::new(id.as_str()));
        }
        debug!(count = channels.len(), "subscriptions loaded");
        Ok(channels.len())
    }
}

fn replay_text(message: &HistoryMessage) -> String {
    match message.role() {
        Role::Assistant => message.content.clone(),
        Role::User => format_user_message(&message.author_name, &message.author_id, &message.content),
    }
}
