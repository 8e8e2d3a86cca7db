//! Inbound boundary: chat messages, slash commands, and scheduled ticks
//!
//! Every operation that touches a channel's conversation goes through the
//! serialized queue under that channel's id, so appends never race a run
//! on the same thread.

use crate::channels::{format_user_message, ChannelSessionRegistry};
use crate::chat::{ChatOutbox, HistorySource};
use crate::conversation::ConversationStore;
use crate::error::{EngineError, EngineResult, QueueError};
use crate::queue::SerializedQueue;
use crate::run::{RunDriver, RunDriverConfig};
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use teaserbot_assistant::AssistantClient;
use teaserbot_core::{ChannelId, InboundMessage, Role, TickKind};
use teaserbot_tools::{Brainteaser, BrainteaserStore, ToolRegistry};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const HELP_TEXT: &str = "\
Commands:
  /subscribe     post the brainteaser of the day in this channel
  /unsubscribe   stop daily posts in this channel
  /leaderboard   show the top scorers
  /botd          show today's brainteaser
  /help          show this message";

const MOTIVATION_PROMPT: &str =
    "Write a short motivational message to start the day, in a single paragraph.";

const LEADERBOARD_SIZE: usize = 10;

/// What the assistant asked the bot to do with a turn's result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    Reply { content: String },
    React { emoji: String },
    #[serde(rename = "none")]
    Ignore,
}

impl Decision {
    /// Structured JSON decisions are honored; any other text is a reply.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::Ignore;
        }
        let body = strip_code_fence(trimmed);
        match serde_json::from_str::<Decision>(body) {
            Ok(decision) => decision,
            Err(_) => Self::Reply {
                content: trimmed.to_string(),
            },
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    text.strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(text)
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub assistant_id: String,
    pub run: RunDriverConfig,
    pub replay_limit: usize,
}

/// Outcome of a scheduled broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub kind: TickKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brainteaser_id: Option<Uuid>,
    pub delivered: usize,
    pub failed: usize,
}

/// Per-channel view for operators.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub channel_id: ChannelId,
    pub subscribed: bool,
    pub activated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Append-then-run on one channel. Cloned into each queued operation.
#[derive(Clone)]
struct Turn {
    conversations: Arc<ConversationStore>,
    driver: Arc<RunDriver>,
    assistant_id: Arc<str>,
}

impl Turn {
    async fn run(self, channel: ChannelId, role: Role, content: String) -> EngineResult<String> {
        let thread = self
            .conversations
            .append_message(&channel, role, &content)
            .await?;
        Ok(self.driver.execute(&thread, &self.assistant_id).await?)
    }
}

pub struct Orchestrator {
    store: Arc<dyn BrainteaserStore>,
    outbox: Arc<dyn ChatOutbox>,
    conversations: Arc<ConversationStore>,
    channels: Arc<ChannelSessionRegistry>,
    queue: SerializedQueue<ChannelId>,
    turn: Turn,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        client: Arc<dyn AssistantClient>,
        tools: ToolRegistry,
        store: Arc<dyn BrainteaserStore>,
        outbox: Arc<dyn ChatOutbox>,
        history: Arc<dyn HistorySource>,
    ) -> Self {
        let conversations = Arc::new(ConversationStore::new(client.clone()));
        let driver = Arc::new(RunDriver::new(client, Arc::new(tools), config.run));
        let channels = Arc::new(ChannelSessionRegistry::new(
            store.clone(),
            history,
            conversations.clone(),
            config.replay_limit,
        ));
        Self {
            store,
            outbox,
            conversations: conversations.clone(),
            channels,
            queue: SerializedQueue::new(),
            turn: Turn {
                conversations,
                driver,
                assistant_id: Arc::from(config.assistant_id),
            },
        }
    }

    pub fn channels(&self) -> &ChannelSessionRegistry {
        &self.channels
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    pub fn queue(&self) -> &SerializedQueue<ChannelId> {
        &self.queue
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        self.turn.driver.tools()
    }

    /// Load persisted subscriptions. Call once at startup.
    pub async fn start(&self) -> EngineResult<usize> {
        let count = self.channels.load_from_store().await?;
        info!(subscribed = count, tools = self.tools().len(), "orchestrator ready");
        Ok(count)
    }

    /// Handle a chat message. Returns the decision that was delivered, or
    /// `None` when the message was ignored.
    pub async fn on_message(&self, message: InboundMessage) -> EngineResult<Option<Decision>> {
        if message.is_from_self {
            return Ok(None);
        }
        let channel = message.channel_id.clone();

        let result = self.handle_message(&message).await;
        match result {
            Ok(Some(decision)) => {
                self.deliver(&message, &decision).await?;
                Ok(Some(decision))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                error!(channel = %channel, error = %e, "turn failed");
                let notice = format!("Sorry, I couldn't process that: {}", e);
                if let Err(delivery) = self.outbox.send(&channel, &notice).await {
                    warn!(channel = %channel, error = %delivery, "could not deliver failure notice");
                }
                Err(e)
            }
        }
    }

    async fn handle_message(&self, message: &InboundMessage) -> EngineResult<Option<Decision>> {
        let channel = &message.channel_id;
        self.store
            .upsert_user(&message.author_id, &message.author_name)
            .await?;

        let direct = message.is_direct;
        if !direct && !self.channels.is_subscribed(channel) {
            debug!(channel = %channel, "ignoring message in unsubscribed channel");
            return Ok(None);
        }

        let content = format_user_message(&message.author_name, &message.author_id, &message.content);
        let turn = self.turn.clone();
        let channels = self.channels.clone();
        let key = channel.clone();
        // Replay appends to the thread, so it runs inside the channel's queue.
        let text = self
            .queue
            .enqueue(channel.clone(), async move {
                if direct {
                    channels.activate_if_needed(&key).await?;
                }
                turn.run(key, Role::User, content).await
            })
            .await??;
        Ok(Some(Decision::parse(&text)))
    }

    async fn deliver(&self, message: &InboundMessage, decision: &Decision) -> EngineResult<()> {
        let channel = &message.channel_id;
        match decision {
            Decision::Reply { content } => self.outbox.send(channel, content).await?,
            Decision::React { emoji } => match &message.message_id {
                Some(id) => self.outbox.react(channel, id, emoji).await?,
                None => warn!(channel = %channel, "reaction requested without a message id"),
            },
            Decision::Ignore => debug!(channel = %channel, "assistant chose not to respond"),
        }
        Ok(())
    }

    /// Handle a slash command. Never involves the assistant.
    pub async fn on_slash_command(&self, name: &str, channel: &ChannelId, args: &str) -> String {
        match self.command(name, channel, args).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(command = name, channel = %channel, error = %e, "command failed");
                format!("Sorry, I couldn't process that: {}", e)
            }
        }
    }

    async fn command(&self, name: &str, channel: &ChannelId, args: &str) -> EngineResult<String> {
        match name.trim_start_matches('/') {
            "subscribe" => {
                self.channels.set_subscribed(channel, true).await?;
                Ok("This channel will now receive the brainteaser of the day.".to_string())
            }
            "unsubscribe" => {
                self.channels.set_subscribed(channel, false).await?;
                Ok("This channel will no longer receive the brainteaser of the day.".to_string())
            }
            "leaderboard" => {
                let limit = args.trim().parse().unwrap_or(LEADERBOARD_SIZE);
                let users = self.store.leaderboard(limit).await?;
                if users.is_empty() {
                    return Ok("No points have been awarded yet.".to_string());
                }
                let lines: Vec<String> = users
                    .iter()
                    .enumerate()
                    .map(|(i, u)| format!("{}. {}: {} points", i + 1, u.name, u.points))
                    .collect();
                Ok(lines.join("\n"))
            }
            "botd" => Ok(match self.store.latest_posted().await? {
                Some(teaser) => announcement(&teaser),
                None => "No brainteaser has been posted yet.".to_string(),
            }),
            _ => Ok(HELP_TEXT.to_string()),
        }
    }

    /// Run a scheduled broadcast across all subscribed channels.
    ///
    /// Per-channel failures are logged and counted; they never stop the
    /// other channels. Returns `None` when there was nothing to post.
    pub async fn on_scheduled_tick(&self, kind: TickKind) -> EngineResult<Option<TickReport>> {
        match kind {
            TickKind::DailyItem => self.post_daily_item().await,
            TickKind::DailyMotivation => self.post_motivation().await.map(Some),
        }
    }

    async fn post_daily_item(&self) -> EngineResult<Option<TickReport>> {
        let Some(teaser) = self.store.select_next_brainteaser().await? else {
            info!("no unposted brainteaser left, skipping daily post");
            return Ok(None);
        };
        let teaser = self.store.mark_posted(teaser.id, Utc::now()).await?;
        let text: Arc<str> = Arc::from(announcement(&teaser));

        let channels = self.channels.list_subscribed();
        let outcomes = join_all(channels.iter().map(|channel| {
            let conversations = self.conversations.clone();
            let outbox = self.outbox.clone();
            let channel = channel.clone();
            let text = text.clone();
            self.queue.enqueue(channel.clone(), async move {
                conversations
                    .append_message(&channel, Role::Assistant, &text)
                    .await?;
                outbox.send(&channel, &text).await?;
                Ok::<_, EngineError>(())
            })
        }))
        .await;

        let mut report = TickReport {
            kind: TickKind::DailyItem,
            brainteaser_id: Some(teaser.id),
            delivered: 0,
            failed: 0,
        };
        for (channel, outcome) in channels.iter().zip(outcomes) {
            tally(&mut report, channel, outcome);
        }
        info!(
            brainteaser = %teaser.id,
            delivered = report.delivered,
            failed = report.failed,
            "brainteaser of the day posted"
        );
        Ok(Some(report))
    }

    async fn post_motivation(&self) -> EngineResult<TickReport> {
        let channels = self.channels.list_subscribed();
        let outcomes = join_all(channels.iter().map(|channel| {
            let turn = self.turn.clone();
            let outbox = self.outbox.clone();
            let channel = channel.clone();
            self.queue.enqueue(channel.clone(), async move {
                let text = turn
                    .run(channel.clone(), Role::User, MOTIVATION_PROMPT.to_string())
                    .await?;
                outbox.send(&channel, &text).await?;
                Ok::<_, EngineError>(())
            })
        }))
        .await;

        let mut report = TickReport {
            kind: TickKind::DailyMotivation,
            brainteaser_id: None,
            delivered: 0,
            failed: 0,
        };
        for (channel, outcome) in channels.iter().zip(outcomes) {
            tally(&mut report, channel, outcome);
        }
        info!(delivered = report.delivered, failed = report.failed, "daily motivation posted");
        Ok(report)
    }

    /// Subscription, activation, and thread state for every known channel.
    pub fn channel_overview(&self) -> Vec<ChannelStatus> {
        let mut ids = self.channels.list_subscribed();
        ids.extend(self.conversations.channels());
        ids.sort();
        ids.dedup();
        ids.into_iter()
            .map(|id| ChannelStatus {
                subscribed: self.channels.is_subscribed(&id),
                activated: self.channels.is_activated(&id),
                thread_id: self.conversations.thread_for(&id).map(|t| t.to_string()),
                channel_id: id,
            })
            .collect()
    }
}

fn tally(
    report: &mut TickReport,
    channel: &ChannelId,
    outcome: Result<EngineResult<()>, QueueError>,
) {
    match outcome.map_err(EngineError::from).and_then(|r| r) {
        Ok(()) => report.delivered += 1,
        Err(e) => {
            report.failed += 1;
            warn!(channel = %channel, kind = %report.kind, error = %e, "broadcast to channel failed");
        }
    }
}

/// Chat text announcing a brainteaser.
pub fn announcement(teaser: &Brainteaser) -> String {
    format!("Brainteaser of the day:\n\n{}", teaser.question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_reply() {
        assert_eq!(
            Decision::parse("  4 "),
            Decision::Reply {
                content: "4".to_string()
            }
        );
    }

    #[test]
    fn json_decisions() {
        assert_eq!(
            Decision::parse(r#"{"action":"reply","content":"hi"}"#),
            Decision::Reply {
                content: "hi".to_string()
            }
        );
        assert_eq!(
            Decision::parse(r#"{"action":"react","emoji":"🎉"}"#),
            Decision::React {
                emoji: "🎉".to_string()
            }
        );
        assert_eq!(Decision::parse(r#"{"action":"none"}"#), Decision::Ignore);
    }

    #[test]
    fn fenced_json_decision() {
        let text = "```json\n{\"action\":\"none\"}\n```";
        assert_eq!(Decision::parse(text), Decision::Ignore);
    }

    #[test]
    fn unrecognized_json_is_reply() {
        let text = r#"{"answer": 4}"#;
        assert_eq!(
            Decision::parse(text),
            Decision::Reply {
                content: text.to_string()
            }
        );
    }

    #[test]
    fn empty_text_is_ignored() {
        assert_eq!(Decision::parse("   "), Decision::Ignore);
    }
}
