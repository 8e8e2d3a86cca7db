//! Core types for Teaserbot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// External chat channel identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(Arc<str>);

impl ChannelId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Author role of a conversation message
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A chat message delivered by the gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel_id: ChannelId,
    /// Direct-message channel (as opposed to a group channel)
    #[serde(default)]
    pub is_direct: bool,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    /// Sent by the bot itself
    #[serde(default)]
    pub is_from_self: bool,
    /// Gateway message id, needed for reactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// A prior message fetched from a channel for history replay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    #[serde(default)]
    pub is_from_self: bool,
    pub timestamp: DateTime<Utc>,
}

impl HistoryMessage {
    /// Role this message takes when replayed into a conversation.
    pub fn role(&self) -> Role {
        if self.is_from_self {
            Role::Assistant
        } else {
            Role::User
        }
    }
}

/// Scheduled broadcast triggers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TickKind {
    DailyItem,
    DailyMotivation,
}

impl TickKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickKind::DailyItem => "daily-item",
            TickKind::DailyMotivation => "daily-motivation",
        }
    }
}

impl std::fmt::Display for TickKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TickKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily-item" | "dailyItem" | "botd" => Ok(TickKind::DailyItem),
            "daily-motivation" | "dailyMotivation" | "motivation" => Ok(TickKind::DailyMotivation),
            other => Err(format!("unknown tick kind: {}", other)),
        }
    }
}
