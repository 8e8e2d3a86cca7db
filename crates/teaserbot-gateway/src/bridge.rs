//! Outbound side of the chat gateway
//!
//! `BridgeClient` talks JSON over HTTP to a chat bridge process that owns the
//! actual chat connection:
//!
//! - `POST {base}/messages`  `{"channel_id", "text"}`
//! - `POST {base}/reactions` `{"channel_id", "message_id", "emoji"}`
//! - `GET  {base}/channels/{channel_id}/history?limit=N` → `[HistoryMessage]`
//!
//! Without a bridge, `LogOutbox` writes outbound traffic to the log.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use teaserbot_core::{ChannelId, HistoryMessage};
use teaserbot_engine::{ChatError, ChatOutbox, HistorySource};
use tracing::{debug, info, warn};

pub struct BridgeClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct SendBody<'a> {
    channel_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct ReactBody<'a> {
    channel_id: &'a str,
    message_id: &'a str,
    emoji: &'a str,
}

impl BridgeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/channels/{channel}/history` with the channel id encoded as a
    /// single path segment.
    fn history_url(&self, channel: &ChannelId) -> Result<Url, ChatError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ChatError::Unavailable(format!("invalid bridge url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ChatError::Unavailable(format!("invalid bridge url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["channels", channel.as_str(), "history"]);
        Ok(url)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<reqwest::Response, ChatError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ChatError::Unavailable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Chat bridge error {}: {}", status, message);
            return Err(ChatError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ChatError> {
        self.execute(builder)
            .await?
            .json()
            .await
            .map_err(|e| ChatError::Unavailable(format!("invalid bridge response: {}", e)))
    }
}

#[async_trait]
impl ChatOutbox for BridgeClient {
    async fn send(&self, channel: &ChannelId, text: &str) -> Result<(), ChatError> {
        let body = SendBody {
            channel_id: channel.as_str(),
            text,
        };
        self.execute(self.client.post(self.url("/messages")).json(&body))
            .await?;
        debug!(channel = %channel, chars = text.len(), "message delivered");
        Ok(())
    }

    async fn react(&self, channel: &ChannelId, message_id: &str, emoji: &str) -> Result<(), ChatError> {
        let body = ReactBody {
            channel_id: channel.as_str(),
            message_id,
            emoji,
        };
        self.execute(self.client.post(self.url("/reactions")).json(&body))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl HistorySource for BridgeClient {
    async fn fetch_history(&self, channel: &ChannelId, limit: usize) -> Result<Vec<HistoryMessage>, ChatError> {
        let url = self.history_url(channel)?;
        self.fetch(self.client.get(url).query(&[("limit", limit)]))
            .await
    }
}

/// Stand-in when no bridge is configured.
#[derive(Debug, Default)]
pub struct LogOutbox;

#[async_trait]
impl ChatOutbox for LogOutbox {
    async fn send(&self, channel: &ChannelId, text: &str) -> Result<(), ChatError> {
        info!(channel = %channel, "outbound message: {}", text);
        Ok(())
    }

    async fn react(&self, channel: &ChannelId, message_id: &str, emoji: &str) -> Result<(), ChatError> {
        info!(channel = %channel, message_id, "outbound reaction: {}", emoji);
        Ok(())
    }
}

#[async_trait]
impl HistorySource for LogOutbox {
    async fn fetch_history(&self, _channel: &ChannelId, _limit: usize) -> Result<Vec<HistoryMessage>, ChatError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let bridge = BridgeClient::new("http://localhost:9000/");
        assert_eq!(bridge.base_url(), "http://localhost:9000");
        assert_eq!(bridge.url("/messages"), "http://localhost:9000/messages");
    }

    #[test]
    fn history_url_encodes_channel_as_one_segment() {
        let bridge = BridgeClient::new("http://localhost:9000/bridge/");
        let url = bridge
            .history_url(&ChannelId::from("team/general?x#1"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/bridge/channels/team%2Fgeneral%3Fx%231/history"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }
}
