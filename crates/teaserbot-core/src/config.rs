//! Teaserbot configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists. Secrets come from the
//! environment and override whatever the file says.

use crate::error::{Error, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "teaserbot.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeaserbotConfig {
    /// Reasoning service connection and run policy.
    pub assistant: AssistantConfig,
    /// Inbound HTTP boundary and chat bridge.
    pub gateway: GatewayConfig,
    /// Direct-message history replay.
    pub history: HistoryConfig,
    /// Daily broadcast times.
    pub schedule: ScheduleConfig,
    /// Persistence.
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Base URL of the Assistants API (without trailing slash).
    pub base_url: String,
    /// API key. Prefer the OPENAI_API_KEY environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Assistant to run against each conversation thread.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    /// Run status poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Runs only see the most recent N thread messages.
    pub truncation_last_messages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub port: u16,
    pub bind: BindMode,
    pub auth: AuthConfig,
    /// Chat bridge used for outbound delivery and history fetches.
    /// Without one, outbound messages are only logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_url: Option<String>,
}

/// Bind mode for the gateway
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    #[default]
    Loopback,
    Lan,
}

impl BindMode {
    pub fn to_addr(&self) -> &str {
        match self {
            BindMode::Loopback => "127.0.0.1",
            BindMode::Lan => "0.0.0.0",
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Authentication mode
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Token,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Max prior messages replayed into a direct-message conversation.
    pub replay_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Run the built-in daily scheduler.
    pub enabled: bool,
    /// UTC time (HH:MM) of the brainteaser-of-the-day broadcast.
    pub daily_item: String,
    /// UTC time (HH:MM) of the motivation broadcast.
    pub daily_motivation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot file. In-memory only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

// ============================================================
// Defaults
// ============================================================

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            assistant_id: None,
            poll_interval_ms: 1_000,
            truncation_last_messages: 10,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 18800,
            bind: BindMode::default(),
            auth: AuthConfig::default(),
            bridge_url: None,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { replay_limit: 50 }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_item: "09:00".into(),
            daily_motivation: "07:30".into(),
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl TeaserbotConfig {
    /// Load config from a TOML file, falling back to defaults when the file
    /// does not exist. A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = toml::from_str(&content)?;
                tracing::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply environment overrides for secrets and deployment settings.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.assistant.api_key = Some(key);
        }
        if let Some(id) = lookup("TEASERBOT_ASSISTANT_ID") {
            self.assistant.assistant_id = Some(id);
        }
        if let Some(url) = lookup("TEASERBOT_ASSISTANT_URL") {
            self.assistant.base_url = url;
        }
        if let Some(token) = lookup("TEASERBOT_GATEWAY_TOKEN") {
            self.gateway.auth.token = Some(token);
        }
        if let Some(url) = lookup("TEASERBOT_BRIDGE_URL") {
            self.gateway.bridge_url = Some(url);
        }
    }

    /// Check the settings a running bot cannot do without.
    pub fn validate(&self) -> Result<()> {
        if self.assistant.api_key.is_none() {
            return Err(Error::config("assistant API key not set (OPENAI_API_KEY)"));
        }
        if self.assistant.assistant_id.is_none() {
            return Err(Error::config(
                "assistant id not set (TEASERBOT_ASSISTANT_ID or [assistant].assistant_id)",
            ));
        }
        if self.assistant.truncation_last_messages == 0 {
            return Err(Error::config("truncation_last_messages must be at least 1"));
        }
        self.schedule.daily_item_time()?;
        self.schedule.daily_motivation_time()?;
        Ok(())
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl ScheduleConfig {
    pub fn daily_item_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.daily_item)
    }

    pub fn daily_motivation_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.daily_motivation)
    }
}

fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| Error::InvalidScheduleTime {
        value: value.to_string(),
    })
}
