//! Teaserbot Engine - Conversation orchestration
//!
//! One remote thread per chat channel, at most one run in flight per
//! thread, and tool calls serviced in parallel with failures contained.

pub mod channels;
pub mod chat;
pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod queue;
pub mod run;

pub use channels::{format_user_message, ChannelSessionRegistry};
pub use chat::{ChatError, ChatOutbox, HistorySource};
pub use conversation::ConversationStore;
pub use error::{EngineError, EngineResult, QueueError, RunError};
pub use orchestrator::{
    announcement, ChannelStatus, Decision, Orchestrator, OrchestratorConfig, TickReport, HELP_TEXT,
};
pub use queue::SerializedQueue;
pub use run::{RunDriver, RunDriverConfig, MAX_TOOL_OUTPUT_CHARS};
