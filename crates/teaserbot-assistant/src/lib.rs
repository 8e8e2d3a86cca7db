//! Teaserbot Assistant - Reasoning service client (threads, runs, tool outputs)

pub mod client;
pub mod openai;
pub mod types;

pub use client::{AssistantClient, AssistantError, AssistantResult};
pub use openai::OpenAiAssistantsClient;
pub use types::*;
