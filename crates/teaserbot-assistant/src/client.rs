//! Reasoning service client trait

use crate::types::{RunId, RunRequest, RunSnapshot, ThreadId, ThreadMessage, ToolOutput};
use teaserbot_core::Role;

/// Result type for assistant operations
pub type AssistantResult<T> = Result<T, AssistantError>;

/// Assistant client error types
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Threads-and-runs reasoning service.
///
/// A thread accumulates messages; a run asks the assistant to act on the
/// thread's current content. While a run is active no other run may be
/// started on the same thread and messages cannot be appended to it.
#[async_trait::async_trait]
pub trait AssistantClient: Send + Sync {
    fn name(&self) -> &str;

    async fn create_thread(&self) -> AssistantResult<ThreadId>;

    async fn append_message(&self, thread: &ThreadId, role: Role, content: &str)
        -> AssistantResult<()>;

    async fn submit_run(&self, thread: &ThreadId, request: RunRequest) -> AssistantResult<RunId>;

    async fn get_run(&self, thread: &ThreadId, run: &RunId) -> AssistantResult<RunSnapshot>;

    async fn submit_tool_outputs(
        &self,
        thread: &ThreadId,
        run: &RunId,
        outputs: Vec<ToolOutput>,
    ) -> AssistantResult<()>;

    /// Most recent message on the thread, if any.
    async fn latest_message(&self, thread: &ThreadId) -> AssistantResult<Option<ThreadMessage>>;
}
