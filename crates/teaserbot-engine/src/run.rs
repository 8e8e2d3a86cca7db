//! Run driver: submit, poll, service tool calls, return the final answer

use crate::error::RunError;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use teaserbot_assistant::{
    AssistantClient, RunRequest, RunSnapshot, RunStatus, ThreadId, ToolCallRequest, ToolOutput,
    TruncationStrategy,
};
use teaserbot_core::AssistantConfig;
use teaserbot_tools::ToolRegistry;
use tracing::{debug, info, warn};

/// Tool outputs longer than this are cut before submission.
pub const MAX_TOOL_OUTPUT_CHARS: usize = 50_000;

#[derive(Debug, Clone)]
pub struct RunDriverConfig {
    /// Runs only see this many of the thread's most recent messages.
    pub truncation_last_messages: u32,
    /// Delay between status polls while a run is queued or in progress.
    pub poll_interval: Duration,
}

impl Default for RunDriverConfig {
    fn default() -> Self {
        Self {
            truncation_last_messages: 10,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl From<&AssistantConfig> for RunDriverConfig {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            truncation_last_messages: config.truncation_last_messages,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

pub struct RunDriver {
    client: Arc<dyn AssistantClient>,
    tools: Arc<ToolRegistry>,
    config: RunDriverConfig,
}

impl RunDriver {
    pub fn new(
        client: Arc<dyn AssistantClient>,
        tools: Arc<ToolRegistry>,
        config: RunDriverConfig,
    ) -> Self {
        Self {
            client,
            tools,
            config,
        }
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn config(&self) -> &RunDriverConfig {
        &self.config
    }

    /// Run the assistant on `thread` until it reaches a terminal state.
    ///
    /// Returns the text of the thread's latest message on completion. The
    /// caller must guarantee no other run is active on the thread.
    pub async fn execute(&self, thread: &ThreadId, assistant_id: &str) -> Result<String, RunError> {
        let catalog = self.tools.definitions();
        let request = RunRequest {
            assistant_id: assistant_id.to_string(),
            truncation_strategy: TruncationStrategy::LastMessages {
                last_messages: self.config.truncation_last_messages,
            },
            tools: if catalog.is_empty() { None } else { Some(catalog) },
        };
        let run = self.client.submit_run(thread, request).await?;
        info!(thread = %thread, run_id = %run, "run submitted");

        let mut round = 0u32;
        loop {
            let snapshot = self.client.get_run(thread, &run).await?;
            match snapshot.status {
                status if status.is_transient() => {
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                RunStatus::RequiresAction => {
                    let calls = snapshot.pending_tool_calls().ok_or_else(|| {
                        RunError::failed(
                            "missing_required_action",
                            "run requires action but carries no tool calls",
                        )
                    })?;
                    round += 1;
                    info!(run_id = %run, round, tools = calls.len(), "servicing tool calls");
                    let outputs = self.service_tool_calls(calls).await;
                    self.client.submit_tool_outputs(thread, &run, outputs).await?;
                }
                RunStatus::Completed => {
                    info!(run_id = %run, rounds = round, "run completed");
                    return self.final_text(thread).await;
                }
                RunStatus::Failed => return Err(failure(&snapshot)),
                RunStatus::Incomplete => {
                    let reason = snapshot
                        .incomplete_details
                        .and_then(|d| d.reason)
                        .unwrap_or_else(|| "unknown".to_string());
                    warn!(run_id = %run, reason = %reason, "run incomplete");
                    return Err(RunError::Incomplete { reason });
                }
                other => {
                    warn!(run_id = %run, status = ?other, "run ended in unexpected status");
                    return Err(RunError::failed(
                        "unexpected_status",
                        format!("run ended with status {:?}", other),
                    ));
                }
            }
        }
    }

    /// Resolve every call concurrently. Always yields one output per call,
    /// in call order; failures become descriptive output text.
    pub async fn service_tool_calls(&self, calls: &[ToolCallRequest]) -> Vec<ToolOutput> {
        let pending = calls.iter().map(|call| async move {
            let name = call.function.name.as_str();
            debug!(tool = name, call_id = %call.id, "executing tool");
            let result = AssertUnwindSafe(self.tools.invoke(name, &call.function.arguments))
                .catch_unwind()
                .await;
            let output = match result {
                Ok(Ok(output)) => truncate_output(output),
                Ok(Err(e)) => {
                    warn!(tool = name, error = %e, "tool call failed");
                    format!("Error running tool '{}': {}", name, e)
                }
                Err(_) => {
                    warn!(tool = name, "tool call panicked");
                    format!("Error running tool '{}': handler panicked", name)
                }
            };
            ToolOutput {
                tool_call_id: call.id.clone(),
                output,
            }
        });
        join_all(pending).await
    }

    async fn final_text(&self, thread: &ThreadId) -> Result<String, RunError> {
        let message = self
            .client
            .latest_message(thread)
            .await?
            .ok_or_else(|| RunError::failed("empty_thread", "run completed without a message"))?;
        message.first_text().map(str::to_string).ok_or_else(|| {
            RunError::failed(
                "unsupported_content",
                format!("latest message {} has no text content", message.id),
            )
        })
    }
}

fn failure(snapshot: &RunSnapshot) -> RunError {
    let (code, message) = match &snapshot.last_error {
        Some(e) => (e.code.clone(), e.message.clone()),
        None => ("unknown".to_string(), "run failed without details".to_string()),
    };
    warn!(run_id = %snapshot.id, code = %code, message = %message, "run failed");
    RunError::Failed { code, message }
}

fn truncate_output(output: String) -> String {
    match output.char_indices().nth(MAX_TOOL_OUTPUT_CHARS) {
        Some((cut, _)) => format!(
            "{}...\n[truncated, {} total chars]",
            &output[..cut],
            output.chars().count()
        ),
        None => output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_untouched() {
        assert_eq!(truncate_output("ok".into()), "ok");
    }

    #[test]
    fn long_output_truncated_on_char_boundary() {
        let long = "é".repeat(MAX_TOOL_OUTPUT_CHARS + 5);
        let out = truncate_output(long);
        assert!(out.ends_with(&format!("[truncated, {} total chars]", MAX_TOOL_OUTPUT_CHARS + 5)));
        assert!(out.starts_with("éé"));
    }

    #[test]
    fn config_from_assistant_section() {
        let section = AssistantConfig {
            poll_interval_ms: 250,
            truncation_last_messages: 4,
            ..Default::default()
        };
        let config = RunDriverConfig::from(&section);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.truncation_last_messages, 4);
    }
}
