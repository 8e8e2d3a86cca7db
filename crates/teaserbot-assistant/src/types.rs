//! Thread, run, and tool-call types for the Assistants protocol

use serde::{Deserialize, Serialize};

/// Remote conversation thread handle
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote run handle
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Run submission
// ---------------------------------------------------------------------------

/// Parameters for starting a run on a thread.
#[derive(Clone, Debug, Serialize)]
pub struct RunRequest {
    pub assistant_id: String,
    pub truncation_strategy: TruncationStrategy,
    /// Overrides the assistant's configured tools when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AssistantTool>>,
}

/// How much of the thread a run gets to see.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TruncationStrategy {
    Auto,
    LastMessages { last_messages: u32 },
}

/// Tool entry of the run's catalog
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantTool {
    Function { function: FunctionDefinition },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl AssistantTool {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self::Function {
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Function { function } => &function.name,
        }
    }
}

// ---------------------------------------------------------------------------
// Run status
// ---------------------------------------------------------------------------

/// Run lifecycle status as reported by the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Still running on the remote side; keep polling.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Queued | Self::InProgress)
    }
}

/// Point-in-time view of a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub id: RunId,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<RunLastError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incomplete_details: Option<IncompleteDetails>,
}

impl RunSnapshot {
    pub fn new(id: impl Into<String>, status: RunStatus) -> Self {
        Self {
            id: RunId::new(id),
            status,
            required_action: None,
            last_error: None,
            incomplete_details: None,
        }
    }

    /// A `requires_action` snapshot asking for the given tool calls.
    pub fn requires_tools(id: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            required_action: Some(RequiredAction::SubmitToolOutputs {
                submit_tool_outputs: SubmitToolOutputs { tool_calls },
            }),
            ..Self::new(id, RunStatus::RequiresAction)
        }
    }

    pub fn failed(id: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            last_error: Some(RunLastError {
                code: code.into(),
                message: message.into(),
            }),
            ..Self::new(id, RunStatus::Failed)
        }
    }

    pub fn incomplete(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            incomplete_details: Some(IncompleteDetails {
                reason: Some(reason.into()),
            }),
            ..Self::new(id, RunStatus::Incomplete)
        }
    }

    /// Tool calls requested by a `requires_action` snapshot.
    pub fn pending_tool_calls(&self) -> Option<&[ToolCallRequest]> {
        match &self.required_action {
            Some(RequiredAction::SubmitToolOutputs { submit_tool_outputs }) => {
                Some(&submit_tool_outputs.tool_calls)
            }
            None => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequiredAction {
    SubmitToolOutputs { submit_tool_outputs: SubmitToolOutputs },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<ToolCallRequest>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunLastError {
    pub code: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IncompleteDetails {
    #[serde(default)]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Tool calls
// ---------------------------------------------------------------------------

/// A single tool invocation requested mid-run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Result for one tool call, submitted back to resume the run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

// ---------------------------------------------------------------------------
// Thread messages
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
}

impl ThreadMessage {
    pub fn text(id: impl Into<String>, role: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            content: vec![ContentPart::Text {
                text: TextContent {
                    value: value.into(),
                },
            }],
        }
    }

    /// Text of the first content part, if that part is text.
    pub fn first_text(&self) -> Option<&str> {
        match self.content.first() {
            Some(ContentPart::Text { text }) => Some(&text.value),
            _ => None,
        }
    }
}
