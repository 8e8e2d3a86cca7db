//! Tool registry and trait definitions
//!
//! Each tool is a self-contained module implementing the Tool trait.
//! The registry is a lookup table from name to handler; it holds no
//! business logic of its own.

use crate::store::StoreError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use teaserbot_assistant::AssistantTool;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("{0}")]
    Failed(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ToolError {
    pub fn invalid_arguments(tool: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Deserialize a tool's argument object into its typed form.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::invalid_arguments(tool, e))
}

/// Implement this to add a new capability.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (e.g. "award_points").
    fn name(&self) -> &str;

    /// Human-readable description sent to the assistant.
    fn description(&self) -> &str;

    /// JSON Schema for the argument object.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value) -> Result<String, ToolError>;

    /// Convert to the assistant's function catalog format.
    fn to_assistant_tool(&self) -> AssistantTool {
        AssistantTool::function(self.name(), self.description(), self.parameters())
    }
}

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Remove a tool by name.
    pub fn remove(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Invoke a tool with its raw JSON argument string.
    ///
    /// An empty argument string is treated as `{}`.
    pub async fn invoke(&self, name: &str, args_json: &str) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let args = if args_json.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(args_json).map_err(|e| ToolError::invalid_arguments(name, e))?
        };
        tool.execute(args).await
    }

    /// Function catalog for all tools, sorted by name.
    pub fn definitions(&self) -> Vec<AssistantTool> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools.into_iter().map(|t| t.to_assistant_tool()).collect()
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
