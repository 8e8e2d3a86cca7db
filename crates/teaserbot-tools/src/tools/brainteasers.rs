//! Brainteaser tools: submit, update, and look up the current brainteaser

use crate::registry::{parse_args, Tool, ToolError};
use crate::store::{BrainteaserStore, BrainteaserUpdate, NewBrainteaser};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct SubmitBrainteaserTool {
    store: Arc<dyn BrainteaserStore>,
}

impl SubmitBrainteaserTool {
    pub fn new(store: Arc<dyn BrainteaserStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for SubmitBrainteaserTool {
    fn name(&self) -> &str {
        "submit_brainteaser"
    }

    fn description(&self) -> &str {
        "Save a new brainteaser proposed by a user so it can be posted as a future brainteaser of the day."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": { "type": "string", "description": "The brainteaser text" },
                "answer": { "type": "string", "description": "Expected answer, if known" },
                "author_id": { "type": "string", "description": "User id of the author" }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let new: NewBrainteaser = parse_args(self.name(), args)?;
        if new.question.trim().is_empty() {
            return Err(ToolError::invalid_arguments(self.name(), "question is empty"));
        }
        let teaser = self.store.insert_brainteaser(new).await?;
        info!(id = %teaser.id, "brainteaser submitted");
        Ok(format!("Saved brainteaser {}", teaser.id))
    }
}

pub struct UpdateBrainteaserTool {
    store: Arc<dyn BrainteaserStore>,
}

impl UpdateBrainteaserTool {
    pub fn new(store: Arc<dyn BrainteaserStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct UpdateArgs {
    id: Uuid,
    #[serde(flatten)]
    update: BrainteaserUpdate,
}

#[async_trait::async_trait]
impl Tool for UpdateBrainteaserTool {
    fn name(&self) -> &str {
        "update_brainteaser"
    }

    fn description(&self) -> &str {
        "Correct the question or answer of an existing brainteaser."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Brainteaser id" },
                "question": { "type": "string" },
                "answer": { "type": "string" }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args: UpdateArgs = parse_args(self.name(), args)?;
        let teaser = self.store.update_brainteaser(args.id, args.update).await?;
        Ok(format!("Updated brainteaser {}", teaser.id))
    }
}

pub struct CurrentBrainteaserTool {
    store: Arc<dyn BrainteaserStore>,
}

impl CurrentBrainteaserTool {
    pub fn new(store: Arc<dyn BrainteaserStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for CurrentBrainteaserTool {
    fn name(&self) -> &str {
        "get_current_brainteaser"
    }

    fn description(&self) -> &str {
        "Return today's brainteaser (the most recently posted one), including its expected answer."
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<String, ToolError> {
        match self.store.latest_posted().await? {
            Some(teaser) => Ok(json!({
                "id": teaser.id,
                "question": teaser.question,
                "answer": teaser.answer,
                "posted_at": teaser.posted_at,
            })
            .to_string()),
            None => Ok("No brainteaser has been posted yet.".to_string()),
        }
    }
}
