//! Solution tools: record, judge, and list answers to brainteasers

use crate::registry::{parse_args, Tool, ToolError};
use crate::store::{BrainteaserStore, NewSolution};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Resolve an explicit brainteaser id, or fall back to the one posted last.
async fn resolve_brainteaser(
    store: &dyn BrainteaserStore,
    id: Option<Uuid>,
) -> Result<Uuid, ToolError> {
    match id {
        Some(id) => Ok(id),
        None => store
            .latest_posted()
            .await?
            .map(|t| t.id)
            .ok_or_else(|| ToolError::failed("no brainteaser has been posted yet")),
    }
}

pub struct SubmitSolutionTool {
    store: Arc<dyn BrainteaserStore>,
}

impl SubmitSolutionTool {
    pub fn new(store: Arc<dyn BrainteaserStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct SubmitArgs {
    user_id: String,
    content: String,
    #[serde(default)]
    brainteaser_id: Option<Uuid>,
}

#[async_trait::async_trait]
impl Tool for SubmitSolutionTool {
    fn name(&self) -> &str {
        "submit_solution"
    }

    fn description(&self) -> &str {
        "Record a user's attempted solution. Defaults to the current brainteaser of the day."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": { "type": "string" },
                "content": { "type": "string", "description": "The proposed solution" },
                "brainteaser_id": { "type": "string", "description": "Omit for today's brainteaser" }
            },
            "required": ["user_id", "content"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args: SubmitArgs = parse_args(self.name(), args)?;
        let brainteaser_id = resolve_brainteaser(self.store.as_ref(), args.brainteaser_id).await?;
        let solution = self
            .store
            .insert_solution(NewSolution {
                brainteaser_id,
                user_id: args.user_id,
                content: args.content,
            })
            .await?;
        Ok(format!(
            "Recorded solution {} for brainteaser {}",
            solution.id, brainteaser_id
        ))
    }
}

pub struct JudgeSolutionTool {
    store: Arc<dyn BrainteaserStore>,
}

impl JudgeSolutionTool {
    pub fn new(store: Arc<dyn BrainteaserStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct JudgeArgs {
    solution_id: Uuid,
    correct: bool,
    #[serde(default = "default_points")]
    points: i64,
}

fn default_points() -> i64 {
    1
}

#[async_trait::async_trait]
impl Tool for JudgeSolutionTool {
    fn name(&self) -> &str {
        "judge_solution"
    }

    fn description(&self) -> &str {
        "Mark a recorded solution as correct or incorrect. A solution newly marked correct awards points to its author."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "solution_id": { "type": "string" },
                "correct": { "type": "boolean" },
                "points": { "type": "integer", "description": "Points for a correct solution (default 1)" }
            },
            "required": ["solution_id", "correct"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args: JudgeArgs = parse_args(self.name(), args)?;
        let (solution, previous) = self
            .store
            .update_solution(args.solution_id, args.correct)
            .await?;
        if !args.correct {
            return Ok(format!("Marked solution {} as incorrect", solution.id));
        }
        // Repeated calls must not score twice.
        if previous == Some(true) {
            return Ok(format!(
                "Solution {} was already marked correct; no points awarded",
                solution.id
            ));
        }
        let total = self
            .store
            .increment_points(&solution.user_id, args.points)
            .await?;
        info!(user = %solution.user_id, points = args.points, total, "solution judged correct");
        Ok(format!(
            "Marked solution {} as correct; {} now has {} points",
            solution.id, solution.user_id, total
        ))
    }
}

pub struct ListSolutionsTool {
    store: Arc<dyn BrainteaserStore>,
}

impl ListSolutionsTool {
    pub fn new(store: Arc<dyn BrainteaserStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct ListArgs {
    #[serde(default)]
    brainteaser_id: Option<Uuid>,
}

#[async_trait::async_trait]
impl Tool for ListSolutionsTool {
    fn name(&self) -> &str {
        "list_solutions"
    }

    fn description(&self) -> &str {
        "List the solutions submitted for a brainteaser (today's by default)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "brainteaser_id": { "type": "string" }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args: ListArgs = parse_args(self.name(), args)?;
        let brainteaser_id = resolve_brainteaser(self.store.as_ref(), args.brainteaser_id).await?;
        let solutions = self.store.solutions_for(brainteaser_id).await?;
        serde_json::to_string(&solutions).map_err(|e| ToolError::failed(e.to_string()))
    }
}
