//! Scoring tools: award points and read the leaderboard

use crate::registry::{parse_args, Tool, ToolError};
use crate::store::BrainteaserStore;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub struct AwardPointsTool {
    store: Arc<dyn BrainteaserStore>,
}

impl AwardPointsTool {
    pub fn new(store: Arc<dyn BrainteaserStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct AwardArgs {
    user_id: String,
    points: i64,
}

#[async_trait::async_trait]
impl Tool for AwardPointsTool {
    fn name(&self) -> &str {
        "award_points"
    }

    fn description(&self) -> &str {
        "Add (or with a negative value, remove) points for a user. Returns the new total."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": { "type": "string" },
                "points": { "type": "integer" }
            },
            "required": ["user_id", "points"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args: AwardArgs = parse_args(self.name(), args)?;
        let total = self.store.increment_points(&args.user_id, args.points).await?;
        info!(user = %args.user_id, points = args.points, total, "points awarded");
        Ok(format!("{} now has {} points", args.user_id, total))
    }
}

pub struct LeaderboardTool {
    store: Arc<dyn BrainteaserStore>,
}

impl LeaderboardTool {
    pub fn new(store: Arc<dyn BrainteaserStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct LeaderboardArgs {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    10
}

#[async_trait::async_trait]
impl Tool for LeaderboardTool {
    fn name(&self) -> &str {
        "get_leaderboard"
    }

    fn description(&self) -> &str {
        "Return the users with the most points, highest first."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer", "description": "Max entries (default 10)" }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args: LeaderboardArgs = parse_args(self.name(), args)?;
        let users = self.store.leaderboard(args.limit).await?;
        serde_json::to_string(&users).map_err(|e| ToolError::failed(e.to_string()))
    }
}
