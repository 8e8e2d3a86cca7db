//! Persistence collaborator used by tool handlers and the channel registry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("invalid update: {0}")]
    Invalid(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub points: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brainteaser {
    pub id: Uuid,
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewBrainteaser {
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BrainteaserUpdate {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub id: Uuid,
    pub brainteaser_id: Uuid,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub correct: Option<bool>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewSolution {
    pub brainteaser_id: Uuid,
    pub user_id: String,
    pub content: String,
}

/// Relational storage as seen by the bot: narrow async operations that
/// either return a value or fail.
#[async_trait::async_trait]
pub trait BrainteaserStore: Send + Sync {
    /// Insert the user or refresh their display name. Points are kept.
    async fn upsert_user(&self, id: &str, name: &str) -> StoreResult<User>;

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>>;

    async fn insert_brainteaser(&self, new: NewBrainteaser) -> StoreResult<Brainteaser>;

    async fn update_brainteaser(&self, id: Uuid, update: BrainteaserUpdate)
        -> StoreResult<Brainteaser>;

    async fn get_brainteaser(&self, id: Uuid) -> StoreResult<Option<Brainteaser>>;

    async fn insert_solution(&self, new: NewSolution) -> StoreResult<Solution>;

    /// Record the judgement of a solution. Returns the updated solution and
    /// the judgement it carried before.
    async fn update_solution(&self, id: Uuid, correct: bool)
        -> StoreResult<(Solution, Option<bool>)>;

    async fn solutions_for(&self, brainteaser_id: Uuid) -> StoreResult<Vec<Solution>>;

    /// Add `delta` to the user's points. Returns the new total. A total
    /// outside `i64` is rejected and nothing changes.
    async fn increment_points(&self, user_id: &str, delta: i64) -> StoreResult<i64>;

    /// Users ordered by points, highest first.
    async fn leaderboard(&self, limit: usize) -> StoreResult<Vec<User>>;

    async fn upsert_channel_subscription(&self, channel_id: &str, subscribed: bool)
        -> StoreResult<()>;

    async fn subscribed_channels(&self) -> StoreResult<Vec<String>>;

    /// Random pick among brainteasers that were never posted.
    async fn select_next_brainteaser(&self) -> StoreResult<Option<Brainteaser>>;

    async fn mark_posted(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Brainteaser>;

    /// Most recently posted brainteaser.
    async fn latest_posted(&self) -> StoreResult<Option<Brainteaser>>;
}
