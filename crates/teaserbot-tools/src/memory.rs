//! In-process store, optionally snapshotted to a JSON file after every mutation

use crate::store::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoreState {
    users: BTreeMap<String, User>,
    brainteasers: BTreeMap<Uuid, Brainteaser>,
    solutions: BTreeMap<Uuid, Solution>,
    channels: BTreeMap<String, bool>,
}

pub struct MemoryStore {
    state: RwLock<StoreState>,
    snapshot_path: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            snapshot_path: None,
        }
    }

    /// Open a store backed by a JSON snapshot. A missing file starts empty.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::Persistence(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(StoreError::Persistence(e.to_string())),
        };
        info!(
            "Store opened at {} ({} users, {} brainteasers)",
            path.display(),
            state.users.len(),
            state.brainteasers.len()
        );
        Ok(Self {
            state: RwLock::new(state),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Writes a temp file next to the snapshot, then renames it over.
    async fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Persistence(e.to_string()))?;
            }
        }
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        debug!("Store snapshot written to {}", path.display());
        Ok(())
    }
}

#[async_trait::async_trait]
impl BrainteaserStore for MemoryStore {
    async fn upsert_user(&self, id: &str, name: &str) -> StoreResult<User> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .entry(id.to_string())
            .and_modify(|u| u.name = name.to_string())
            .or_insert_with(|| User {
                id: id.to_string(),
                name: name.to_string(),
                points: 0,
            })
            .clone();
        self.persist(&state).await?;
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn insert_brainteaser(&self, new: NewBrainteaser) -> StoreResult<Brainteaser> {
        let mut state = self.state.write().await;
        let teaser = Brainteaser {
            id: Uuid::new_v4(),
            question: new.question,
            answer: new.answer,
            author_id: new.author_id,
            created_at: Utc::now(),
            posted_at: None,
        };
        state.brainteasers.insert(teaser.id, teaser.clone());
        self.persist(&state).await?;
        Ok(teaser)
    }

    async fn update_brainteaser(
        &self,
        id: Uuid,
        update: BrainteaserUpdate,
    ) -> StoreResult<Brainteaser> {
        let mut state = self.state.write().await;
        let teaser = state
            .brainteasers
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("brainteaser", id))?;
        if let Some(question) = update.question {
            teaser.question = question;
        }
        if let Some(answer) = update.answer {
            teaser.answer = Some(answer);
        }
        let teaser = teaser.clone();
        self.persist(&state).await?;
        Ok(teaser)
    }

    async fn get_brainteaser(&self, id: Uuid) -> StoreResult<Option<Brainteaser>> {
        Ok(self.state.read().await.brainteasers.get(&id).cloned())
    }

    async fn insert_solution(&self, new: NewSolution) -> StoreResult<Solution> {
        let mut state = self.state.write().await;
        if !state.brainteasers.contains_key(&new.brainteaser_id) {
            return Err(StoreError::not_found("brainteaser", new.brainteaser_id));
        }
        let solution = Solution {
            id: Uuid::new_v4(),
            brainteaser_id: new.brainteaser_id,
            user_id: new.user_id,
            content: new.content,
            correct: None,
            submitted_at: Utc::now(),
        };
        state.solutions.insert(solution.id, solution.clone());
        self.persist(&state).await?;
        Ok(solution)
    }

    async fn update_solution(
        &self,
        id: Uuid,
        correct: bool,
    ) -> StoreResult<(Solution, Option<bool>)> {
        let mut state = self.state.write().await;
        let solution = state
            .solutions
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("solution", id))?;
        let previous = solution.correct.replace(correct);
        let solution = solution.clone();
        self.persist(&state).await?;
        Ok((solution, previous))
    }

    async fn solutions_for(&self, brainteaser_id: Uuid) -> StoreResult<Vec<Solution>> {
        let state = self.state.read().await;
        let mut solutions: Vec<Solution> = state
            .solutions
            .values()
            .filter(|s| s.brainteaser_id == brainteaser_id)
            .cloned()
            .collect();
        solutions.sort_by_key(|s| s.submitted_at);
        Ok(solutions)
    }

    async fn increment_points(&self, user_id: &str, delta: i64) -> StoreResult<i64> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::not_found("user", user_id))?;
        let total = user.points.checked_add(delta).ok_or_else(|| {
            StoreError::Invalid(format!(
                "adding {} to {} points for {} overflows",
                delta, user.points, user_id
            ))
        })?;
        user.points = total;
        self.persist(&state).await?;
        Ok(total)
    }

    async fn leaderboard(&self, limit: usize) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.name.cmp(&b.name)));
        users.truncate(limit);
        Ok(users)
    }

    async fn upsert_channel_subscription(
        &self,
        channel_id: &str,
        subscribed: bool,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.channels.insert(channel_id.to_string(), subscribed);
        self.persist(&state).await
    }

    async fn subscribed_channels(&self) -> StoreResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .channels
            .iter()
            .filter(|(_, subscribed)| **subscribed)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn select_next_brainteaser(&self) -> StoreResult<Option<Brainteaser>> {
        let state = self.state.read().await;
        let eligible: Vec<&Brainteaser> = state
            .brainteasers
            .values()
            .filter(|b| b.posted_at.is_none())
            .collect();
        if eligible.is_empty() {
            return Ok(None);
        }
        let index = (Uuid::new_v4().as_u128() % eligible.len() as u128) as usize;
        Ok(Some(eligible[index].clone()))
    }

    async fn mark_posted(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Brainteaser> {
        let mut state = self.state.write().await;
        let teaser = state
            .brainteasers
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("brainteaser", id))?;
        teaser.posted_at = Some(at);
        let teaser = teaser.clone();
        self.persist(&state).await?;
        Ok(teaser)
    }

    async fn latest_posted(&self) -> StoreResult<Option<Brainteaser>> {
        let state = self.state.read().await;
        Ok(state
            .brainteasers
            .values()
            .filter(|b| b.posted_at.is_some())
            .max_by_key(|b| b.posted_at)
            .cloned())
    }
}
