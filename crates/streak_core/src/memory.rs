//! crates/streak_core/src/memory.rs
//!
//! An in-process implementation of the store ports. It backs the test suites and
//! lets the API run without a database. All state sits behind one mutex, so each
//! port call is a single critical section.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{Goal, GoalHistory};
use crate::ports::{GoalStore, HistoryStore, PortError, PortResult};

#[derive(Default)]
struct State {
    goals: HashMap<Uuid, Goal>,
    history: Vec<GoalHistory>,
}

/// Goal and history storage held in memory.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GoalStore for InMemoryStore {
    async fn insert_goal(&self, goal: &Goal) -> PortResult<Goal> {
        let mut state = self.state.lock().await;
        if state.goals.contains_key(&goal.id) {
            return Err(PortError::Unexpected(format!("Goal {} already exists", goal.id)));
        }
        state.goals.insert(goal.id, goal.clone());
        Ok(goal.clone())
    }

    async fn get_goal(&self, goal_id: Uuid, owner: &str) -> PortResult<Option<Goal>> {
        let state = self.state.lock().await;
        Ok(state
            .goals
            .get(&goal_id)
            .filter(|goal| goal.owner == owner)
            .cloned())
    }

    async fn list_goals(&self, owner: &str, active: bool) -> PortResult<Vec<Goal>> {
        let state = self.state.lock().await;
        let mut goals: Vec<Goal> = state
            .goals
            .values()
            .filter(|goal| goal.owner == owner && goal.active == active)
            .cloned()
            .collect();
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }

    async fn insert_sole_active_goal(&self, goal: &Goal) -> PortResult<Option<Goal>> {
        let mut state = self.state.lock().await;
        let taken = state
            .goals
            .values()
            .any(|stored| stored.owner == goal.owner && stored.active);
        if taken {
            return Ok(None);
        }
        state.goals.insert(goal.id, goal.clone());
        Ok(Some(goal.clone()))
    }

    async fn update_goal(&self, goal: &Goal, expected_version: i64) -> PortResult<Goal> {
        self.commit_checkin(goal, expected_version, None).await
    }

    async fn commit_checkin(
        &self,
        goal: &Goal,
        expected_version: i64,
        history: Option<&GoalHistory>,
    ) -> PortResult<Goal> {
        let mut state = self.state.lock().await;
        let stored = state
            .goals
            .get_mut(&goal.id)
            .filter(|stored| stored.owner == goal.owner)
            .ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal.id)))?;
        if stored.version != expected_version {
            return Err(PortError::VersionConflict { id: goal.id });
        }

        let mut next = goal.clone();
        next.version = expected_version + 1;
        *stored = next.clone();
        if let Some(history) = history {
            state.history.push(history.clone());
        }
        Ok(next)
    }

    async fn delete_goal(&self, goal_id: Uuid, owner: &str) -> PortResult<bool> {
        let mut state = self.state.lock().await;
        let owned = state
            .goals
            .get(&goal_id)
            .is_some_and(|goal| goal.owner == owner);
        if owned {
            state.goals.remove(&goal_id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn list_history(&self, owner: &str) -> PortResult<Vec<GoalHistory>> {
        let state = self.state.lock().await;
        let mut entries: Vec<GoalHistory> = state
            .history
            .iter()
            .filter(|entry| entry.owner == owner)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.completed_date.cmp(&a.completed_date));
        Ok(entries)
    }

    async fn delete_history(&self, history_id: Uuid, owner: &str) -> PortResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.history.len();
        state
            .history
            .retain(|entry| !(entry.id == history_id && entry.owner == owner));
        Ok(state.history.len() != before)
    }
}
