//! crates/streak_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or webhooks.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Goal, GoalHistory};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The stored record changed since it was read.
    #[error("Goal {id} was modified concurrently")]
    VersionConflict { id: Uuid },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable goal state keyed by id.
///
/// Every lookup is scoped to the owner: a goal that exists but belongs to someone
/// else is reported exactly like a missing one.
#[async_trait]
pub trait GoalStore: Send + Sync {
    async fn insert_goal(&self, goal: &Goal) -> PortResult<Goal>;

    async fn get_goal(&self, goal_id: Uuid, owner: &str) -> PortResult<Option<Goal>>;

    /// Active goals when `active` is true, completed (closed) goals otherwise.
    async fn list_goals(&self, owner: &str, active: bool) -> PortResult<Vec<Goal>>;

    /// Inserts `goal` only if its owner has no active goal yet. The check and the
    /// insert are one unit of work; `None` means another active goal won.
    async fn insert_sole_active_goal(&self, goal: &Goal) -> PortResult<Option<Goal>>;

    /// Compare-and-swap write. Fails with `VersionConflict` unless the stored
    /// version still equals `expected_version`; returns the goal as stored.
    async fn update_goal(&self, goal: &Goal, expected_version: i64) -> PortResult<Goal>;

    /// Same contract as `update_goal`, additionally appending `history` in the
    /// same unit of work. Either both writes become visible or neither does.
    async fn commit_checkin(
        &self,
        goal: &Goal,
        expected_version: i64,
        history: Option<&GoalHistory>,
    ) -> PortResult<Goal>;

    /// Returns `false` when nothing matched `(goal_id, owner)`.
    async fn delete_goal(&self, goal_id: Uuid, owner: &str) -> PortResult<bool>;
}

/// Append-only record of completed goals.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Most recent completion first.
    async fn list_history(&self, owner: &str) -> PortResult<Vec<GoalHistory>>;

    async fn delete_history(&self, history_id: Uuid, owner: &str) -> PortResult<bool>;
}

/// Side channel signalled after a check-in changed a goal.
#[async_trait]
pub trait CheckinNotifier: Send + Sync {
    async fn notify(&self, owner: &str) -> PortResult<()>;
}

/// A notifier that only logs. Used when no delivery target is configured.
pub struct LogNotifier;

#[async_trait]
impl CheckinNotifier for LogNotifier {
    async fn notify(&self, owner: &str) -> PortResult<()> {
        tracing::debug!(owner, "Check-in notification (no target configured)");
        Ok(())
    }
}
