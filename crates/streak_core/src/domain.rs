//! crates/streak_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::rank::GoalRank;

/// Freeze tokens a goal starts with.
pub const INITIAL_FREEZE_COUNT: u32 = 1;

/// A single habit a user is pursuing, together with its progression state.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub target_days: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_checkin_date: Option<NaiveDate>,
    pub freeze_count: u32,
    pub total_points: u64,
    pub rank: GoalRank,
    pub active: bool,
    pub checkin_dates: BTreeSet<NaiveDate>,
    /// Opaque reference to a goal category, managed elsewhere.
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    /// Bumped by the store on every successful write.
    pub version: i64,
}

impl Goal {
    /// Builds a fresh, active goal. `target_days` must already be validated.
    pub fn new(
        owner: impl Into<String>,
        title: impl Into<String>,
        target_days: u32,
        category_id: Option<i64>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            title: title.into(),
            target_days,
            current_streak: 0,
            longest_streak: 0,
            last_checkin_date: None,
            freeze_count: INITIAL_FREEZE_COUNT,
            total_points: 0,
            rank: GoalRank::default(),
            active: true,
            checkin_dates: BTreeSet::new(),
            category_id,
            created_at,
            version: 0,
        }
    }

    /// Streak progress towards the target in percent, rounded to two decimals.
    pub fn completion_percentage(&self) -> f64 {
        if self.target_days == 0 {
            return 0.0;
        }
        let progress = f64::from(self.current_streak) / f64::from(self.target_days) * 100.0;
        (progress * 100.0).round() / 100.0
    }

    /// Number of check-ins recorded in the seven days up to and including `today`.
    pub fn recent_activity(&self, today: NaiveDate) -> usize {
        let since = today - Duration::days(7);
        self.checkin_dates.range(since..=today).count()
    }
}

/// The trophy written once when a goal reaches its target.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalHistory {
    pub id: Uuid,
    pub owner: String,
    /// Goal title annotated with the rank held at completion, e.g. `Run [Novice]`.
    pub title: String,
    pub final_streak: u32,
    pub completed_date: NaiveDate,
}

impl GoalHistory {
    pub fn from_completed(goal: &Goal, completed_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: goal.owner.clone(),
            title: format!("{} [{}]", goal.title, goal.rank),
            final_streak: goal.current_streak,
            completed_date,
        }
    }
}

/// Input for creating a goal. Values are validated by the engine.
#[derive(Debug, Clone)]
pub struct NewGoal {
    pub owner: String,
    pub title: String,
    pub target_days: i32,
    pub category_id: Option<i64>,
}

/// A partial edit of an active goal; `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub target_days: Option<i32>,
    pub category_id: Option<i64>,
}
