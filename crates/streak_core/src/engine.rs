//! crates/streak_core/src/engine.rs
//!
//! The streak engine: the check-in state machine and the goal service around it.
//!
//! `apply_checkin` is the pure transition. It takes a goal and a calendar date and
//! returns the next state of the goal plus what happened along the way.
//! `StreakEngine` loads goals through the store ports, runs the transition, and
//! commits the result with a compare-and-swap on the goal's version, so two
//! check-ins on the same goal can never interleave.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dashboard::{summarize, DashboardSummary};
use crate::domain::{Goal, GoalHistory, GoalUpdate, NewGoal};
use crate::ports::{CheckinNotifier, GoalStore, HistoryStore, PortError};
use crate::rank::GoalRank;

//=========================================================================================
// Progression Rules
//=========================================================================================

pub const BASE_XP: u64 = 10;
pub const STREAK_XP_MULTIPLIER: u64 = 5;
pub const WEEKLY_MILESTONE_DAYS: u32 = 7;
pub const WEEKLY_MILESTONE_BONUS: u64 = 100;
pub const FREEZE_REFILL_DAYS: u32 = 30;

//=========================================================================================
// Errors
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Missing, not owned, or already closed. All three are reported the same way.
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Gave up after repeated concurrent modifications of the same goal.
    #[error("Goal {goal_id} is busy, try again")]
    Busy { goal_id: Uuid },
    #[error("Storage error: {0}")]
    Port(PortError),
}

impl From<PortError> for EngineError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => EngineError::NotFound(what),
            other => EngineError::Port(other),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

//=========================================================================================
// The Pure Transition
//=========================================================================================

/// How a check-in affected the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckinOutcome {
    /// A check-in already exists for that day; nothing changed.
    AlreadyCheckedIn,
    /// First check-in ever on this goal.
    Started,
    Continued,
    /// A gap was bridged by spending a freeze.
    FreezeUsed,
    /// A gap with no freeze left; the streak starts over at 1.
    Reset,
}

impl CheckinOutcome {
    pub fn changed_state(&self) -> bool {
        !matches!(self, CheckinOutcome::AlreadyCheckedIn)
    }
}

/// The result of applying one check-in to one goal.
#[derive(Debug, Clone)]
pub struct Transition {
    pub goal: Goal,
    pub outcome: CheckinOutcome,
    /// Base award, without the milestone bonus.
    pub points_earned: u64,
    pub milestone_bonus: u64,
    pub freeze_refilled: bool,
    /// `(before, after)` when the rank moved.
    pub rank_changed: Option<(GoalRank, GoalRank)>,
    pub completed: bool,
}

/// Applies a check-in dated `today` to `goal`.
///
/// Closed goals are rejected as not found, and a date before the last recorded
/// check-in is rejected as invalid. Checking in twice on one day leaves the goal
/// untouched.
pub fn apply_checkin(goal: &Goal, today: NaiveDate) -> EngineResult<Transition> {
    if !goal.active {
        return Err(EngineError::NotFound(format!("Active goal {} not found", goal.id)));
    }

    let mut next = goal.clone();
    let unchanged = |goal: Goal| Transition {
        goal,
        outcome: CheckinOutcome::AlreadyCheckedIn,
        points_earned: 0,
        milestone_bonus: 0,
        freeze_refilled: false,
        rank_changed: None,
        completed: false,
    };

    let outcome = match goal.last_checkin_date {
        None => {
            next.current_streak = 1;
            CheckinOutcome::Started
        }
        Some(last) => {
            let gap = (today - last).num_days();
            if gap == 0 {
                return Ok(unchanged(next));
            }
            if gap < 0 {
                return Err(EngineError::Validation(format!(
                    "Check-in date {} is before the last check-in on {}",
                    today, last
                )));
            }
            if gap == 1 {
                next.current_streak = next.current_streak.saturating_add(1);
                CheckinOutcome::Continued
            } else if next.freeze_count > 0 {
                next.freeze_count -= 1;
                next.current_streak = next.current_streak.saturating_add(1);
                CheckinOutcome::FreezeUsed
            } else {
                next.current_streak = 1;
                CheckinOutcome::Reset
            }
        }
    };

    let streak = next.current_streak;
    let points_earned = BASE_XP + u64::from(streak) * STREAK_XP_MULTIPLIER;
    next.total_points = next.total_points.saturating_add(points_earned);

    let milestone_bonus = if streak % WEEKLY_MILESTONE_DAYS == 0 {
        WEEKLY_MILESTONE_BONUS
    } else {
        0
    };
    next.total_points = next.total_points.saturating_add(milestone_bonus);

    let new_rank = GoalRank::for_points(next.total_points);
    let rank_changed = (new_rank != goal.rank).then_some((goal.rank, new_rank));
    next.rank = new_rank;

    next.last_checkin_date = Some(today);

    let completed = streak == next.target_days;
    if completed {
        next.active = false;
    }

    next.longest_streak = next.longest_streak.max(streak);

    let freeze_refilled = streak % FREEZE_REFILL_DAYS == 0;
    if freeze_refilled {
        next.freeze_count = next.freeze_count.saturating_add(1);
    }

    next.checkin_dates.insert(today);

    Ok(Transition {
        goal: next,
        outcome,
        points_earned,
        milestone_bonus,
        freeze_refilled,
        rank_changed,
        completed,
    })
}

//=========================================================================================
// Engine Service
//=========================================================================================

/// Whether a user may pursue several goals at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GoalPolicy {
    /// Any number of active goals; each check-in names its goal.
    #[default]
    MultiGoal,
    /// At most one active goal per user; check-ins may omit the goal id.
    SingleActive,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub policy: GoalPolicy,
    /// Attempts per check-in before reporting `Busy`. Values below 1 count as 1.
    pub max_checkin_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: GoalPolicy::MultiGoal,
            max_checkin_retries: 3,
        }
    }
}

/// What a committed (or idempotently skipped) check-in produced.
#[derive(Debug, Clone)]
pub struct CheckinReceipt {
    pub goal: Goal,
    pub outcome: CheckinOutcome,
    pub points_earned: u64,
    pub milestone_bonus: u64,
    pub freeze_refilled: bool,
    pub rank_changed: Option<(GoalRank, GoalRank)>,
    pub history: Option<GoalHistory>,
}

pub struct StreakEngine {
    goals: Arc<dyn GoalStore>,
    history: Arc<dyn HistoryStore>,
    notifier: Arc<dyn CheckinNotifier>,
    config: EngineConfig,
}

impl StreakEngine {
    pub fn new(
        goals: Arc<dyn GoalStore>,
        history: Arc<dyn HistoryStore>,
        notifier: Arc<dyn CheckinNotifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            goals,
            history,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Goal Management ---

    pub async fn create_goal(&self, new_goal: NewGoal) -> EngineResult<Goal> {
        let title = validate_title(&new_goal.title)?;
        let target_days = validate_target_days(new_goal.target_days)?;

        let goal = Goal::new(
            new_goal.owner,
            title,
            target_days,
            new_goal.category_id,
            Utc::now(),
        );
        let saved = match self.config.policy {
            GoalPolicy::MultiGoal => self.goals.insert_goal(&goal).await?,
            GoalPolicy::SingleActive => self
                .goals
                .insert_sole_active_goal(&goal)
                .await?
                .ok_or_else(|| {
                    EngineError::Conflict(format!("User {} already has an active goal", goal.owner))
                })?,
        };
        info!(goal_id = %saved.id, owner = %saved.owner, target_days, "Goal created");
        Ok(saved)
    }

    pub async fn update_goal(
        &self,
        goal_id: Uuid,
        owner: &str,
        update: GoalUpdate,
    ) -> EngineResult<Goal> {
        let mut goal = self.load_active(goal_id, owner).await?;
        let expected_version = goal.version;

        if let Some(title) = update.title {
            goal.title = validate_title(&title)?;
        }
        if let Some(target_days) = update.target_days {
            let target_days = validate_target_days(target_days)?;
            // The streak only ever reaches the target by stepping onto it.
            if target_days <= goal.current_streak {
                return Err(EngineError::Validation(format!(
                    "Target days must exceed the current streak of {}",
                    goal.current_streak
                )));
            }
            goal.target_days = target_days;
        }
        if update.category_id.is_some() {
            goal.category_id = update.category_id;
        }

        match self.goals.update_goal(&goal, expected_version).await {
            Ok(saved) => {
                debug!(goal_id = %goal_id, "Goal updated");
                Ok(saved)
            }
            Err(PortError::VersionConflict { id }) => Err(EngineError::Busy { goal_id: id }),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the goal outright. No history is written.
    pub async fn delete_goal(&self, goal_id: Uuid, owner: &str) -> EngineResult<()> {
        if !self.goals.delete_goal(goal_id, owner).await? {
            return Err(EngineError::NotFound(format!("Goal {} not found", goal_id)));
        }
        info!(goal_id = %goal_id, owner, "Goal deleted");
        Ok(())
    }

    pub async fn get_goal(&self, goal_id: Uuid, owner: &str) -> EngineResult<Goal> {
        self.goals
            .get_goal(goal_id, owner)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Goal {} not found", goal_id)))
    }

    pub async fn active_goals(&self, owner: &str) -> EngineResult<Vec<Goal>> {
        Ok(self.goals.list_goals(owner, true).await?)
    }

    pub async fn completed_goals(&self, owner: &str) -> EngineResult<Vec<Goal>> {
        Ok(self.goals.list_goals(owner, false).await?)
    }

    // --- Check-ins ---

    /// Applies a check-in dated `today` to the owner's goal `goal_id`.
    pub async fn record_checkin(
        &self,
        goal_id: Uuid,
        owner: &str,
        today: NaiveDate,
    ) -> EngineResult<CheckinReceipt> {
        let attempts = self.config.max_checkin_retries.max(1);

        for attempt in 1..=attempts {
            let goal = self.load_active(goal_id, owner).await?;
            let transition = apply_checkin(&goal, today)?;

            if !transition.outcome.changed_state() {
                debug!(goal_id = %goal_id, owner, %today, "Already checked in today");
                return Ok(receipt(transition, None));
            }

            let history = transition
                .completed
                .then(|| GoalHistory::from_completed(&transition.goal, today));

            let committed = self
                .goals
                .commit_checkin(&transition.goal, goal.version, history.as_ref())
                .await;
            match committed {
                Ok(saved) => {
                    let mut transition = transition;
                    transition.goal = saved;
                    log_transition(&transition);
                    self.dispatch_notification(owner);
                    return Ok(receipt(transition, history));
                }
                Err(PortError::VersionConflict { .. }) => {
                    debug!(goal_id = %goal_id, attempt, "Concurrent check-in detected, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(goal_id = %goal_id, attempts, "Check-in abandoned after repeated conflicts");
        Err(EngineError::Busy { goal_id })
    }

    /// Check-in without a goal id. Only meaningful under `GoalPolicy::SingleActive`,
    /// where it targets the owner's one active goal.
    pub async fn record_checkin_for_owner(
        &self,
        owner: &str,
        today: NaiveDate,
    ) -> EngineResult<CheckinReceipt> {
        if self.config.policy != GoalPolicy::SingleActive {
            return Err(EngineError::Validation(
                "A goal id is required for check-ins".to_string(),
            ));
        }
        let goal = self
            .goals
            .list_goals(owner, true)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::NotFound(format!("No active goal for {}", owner)))?;
        self.record_checkin(goal.id, owner, today).await
    }

    // --- History and Dashboard ---

    pub async fn history(&self, owner: &str) -> EngineResult<Vec<GoalHistory>> {
        Ok(self.history.list_history(owner).await?)
    }

    pub async fn delete_history(&self, history_id: Uuid, owner: &str) -> EngineResult<()> {
        if !self.history.delete_history(history_id, owner).await? {
            return Err(EngineError::NotFound(format!(
                "History record {} not found",
                history_id
            )));
        }
        Ok(())
    }

    pub async fn dashboard(&self, owner: &str) -> EngineResult<DashboardSummary> {
        let active = self.active_goals(owner).await?;
        let completed = self.completed_goals(owner).await?;
        debug!(
            owner,
            active = active.len(),
            completed = completed.len(),
            "Building dashboard"
        );
        Ok(summarize(active, completed))
    }

    // --- Helpers ---

    async fn load_active(&self, goal_id: Uuid, owner: &str) -> EngineResult<Goal> {
        self.goals
            .get_goal(goal_id, owner)
            .await?
            .filter(|goal| goal.active)
            .ok_or_else(|| EngineError::NotFound(format!("Active goal {} not found", goal_id)))
    }

    /// Fire-and-forget. Failures are logged and never reach the caller.
    fn dispatch_notification(&self, owner: &str) {
        let notifier = Arc::clone(&self.notifier);
        let owner = owner.to_string();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&owner).await {
                warn!(owner = %owner, error = %e, "Check-in notification failed");
            }
        });
    }
}

fn receipt(transition: Transition, history: Option<GoalHistory>) -> CheckinReceipt {
    CheckinReceipt {
        goal: transition.goal,
        outcome: transition.outcome,
        points_earned: transition.points_earned,
        milestone_bonus: transition.milestone_bonus,
        freeze_refilled: transition.freeze_refilled,
        rank_changed: transition.rank_changed,
        history,
    }
}

fn log_transition(transition: &Transition) {
    let goal = &transition.goal;
    match transition.outcome {
        CheckinOutcome::FreezeUsed => info!(
            goal_id = %goal.id,
            owner = %goal.owner,
            remaining = goal.freeze_count,
            "Freeze used, streak saved"
        ),
        CheckinOutcome::Reset => {
            info!(goal_id = %goal.id, owner = %goal.owner, "No freezes left, streak reset")
        }
        _ => {}
    }
    if transition.milestone_bonus > 0 {
        info!(goal_id = %goal.id, streak = goal.current_streak, "Weekly milestone reached");
    }
    if let Some((from, to)) = transition.rank_changed {
        info!(goal_id = %goal.id, owner = %goal.owner, %from, %to, "Rank up");
    }
    if transition.freeze_refilled {
        info!(goal_id = %goal.id, freezes = goal.freeze_count, "Monthly freeze earned");
    }
    if transition.completed {
        info!(
            goal_id = %goal.id,
            owner = %goal.owner,
            rank = %goal.rank,
            "Goal completed"
        );
    }
    debug!(
        goal_id = %goal.id,
        streak = goal.current_streak,
        points = goal.total_points,
        earned = transition.points_earned + transition.milestone_bonus,
        "Check-in committed"
    );
}

fn validate_title(title: &str) -> EngineResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(EngineError::Validation("Title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

fn validate_target_days(target_days: i32) -> EngineResult<u32> {
    u32::try_from(target_days)
        .ok()
        .filter(|days| *days > 0)
        .ok_or_else(|| {
            EngineError::Validation(format!(
                "Target days must be positive, got {}",
                target_days
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::ports::{LogNotifier, PortResult};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i64::from(n) - 1)
    }

    fn fresh_goal(target_days: u32) -> Goal {
        Goal::new("alice", "Meditate", target_days, None, Utc::now())
    }

    struct RecordingNotifier {
        tx: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl CheckinNotifier for RecordingNotifier {
        async fn notify(&self, owner: &str) -> PortResult<()> {
            let _ = self.tx.send(owner.to_string());
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl CheckinNotifier for FailingNotifier {
        async fn notify(&self, _owner: &str) -> PortResult<()> {
            Err(PortError::Unexpected("webhook down".to_string()))
        }
    }

    fn engine_with(
        store: Arc<InMemoryStore>,
        notifier: Arc<dyn CheckinNotifier>,
        policy: GoalPolicy,
    ) -> StreakEngine {
        StreakEngine::new(
            store.clone(),
            store,
            notifier,
            EngineConfig {
                policy,
                ..EngineConfig::default()
            },
        )
    }

    fn engine(store: Arc<InMemoryStore>) -> StreakEngine {
        engine_with(store, Arc::new(LogNotifier), GoalPolicy::MultiGoal)
    }

    fn new_goal(owner: &str, target_days: i32) -> NewGoal {
        NewGoal {
            owner: owner.to_string(),
            title: "Meditate".to_string(),
            target_days,
            category_id: None,
        }
    }

    // --- apply_checkin ---

    #[test]
    fn scenario_three_days_then_a_bridged_gap() {
        let mut goal = fresh_goal(7);
        for n in 1..=3 {
            goal = apply_checkin(&goal, day(n)).unwrap().goal;
        }
        assert_eq!(goal.current_streak, 3);
        assert_eq!(goal.total_points, 15 + 20 + 25);

        let t = apply_checkin(&goal, day(5)).unwrap();
        assert_eq!(t.outcome, CheckinOutcome::FreezeUsed);
        assert_eq!(t.goal.current_streak, 4);
        assert_eq!(t.goal.freeze_count, 0);
    }

    #[test]
    fn second_gap_without_freeze_resets() {
        let mut goal = fresh_goal(100);
        goal = apply_checkin(&goal, day(1)).unwrap().goal;
        let t = apply_checkin(&goal, day(3)).unwrap();
        assert_eq!(t.outcome, CheckinOutcome::FreezeUsed);
        assert_eq!(t.goal.current_streak, 2);
        assert_eq!(t.goal.freeze_count, 0);

        let t = apply_checkin(&t.goal, day(5)).unwrap();
        assert_eq!(t.outcome, CheckinOutcome::Reset);
        assert_eq!(t.goal.current_streak, 1);
        assert_eq!(t.goal.longest_streak, 2);
    }

    #[test]
    fn same_day_is_idempotent() {
        let goal = apply_checkin(&fresh_goal(10), day(1)).unwrap().goal;
        let t = apply_checkin(&goal, day(1)).unwrap();
        assert_eq!(t.outcome, CheckinOutcome::AlreadyCheckedIn);
        assert_eq!(t.goal, goal);
        assert_eq!(t.points_earned, 0);
    }

    #[test]
    fn weekly_milestone_adds_bonus_in_same_transition() {
        let mut goal = fresh_goal(100);
        goal.current_streak = 6;
        goal.longest_streak = 6;
        goal.last_checkin_date = Some(day(6));
        goal.total_points = 200;

        let t = apply_checkin(&goal, day(7)).unwrap();
        assert_eq!(t.goal.current_streak, 7);
        assert_eq!(t.points_earned, 10 + 7 * 5);
        assert_eq!(t.milestone_bonus, 100);
        assert_eq!(t.goal.total_points, 200 + 45 + 100);
    }

    #[test]
    fn rank_is_evaluated_after_the_bonus() {
        let mut goal = fresh_goal(100);
        goal.current_streak = 6;
        goal.last_checkin_date = Some(day(6));
        goal.total_points = 0;

        // 45 base + 100 bonus crosses the Novice threshold.
        let t = apply_checkin(&goal, day(7)).unwrap();
        assert_eq!(t.goal.rank, GoalRank::Novice);
        assert_eq!(t.rank_changed, Some((GoalRank::Beginner, GoalRank::Novice)));
    }

    #[test]
    fn monthly_refill_stacks_with_a_consumed_freeze() {
        let mut goal = fresh_goal(100);
        goal.current_streak = 29;
        goal.longest_streak = 29;
        goal.freeze_count = 1;
        goal.last_checkin_date = Some(day(29));

        let t = apply_checkin(&goal, day(31)).unwrap();
        assert_eq!(t.outcome, CheckinOutcome::FreezeUsed);
        assert_eq!(t.goal.current_streak, 30);
        assert!(t.freeze_refilled);
        assert_eq!(t.goal.freeze_count, 1);
    }

    #[test]
    fn reaching_target_closes_goal() {
        let mut goal = fresh_goal(3);
        goal.current_streak = 2;
        goal.longest_streak = 2;
        goal.last_checkin_date = Some(day(2));

        let t = apply_checkin(&goal, day(3)).unwrap();
        assert!(t.completed);
        assert!(!t.goal.active);
        assert_eq!(t.goal.longest_streak, 3);

        let err = apply_checkin(&t.goal, day(4)).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn backdated_checkin_is_rejected() {
        let goal = apply_checkin(&fresh_goal(10), day(5)).unwrap().goal;
        let err = apply_checkin(&goal, day(4)).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn points_and_longest_streak_never_decrease() {
        let mut goal = fresh_goal(1000);
        goal.freeze_count = 0;
        let dates = [1, 2, 3, 6, 7, 7, 8, 12, 13, 14, 15, 16, 17, 18, 30, 31];
        let (mut points, mut longest) = (0, 0);
        for n in dates {
            goal = apply_checkin(&goal, day(n)).unwrap().goal;
            assert!(goal.total_points >= points);
            assert!(goal.longest_streak >= longest);
            assert!(goal.current_streak <= goal.longest_streak);
            points = goal.total_points;
            longest = goal.longest_streak;
        }
        assert_eq!(goal.checkin_dates.len(), dates.len() - 1);
    }

    // --- StreakEngine ---

    #[tokio::test]
    async fn completion_writes_exactly_one_history_entry() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        let mut goal = fresh_goal(3);
        goal.current_streak = 2;
        goal.longest_streak = 2;
        goal.last_checkin_date = Some(day(2));
        let goal = store.insert_goal(&goal).await.unwrap();

        let receipt = engine.record_checkin(goal.id, "alice", day(3)).await.unwrap();
        assert!(!receipt.goal.active);
        let history = receipt.history.expect("history entry");
        assert_eq!(history.final_streak, 3);
        assert_eq!(history.completed_date, day(3));
        assert_eq!(history.title, "Meditate [Beginner]");

        let err = engine.record_checkin(goal.id, "alice", day(4)).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert_eq!(engine.history("alice").await.unwrap().len(), 1);
        assert_eq!(engine.completed_goals("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repeated_checkin_on_same_day_changes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        let goal = engine.create_goal(new_goal("alice", 10)).await.unwrap();

        let first = engine.record_checkin(goal.id, "alice", day(1)).await.unwrap();
        let second = engine.record_checkin(goal.id, "alice", day(1)).await.unwrap();
        assert_eq!(second.outcome, CheckinOutcome::AlreadyCheckedIn);
        assert_eq!(first.goal, second.goal);
        assert_eq!(engine.get_goal(goal.id, "alice").await.unwrap(), first.goal);
    }

    #[tokio::test]
    async fn checkin_on_someone_elses_goal_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store);
        let goal = engine.create_goal(new_goal("alice", 10)).await.unwrap();

        let err = engine.record_checkin(goal.id, "mallory", day(1)).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        let err = engine.delete_goal(goal.id, "mallory").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_checkins_on_one_goal_award_points_once() {
        let store = Arc::new(InMemoryStore::new());
        let engine = Arc::new(engine(store));
        let goal = engine.create_goal(new_goal("alice", 10)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            let goal_id = goal.id;
            handles.push(tokio::spawn(async move {
                engine.record_checkin(goal_id, "alice", day(1)).await
            }));
        }

        let mut started = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(receipt) if receipt.outcome == CheckinOutcome::Started => started += 1,
                Ok(_) | Err(EngineError::Busy { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(started, 1);
        let stored = engine.get_goal(goal.id, "alice").await.unwrap();
        assert_eq!(stored.current_streak, 1);
        assert_eq!(stored.total_points, 15);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn create_goal_validates_input() {
        let engine = engine(Arc::new(InMemoryStore::new()));
        for target in [0, -3] {
            let err = engine.create_goal(new_goal("alice", target)).await.unwrap_err();
            assert!(matches!(err, EngineError::Validation(_)));
        }
        let mut blank = new_goal("alice", 5);
        blank.title = "   ".to_string();
        let err = engine.create_goal(blank).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn single_active_policy_rejects_second_goal_and_resolves_checkins() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine_with(
            store,
            Arc::new(LogNotifier),
            GoalPolicy::SingleActive,
        );
        let goal = engine.create_goal(new_goal("alice", 10)).await.unwrap();
        let err = engine.create_goal(new_goal("alice", 5)).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));

        let receipt = engine.record_checkin_for_owner("alice", day(1)).await.unwrap();
        assert_eq!(receipt.goal.id, goal.id);
        assert_eq!(receipt.outcome, CheckinOutcome::Started);

        // Other users are unaffected.
        assert!(engine.create_goal(new_goal("bob", 5)).await.is_ok());
    }

    /// Delegates to the in-memory store after a pause, like a remote round trip.
    struct SlowStore(Arc<InMemoryStore>);

    impl SlowStore {
        async fn pause() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[async_trait]
    impl GoalStore for SlowStore {
        async fn insert_goal(&self, goal: &Goal) -> PortResult<Goal> {
            Self::pause().await;
            self.0.insert_goal(goal).await
        }

        async fn insert_sole_active_goal(&self, goal: &Goal) -> PortResult<Option<Goal>> {
            Self::pause().await;
            self.0.insert_sole_active_goal(goal).await
        }

        async fn get_goal(&self, goal_id: Uuid, owner: &str) -> PortResult<Option<Goal>> {
            Self::pause().await;
            self.0.get_goal(goal_id, owner).await
        }

        async fn list_goals(&self, owner: &str, active: bool) -> PortResult<Vec<Goal>> {
            Self::pause().await;
            self.0.list_goals(owner, active).await
        }

        async fn update_goal(&self, goal: &Goal, expected_version: i64) -> PortResult<Goal> {
            Self::pause().await;
            self.0.update_goal(goal, expected_version).await
        }

        async fn commit_checkin(
            &self,
            goal: &Goal,
            expected_version: i64,
            history: Option<&GoalHistory>,
        ) -> PortResult<Goal> {
            Self::pause().await;
            self.0.commit_checkin(goal, expected_version, history).await
        }

        async fn delete_goal(&self, goal_id: Uuid, owner: &str) -> PortResult<bool> {
            Self::pause().await;
            self.0.delete_goal(goal_id, owner).await
        }
    }

    #[tokio::test]
    async fn concurrent_creates_leave_one_active_goal_under_single_policy() {
        let inner = Arc::new(InMemoryStore::new());
        let engine = Arc::new(StreakEngine::new(
            Arc::new(SlowStore(inner.clone())),
            inner.clone(),
            Arc::new(LogNotifier),
            EngineConfig {
                policy: GoalPolicy::SingleActive,
                ..EngineConfig::default()
            },
        ));

        let mut handles = Vec::new();
        for target in 1..=8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.create_goal(new_goal("alice", target)).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, EngineError::Conflict(_))),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(inner.list_goals("alice", true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn multi_goal_policy_requires_goal_id() {
        let engine = engine(Arc::new(InMemoryStore::new()));
        engine.create_goal(new_goal("alice", 10)).await.unwrap();
        engine.create_goal(new_goal("alice", 20)).await.unwrap();
        assert_eq!(engine.active_goals("alice").await.unwrap().len(), 2);

        let err = engine.record_checkin_for_owner("alice", day(1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn update_goal_edits_fields_and_rejects_bad_values() {
        let engine = engine(Arc::new(InMemoryStore::new()));
        let goal = engine.create_goal(new_goal("alice", 10)).await.unwrap();

        let updated = engine
            .update_goal(
                goal.id,
                "alice",
                GoalUpdate {
                    title: Some("Meditate 20 minutes".to_string()),
                    target_days: Some(21),
                    category_id: Some(4),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Meditate 20 minutes");
        assert_eq!(updated.target_days, 21);
        assert_eq!(updated.category_id, Some(4));

        let err = engine
            .update_goal(
                goal.id,
                "alice",
                GoalUpdate {
                    target_days: Some(0),
                    ..GoalUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_goal_keeps_history() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        let goal = engine.create_goal(new_goal("alice", 1)).await.unwrap();
        let receipt = engine.record_checkin(goal.id, "alice", day(1)).await.unwrap();
        let history = receipt.history.unwrap();

        engine.delete_goal(goal.id, "alice").await.unwrap();
        assert_eq!(engine.history("alice").await.unwrap(), vec![history.clone()]);

        let err = engine.delete_history(history.id, "bob").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        engine.delete_history(history.id, "alice").await.unwrap();
        assert!(engine.history("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn notifies_after_state_change_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = engine_with(
            Arc::new(InMemoryStore::new()),
            Arc::new(RecordingNotifier { tx }),
            GoalPolicy::MultiGoal,
        );
        let goal = engine.create_goal(new_goal("alice", 10)).await.unwrap();

        engine.record_checkin(goal.id, "alice", day(1)).await.unwrap();
        let owner = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(owner.as_deref(), Some("alice"));

        engine.record_checkin(goal.id, "alice", day(1)).await.unwrap();
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_checkin() {
        let engine = engine_with(
            Arc::new(InMemoryStore::new()),
            Arc::new(FailingNotifier),
            GoalPolicy::MultiGoal,
        );
        let goal = engine.create_goal(new_goal("alice", 10)).await.unwrap();
        let receipt = engine.record_checkin(goal.id, "alice", day(1)).await.unwrap();
        assert_eq!(receipt.goal.current_streak, 1);
    }
}
