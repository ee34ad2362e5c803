//! crates/streak_core/src/dashboard.rs
//!
//! Read-only summary of a user's goals for the dashboard view.

use crate::domain::Goal;
use crate::rank::{xp_to_next_rank, DashboardRank, GoalRank};

pub const EMPTY_DASHBOARD_MESSAGE: &str = "Time to start a new journey!";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub active_goals: Vec<Goal>,
    pub completed_goals: Vec<Goal>,
    pub has_active_goal: bool,
    pub goal_count: usize,
    pub completed_goal_count: usize,
    /// Points summed over active and completed goals.
    pub total_xp: u64,
    pub xp_to_next_rank: u64,
    pub rank: DashboardRank,
    /// Best current streak among active goals.
    pub current_streak: u32,
    /// Best longest streak among all goals.
    pub longest_streak: u32,
    /// Highest per-goal rank held by an active goal.
    pub highest_goal_rank: GoalRank,
    pub message: Option<String>,
}

/// Folds the active and completed goal sets into a dashboard summary.
pub fn summarize(active_goals: Vec<Goal>, completed_goals: Vec<Goal>) -> DashboardSummary {
    let total_xp = active_goals
        .iter()
        .chain(&completed_goals)
        .fold(0u64, |sum, goal| sum.saturating_add(goal.total_points));

    let current_streak = active_goals
        .iter()
        .map(|goal| goal.current_streak)
        .max()
        .unwrap_or(0);

    let longest_streak = active_goals
        .iter()
        .chain(&completed_goals)
        .map(|goal| goal.longest_streak)
        .max()
        .unwrap_or(0);

    let highest_goal_rank = active_goals
        .iter()
        .map(|goal| goal.rank)
        .max()
        .unwrap_or_default();

    let message = (active_goals.is_empty() && completed_goals.is_empty())
        .then(|| EMPTY_DASHBOARD_MESSAGE.to_string());

    DashboardSummary {
        has_active_goal: !active_goals.is_empty(),
        goal_count: active_goals.len(),
        completed_goal_count: completed_goals.len(),
        total_xp,
        xp_to_next_rank: xp_to_next_rank(total_xp),
        rank: DashboardRank::for_points(total_xp),
        current_streak,
        longest_streak,
        highest_goal_rank,
        message,
        active_goals,
        completed_goals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn goal(points: u64, current: u32, longest: u32, active: bool) -> Goal {
        let mut goal = Goal::new("alice", "Stretch", 30, None, Utc::now());
        goal.total_points = points;
        goal.current_streak = current;
        goal.longest_streak = longest;
        goal.rank = GoalRank::for_points(points);
        goal.active = active;
        goal
    }

    #[test]
    fn one_active_and_one_completed_goal() {
        let summary = summarize(vec![goal(80, 4, 6, true)], vec![goal(120, 9, 9, false)]);
        assert_eq!(summary.total_xp, 200);
        assert_eq!(summary.rank, DashboardRank::Gold);
        assert_eq!(summary.xp_to_next_rank, 300);
        assert_eq!(summary.current_streak, 4);
        assert_eq!(summary.longest_streak, 9);
        assert_eq!(summary.goal_count, 1);
        assert_eq!(summary.completed_goal_count, 1);
        assert!(summary.has_active_goal);
        assert_eq!(summary.highest_goal_rank, GoalRank::Beginner);
        assert!(summary.message.is_none());
    }

    #[test]
    fn completed_goals_do_not_count_towards_current_streak() {
        let summary = summarize(vec![], vec![goal(600, 30, 30, false)]);
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.longest_streak, 30);
        assert_eq!(summary.rank, DashboardRank::Platinum);
        assert!(!summary.has_active_goal);
    }

    #[test]
    fn empty_dashboard_has_a_message() {
        let summary = summarize(vec![], vec![]);
        assert_eq!(summary.total_xp, 0);
        assert_eq!(summary.rank, DashboardRank::Bronze);
        assert_eq!(summary.xp_to_next_rank, 100);
        assert_eq!(summary.message.as_deref(), Some(EMPTY_DASHBOARD_MESSAGE));
    }

    #[test]
    fn highest_goal_rank_across_active_goals() {
        let summary = summarize(
            vec![goal(20, 1, 1, true), goal(700, 12, 12, true), goal(150, 3, 5, true)],
            vec![],
        );
        assert_eq!(summary.highest_goal_rank, GoalRank::Consistent);
        assert_eq!(summary.current_streak, 12);
        assert_eq!(summary.total_xp, 870);
    }
}
