//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between HTTP clients and the API server.
//! Field names are camelCase on the wire.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use streak_core::{CheckinOutcome, CheckinReceipt, DashboardSummary, Goal, GoalHistory};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Requests
//=========================================================================================

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalRequest {
    pub title: String,
    pub target_days: i32,
    pub category_id: Option<i64>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalRequest {
    pub title: Option<String>,
    pub target_days: Option<i32>,
    pub category_id: Option<i64>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    /// May be omitted only when the server runs the single-active-goal policy.
    pub goal_id: Option<Uuid>,
    /// Calendar date of the check-in; defaults to today (UTC).
    pub date: Option<NaiveDate>,
}

//=========================================================================================
// Responses
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoalResponse {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub target_days: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_checkin_date: Option<NaiveDate>,
    pub freeze_count: u32,
    pub total_points: u64,
    pub rank_label: String,
    pub active: bool,
    pub checkin_dates: Vec<NaiveDate>,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completion_percentage: f64,
    /// Check-ins during the last seven days, today included.
    pub recent_checkins: usize,
}

impl From<Goal> for GoalResponse {
    fn from(goal: Goal) -> Self {
        let completion_percentage = goal.completion_percentage();
        let recent_checkins = goal.recent_activity(Utc::now().date_naive());
        Self {
            id: goal.id,
            owner: goal.owner,
            title: goal.title,
            target_days: goal.target_days,
            current_streak: goal.current_streak,
            longest_streak: goal.longest_streak,
            last_checkin_date: goal.last_checkin_date,
            freeze_count: goal.freeze_count,
            total_points: goal.total_points,
            rank_label: goal.rank.to_string(),
            active: goal.active,
            checkin_dates: goal.checkin_dates.into_iter().collect(),
            category_id: goal.category_id,
            created_at: goal.created_at,
            completion_percentage,
            recent_checkins,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub final_streak: u32,
    pub completed_date: NaiveDate,
}

impl From<GoalHistory> for HistoryResponse {
    fn from(history: GoalHistory) -> Self {
        Self {
            id: history.id,
            owner: history.owner,
            title: history.title,
            final_streak: history.final_streak,
            completed_date: history.completed_date,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckinOutcomeDto {
    AlreadyCheckedIn,
    Started,
    Continued,
    FreezeUsed,
    Reset,
}

impl From<CheckinOutcome> for CheckinOutcomeDto {
    fn from(outcome: CheckinOutcome) -> Self {
        match outcome {
            CheckinOutcome::AlreadyCheckedIn => CheckinOutcomeDto::AlreadyCheckedIn,
            CheckinOutcome::Started => CheckinOutcomeDto::Started,
            CheckinOutcome::Continued => CheckinOutcomeDto::Continued,
            CheckinOutcome::FreezeUsed => CheckinOutcomeDto::FreezeUsed,
            CheckinOutcome::Reset => CheckinOutcomeDto::Reset,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct RankChange {
    pub from: String,
    pub to: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResponse {
    pub goal: GoalResponse,
    pub outcome: CheckinOutcomeDto,
    pub points_earned: u64,
    pub milestone_bonus: u64,
    pub freeze_refilled: bool,
    pub rank_changed: Option<RankChange>,
    pub completed: bool,
    pub history: Option<HistoryResponse>,
}

impl From<CheckinReceipt> for CheckinResponse {
    fn from(receipt: CheckinReceipt) -> Self {
        Self {
            completed: receipt.history.is_some(),
            goal: receipt.goal.into(),
            outcome: receipt.outcome.into(),
            points_earned: receipt.points_earned,
            milestone_bonus: receipt.milestone_bonus,
            freeze_refilled: receipt.freeze_refilled,
            rank_changed: receipt.rank_changed.map(|(from, to)| RankChange {
                from: from.to_string(),
                to: to.to_string(),
            }),
            history: receipt.history.map(HistoryResponse::from),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub active_goals: Vec<GoalResponse>,
    pub completed_goals: Vec<GoalResponse>,
    pub has_active_goal: bool,
    pub goal_count: usize,
    pub completed_goal_count: usize,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    #[serde(rename = "xpToNextRank")]
    pub xp_to_next_rank: u64,
    pub rank: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub highest_goal_rank: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<DashboardSummary> for DashboardResponse {
    fn from(summary: DashboardSummary) -> Self {
        Self {
            active_goals: summary.active_goals.into_iter().map(Into::into).collect(),
            completed_goals: summary.completed_goals.into_iter().map(Into::into).collect(),
            has_active_goal: summary.has_active_goal,
            goal_count: summary.goal_count,
            completed_goal_count: summary.completed_goal_count,
            total_xp: summary.total_xp,
            xp_to_next_rank: summary.xp_to_next_rank,
            rank: summary.rank.to_string(),
            current_streak: summary.current_streak,
            longest_streak: summary.longest_streak,
            highest_goal_rank: summary.highest_goal_rank.to_string(),
            message: summary.message,
        }
    }
}
