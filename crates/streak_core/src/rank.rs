//! crates/streak_core/src/rank.rs
//!
//! The two rank vocabularies used by the application.
//!
//! `GoalRank` is stored on every goal and recomputed after each check-in.
//! `DashboardRank` is the coarser scale shown on a user's dashboard for the
//! XP summed over all of their goals. Both are fixed, ascending threshold tables.

use std::fmt;
use std::str::FromStr;

/// Per-goal rank tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GoalRank {
    #[default]
    Beginner,
    Novice,
    Consistent,
    Legendary,
}

/// Minimum points for each goal tier, highest first.
const GOAL_RANK_TABLE: [(u64, GoalRank); 4] = [
    (1000, GoalRank::Legendary),
    (500, GoalRank::Consistent),
    (100, GoalRank::Novice),
    (0, GoalRank::Beginner),
];

impl GoalRank {
    /// Looks up the tier earned by `total_points`.
    pub fn for_points(total_points: u64) -> Self {
        GOAL_RANK_TABLE
            .iter()
            .find(|(min, _)| total_points >= *min)
            .map(|(_, rank)| *rank)
            .unwrap_or_default()
    }

    pub fn label(&self) -> &'static str {
        match self {
            GoalRank::Beginner => "Beginner",
            GoalRank::Novice => "Novice",
            GoalRank::Consistent => "Consistent",
            GoalRank::Legendary => "Legendary",
        }
    }
}

impl fmt::Display for GoalRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a stored rank label is not one of the known tiers.
#[derive(Debug, thiserror::Error)]
#[error("Unknown rank label: {0}")]
pub struct UnknownRank(pub String);

impl FromStr for GoalRank {
    type Err = UnknownRank;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Beginner" => Ok(GoalRank::Beginner),
            "Novice" => Ok(GoalRank::Novice),
            "Consistent" => Ok(GoalRank::Consistent),
            "Legendary" => Ok(GoalRank::Legendary),
            other => Err(UnknownRank(other.to_string())),
        }
    }
}

/// Aggregate rank shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DashboardRank {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Legendary,
}

const DASHBOARD_RANK_TABLE: [(u64, DashboardRank); 5] = [
    (1000, DashboardRank::Legendary),
    (500, DashboardRank::Platinum),
    (100, DashboardRank::Gold),
    (50, DashboardRank::Silver),
    (0, DashboardRank::Bronze),
];

impl DashboardRank {
    pub fn for_points(total_xp: u64) -> Self {
        DASHBOARD_RANK_TABLE
            .iter()
            .find(|(min, _)| total_xp >= *min)
            .map(|(_, rank)| *rank)
            .unwrap_or(DashboardRank::Bronze)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DashboardRank::Bronze => "BRONZE",
            DashboardRank::Silver => "SILVER",
            DashboardRank::Gold => "GOLD",
            DashboardRank::Platinum => "PLATINUM",
            DashboardRank::Legendary => "LEGENDARY",
        }
    }
}

impl fmt::Display for DashboardRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// XP still needed to reach the next per-goal tier, or 0 once Legendary.
pub fn xp_to_next_rank(total_points: u64) -> u64 {
    GOAL_RANK_TABLE
        .iter()
        .rev()
        .find(|(min, _)| *min > total_points)
        .map(|(min, _)| min - total_points)
        .unwrap_or(0)
}
