pub mod dashboard;
pub mod domain;
pub mod engine;
pub mod memory;
pub mod ports;
pub mod rank;

pub use dashboard::{summarize, DashboardSummary};
pub use domain::{Goal, GoalHistory, GoalUpdate, NewGoal};
pub use engine::{
    apply_checkin, CheckinOutcome, CheckinReceipt, EngineConfig, EngineError, EngineResult,
    GoalPolicy, StreakEngine, Transition,
};
pub use memory::InMemoryStore;
pub use ports::{CheckinNotifier, GoalStore, HistoryStore, LogNotifier, PortError, PortResult};
pub use rank::{xp_to_next_rank, DashboardRank, GoalRank};
