//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `GoalStore` and `HistoryStore` ports from the `core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use streak_core::domain::{Goal, GoalHistory};
use streak_core::ports::{GoalStore, HistoryStore, PortError, PortResult};
use streak_core::rank::GoalRank;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const GOAL_COLUMNS: &str = "id, owner, title, target_days, current_streak, longest_streak, \
     last_checkin_date, freeze_count, total_points, rank_label, active, checkin_dates, \
     category_id, created_at, version";

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

/// Counters are nullable in the schema; a NULL reads as zero.
#[derive(FromRow)]
struct GoalRecord {
    id: Uuid,
    owner: String,
    title: String,
    target_days: i32,
    current_streak: Option<i32>,
    longest_streak: Option<i32>,
    last_checkin_date: Option<NaiveDate>,
    freeze_count: Option<i32>,
    total_points: Option<i64>,
    rank_label: Option<String>,
    active: bool,
    checkin_dates: Vec<NaiveDate>,
    category_id: Option<i64>,
    created_at: DateTime<Utc>,
    version: i64,
}

fn count(value: Option<i32>) -> u32 {
    u32::try_from(value.unwrap_or(0)).unwrap_or(0)
}

impl GoalRecord {
    fn to_domain(self) -> Goal {
        let total_points = u64::try_from(self.total_points.unwrap_or(0)).unwrap_or(0);
        // Legacy rows may carry a label outside the tier set; derive it from points.
        let rank = self
            .rank_label
            .as_deref()
            .and_then(|label| label.parse::<GoalRank>().ok())
            .unwrap_or_else(|| GoalRank::for_points(total_points));
        Goal {
            id: self.id,
            owner: self.owner,
            title: self.title,
            target_days: count(Some(self.target_days)),
            current_streak: count(self.current_streak),
            longest_streak: count(self.longest_streak),
            last_checkin_date: self.last_checkin_date,
            freeze_count: count(self.freeze_count),
            total_points,
            rank,
            active: self.active,
            checkin_dates: self.checkin_dates.into_iter().collect(),
            category_id: self.category_id,
            created_at: self.created_at,
            version: self.version,
        }
    }
}

/// Column values for writing a goal back.
struct GoalParams {
    target_days: i32,
    current_streak: i32,
    longest_streak: i32,
    freeze_count: i32,
    total_points: i64,
    checkin_dates: Vec<NaiveDate>,
}

impl GoalParams {
    fn from_domain(goal: &Goal) -> PortResult<Self> {
        let int = |value: u32, column: &str| {
            i32::try_from(value)
                .map_err(|_| PortError::Unexpected(format!("{} out of range: {}", column, value)))
        };
        Ok(Self {
            target_days: int(goal.target_days, "target_days")?,
            current_streak: int(goal.current_streak, "current_streak")?,
            longest_streak: int(goal.longest_streak, "longest_streak")?,
            freeze_count: int(goal.freeze_count, "freeze_count")?,
            total_points: i64::try_from(goal.total_points).map_err(|_| {
                PortError::Unexpected(format!("total_points out of range: {}", goal.total_points))
            })?,
            checkin_dates: goal.checkin_dates.iter().copied().collect(),
        })
    }
}

#[derive(FromRow)]
struct HistoryRecord {
    id: Uuid,
    owner: String,
    title: String,
    final_streak: i32,
    completed_date: NaiveDate,
}

impl HistoryRecord {
    fn to_domain(self) -> GoalHistory {
        GoalHistory {
            id: self.id,
            owner: self.owner,
            title: self.title,
            final_streak: count(Some(self.final_streak)),
            completed_date: self.completed_date,
        }
    }
}

async fn insert_record<'e, E>(executor: E, goal: &Goal) -> PortResult<Goal>
where
    E: PgExecutor<'e>,
{
    let params = GoalParams::from_domain(goal)?;
    let sql = format!(
        "INSERT INTO goals ({GOAL_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         RETURNING {GOAL_COLUMNS}"
    );
    let record = sqlx::query_as::<_, GoalRecord>(&sql)
        .bind(goal.id)
        .bind(&goal.owner)
        .bind(&goal.title)
        .bind(params.target_days)
        .bind(params.current_streak)
        .bind(params.longest_streak)
        .bind(goal.last_checkin_date)
        .bind(params.freeze_count)
        .bind(params.total_points)
        .bind(goal.rank.label())
        .bind(goal.active)
        .bind(&params.checkin_dates)
        .bind(goal.category_id)
        .bind(goal.created_at)
        .bind(goal.version)
        .fetch_one(executor)
        .await
        .map_err(unexpected)?;
    Ok(record.to_domain())
}

//=========================================================================================
// `GoalStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl GoalStore for DbAdapter {
    async fn insert_goal(&self, goal: &Goal) -> PortResult<Goal> {
        insert_record(&self.pool, goal).await
    }

    async fn insert_sole_active_goal(&self, goal: &Goal) -> PortResult<Option<Goal>> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Serializes concurrent creates for one owner until the transaction ends.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&goal.owner)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let (taken,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM goals WHERE owner = $1 AND active)")
                .bind(&goal.owner)
                .fetch_one(&mut *tx)
                .await
                .map_err(unexpected)?;
        if taken {
            return Ok(None);
        }

        let saved = insert_record(&mut *tx, goal).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(Some(saved))
    }

    async fn get_goal(&self, goal_id: Uuid, owner: &str) -> PortResult<Option<Goal>> {
        let sql = format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = $1 AND owner = $2");
        let record = sqlx::query_as::<_, GoalRecord>(&sql)
            .bind(goal_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(GoalRecord::to_domain))
    }

    async fn list_goals(&self, owner: &str, active: bool) -> PortResult<Vec<Goal>> {
        let sql = format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE owner = $1 AND active = $2 \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, GoalRecord>(&sql)
            .bind(owner)
            .bind(active)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(GoalRecord::to_domain).collect())
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
        let params = GoalParams::from_domain(goal)?;
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let sql = format!(
            "UPDATE goals SET title = $3, target_days = $4, current_streak = $5, \
             longest_streak = $6, last_checkin_date = $7, freeze_count = $8, \
             total_points = $9, rank_label = $10, active = $11, checkin_dates = $12, \
             category_id = $13, version = version + 1 \
             WHERE id = $1 AND owner = $2 AND version = $14 \
             RETURNING {GOAL_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, GoalRecord>(&sql)
            .bind(goal.id)
            .bind(&goal.owner)
            .bind(&goal.title)
            .bind(params.target_days)
            .bind(params.current_streak)
            .bind(params.longest_streak)
            .bind(goal.last_checkin_date)
            .bind(params.freeze_count)
            .bind(params.total_points)
            .bind(goal.rank.label())
            .bind(goal.active)
            .bind(&params.checkin_dates)
            .bind(goal.category_id)
            .bind(expected_version)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?;

        let Some(record) = updated else {
            // Dropping `tx` rolls back. Tell a stale version apart from a missing row.
            let (exists,): (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM goals WHERE id = $1 AND owner = $2)")
                    .bind(goal.id)
                    .bind(&goal.owner)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(unexpected)?;
            return Err(if exists {
                PortError::VersionConflict { id: goal.id }
            } else {
                PortError::NotFound(format!("Goal {} not found", goal.id))
            });
        };

        if let Some(history) = history {
            let final_streak = i32::try_from(history.final_streak).map_err(|_| {
                PortError::Unexpected(format!("final_streak out of range: {}", history.final_streak))
            })?;
            sqlx::query(
                "INSERT INTO goal_history (id, owner, title, final_streak, completed_date) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(history.id)
            .bind(&history.owner)
            .bind(&history.title)
            .bind(final_streak)
            .bind(history.completed_date)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_goal(&self, goal_id: Uuid, owner: &str) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1 AND owner = $2")
            .bind(goal_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }
}

//=========================================================================================
// `HistoryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl HistoryStore for DbAdapter {
    async fn list_history(&self, owner: &str) -> PortResult<Vec<GoalHistory>> {
        let records = sqlx::query_as::<_, HistoryRecord>(
            "SELECT id, owner, title, final_streak, completed_date FROM goal_history \
             WHERE owner = $1 ORDER BY completed_date DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(HistoryRecord::to_domain).collect())
    }

    async fn delete_history(&self, history_id: Uuid, owner: &str) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM goal_history WHERE id = $1 AND owner = $2")
            .bind(history_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }
}
