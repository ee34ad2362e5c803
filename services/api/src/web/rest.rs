//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use std::sync::Arc;
use streak_core::{GoalUpdate, NewGoal};
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::extract::ApiJson;
use crate::web::protocol::{
    CheckinOutcomeDto, CheckinRequest, CheckinResponse, CreateGoalRequest, DashboardResponse,
    GoalResponse, HistoryResponse, MessageResponse, RankChange, UpdateGoalRequest,
};
use crate::web::state::{AppState, Identity};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_goal_handler,
        update_goal_handler,
        get_goal_handler,
        list_goals_handler,
        delete_goal_handler,
        checkin_handler,
        list_history_handler,
        delete_history_handler,
        dashboard_handler,
        health_handler,
    ),
    components(
        schemas(
            CreateGoalRequest,
            UpdateGoalRequest,
            CheckinRequest,
            GoalResponse,
            HistoryResponse,
            CheckinResponse,
            CheckinOutcomeDto,
            RankChange,
            DashboardResponse,
            MessageResponse,
        )
    ),
    tags(
        (name = "Streak API", description = "Goals, daily check-ins and progression.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Goal Handlers
//=========================================================================================

/// Create a goal for the calling user.
#[utoipa::path(
    post,
    path = "/goals",
    request_body = CreateGoalRequest,
    responses(
        (status = 201, description = "Goal created", body = GoalResponse),
        (status = 400, description = "Invalid title or target, or an active goal already exists", body = MessageResponse),
        (status = 401, description = "No identity supplied")
    ),
    params(("x-username" = String, Header, description = "Authenticated username."))
)]
pub async fn create_goal_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(Identity(owner)): Extension<Identity>,
    ApiJson(req): ApiJson<CreateGoalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let goal = app_state
        .engine
        .create_goal(NewGoal {
            owner,
            title: req.title,
            target_days: req.target_days,
            category_id: req.category_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(GoalResponse::from(goal))))
}

/// Edit the title, target or category of an active goal.
#[utoipa::path(
    put,
    path = "/goals/{id}",
    request_body = UpdateGoalRequest,
    responses(
        (status = 200, description = "Goal updated", body = GoalResponse),
        (status = 400, description = "Invalid value", body = MessageResponse),
        (status = 404, description = "No such active goal for this user", body = MessageResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Goal id."),
        ("x-username" = String, Header, description = "Authenticated username.")
    )
)]
pub async fn update_goal_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(Identity(owner)): Extension<Identity>,
    Path(goal_id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateGoalRequest>,
) -> Result<Json<GoalResponse>, ApiError> {
    let update = GoalUpdate {
        title: req.title,
        target_days: req.target_days,
        category_id: req.category_id,
    };
    let goal = app_state.engine.update_goal(goal_id, &owner, update).await?;
    Ok(Json(goal.into()))
}

#[utoipa::path(
    get,
    path = "/goals/{id}",
    responses(
        (status = 200, description = "The goal", body = GoalResponse),
        (status = 404, description = "No such goal for this user", body = MessageResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Goal id."),
        ("x-username" = String, Header, description = "Authenticated username.")
    )
)]
pub async fn get_goal_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(Identity(owner)): Extension<Identity>,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<GoalResponse>, ApiError> {
    let goal = app_state.engine.get_goal(goal_id, &owner).await?;
    Ok(Json(goal.into()))
}

/// List the caller's active goals, newest first.
#[utoipa::path(
    get,
    path = "/goals",
    responses((status = 200, description = "Active goals", body = Vec<GoalResponse>)),
    params(("x-username" = String, Header, description = "Authenticated username."))
)]
pub async fn list_goals_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(Identity(owner)): Extension<Identity>,
) -> Result<Json<Vec<GoalResponse>>, ApiError> {
    let goals = app_state.engine.active_goals(&owner).await?;
    Ok(Json(goals.into_iter().map(Into::into).collect()))
}

/// Delete a goal. Completed goals keep their history entries.
#[utoipa::path(
    delete,
    path = "/goals/{id}",
    responses(
        (status = 200, description = "Goal deleted", body = MessageResponse),
        (status = 404, description = "No such goal for this user", body = MessageResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Goal id."),
        ("x-username" = String, Header, description = "Authenticated username.")
    )
)]
pub async fn delete_goal_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(Identity(owner)): Extension<Identity>,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    app_state.engine.delete_goal(goal_id, &owner).await?;
    Ok(Json(MessageResponse {
        message: "Goal deleted successfully".to_string(),
    }))
}

//=========================================================================================
// Check-in Handler
//=========================================================================================

/// Record the daily check-in for a goal.
///
/// Repeating a check-in on the same day is accepted and changes nothing.
#[utoipa::path(
    post,
    path = "/checkins",
    request_body = CheckinRequest,
    responses(
        (status = 200, description = "Check-in applied", body = CheckinResponse),
        (status = 400, description = "Missing goal id or invalid date", body = MessageResponse),
        (status = 404, description = "Goal missing, not owned, or already completed", body = MessageResponse),
        (status = 409, description = "Goal is being modified concurrently", body = MessageResponse)
    ),
    params(("x-username" = String, Header, description = "Authenticated username."))
)]
pub async fn checkin_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(Identity(owner)): Extension<Identity>,
    ApiJson(req): ApiJson<CheckinRequest>,
) -> Result<Json<CheckinResponse>, ApiError> {
    let today = req.date.unwrap_or_else(|| Utc::now().date_naive());
    let engine = &app_state.engine;
    let receipt = match req.goal_id {
        Some(goal_id) => engine.record_checkin(goal_id, &owner, today).await?,
        None => engine.record_checkin_for_owner(&owner, today).await?,
    };
    if receipt.history.is_some() {
        info!(owner = %owner, goal_id = %receipt.goal.id, "Goal archived to history");
    }
    Ok(Json(receipt.into()))
}

//=========================================================================================
// History Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/history",
    responses((status = 200, description = "Completed goals, newest first", body = Vec<HistoryResponse>)),
    params(("x-username" = String, Header, description = "Authenticated username."))
)]
pub async fn list_history_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(Identity(owner)): Extension<Identity>,
) -> Result<Json<Vec<HistoryResponse>>, ApiError> {
    let history = app_state.engine.history(&owner).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    delete,
    path = "/history/{id}",
    responses(
        (status = 204, description = "History record deleted"),
        (status = 404, description = "No such record for this user", body = MessageResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "History record id."),
        ("x-username" = String, Header, description = "Authenticated username.")
    )
)]
pub async fn delete_history_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(Identity(owner)): Extension<Identity>,
    Path(history_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state.engine.delete_history(history_id, &owner).await?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Dashboard and Health
//=========================================================================================

/// Aggregate XP, streaks and rank over all of a user's goals.
#[utoipa::path(
    get,
    path = "/dashboard/{owner}",
    responses((status = 200, description = "Dashboard summary", body = DashboardResponse)),
    params(("owner" = String, Path, description = "Username."))
)]
pub async fn dashboard_handler(
    State(app_state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let summary = app_state.engine.dashboard(&owner).await?;
    Ok(Json(summary.into()))
}

#[utoipa::path(get, path = "/health", responses((status = 200, description = "Service is up")))]
pub async fn health_handler() -> &'static str {
    "OK"
}
