pub mod extract;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

pub use middleware::require_identity;
pub use rest::ApiDoc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::web::rest::{
    checkin_handler, create_goal_handler, dashboard_handler, delete_goal_handler,
    delete_history_handler, get_goal_handler, health_handler, list_goals_handler,
    list_history_handler, update_goal_handler,
};
use crate::web::state::AppState;

/// Builds the API router. CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no identity required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/dashboard/{owner}", get(dashboard_handler));

    // Protected routes (identity required)
    let protected_routes = Router::new()
        .route("/goals", post(create_goal_handler).get(list_goals_handler))
        .route(
            "/goals/{id}",
            get(get_goal_handler)
                .put(update_goal_handler)
                .delete(delete_goal_handler),
        )
        .route("/checkins", post(checkin_handler))
        .route("/history", get(list_history_handler))
        .route("/history/{id}", delete(delete_history_handler))
        .layer(axum_middleware::from_fn(require_identity));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
