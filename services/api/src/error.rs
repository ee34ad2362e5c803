//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as an HTTP response.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use streak_core::EngineError;
use tracing::error;

use crate::config::ConfigError;
use crate::web::protocol::MessageResponse;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the streak engine.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// A request body that could not be read as the expected JSON shape.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(EngineError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Engine(EngineError::Validation(_))
            | ApiError::Engine(EngineError::Conflict(_))
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(EngineError::Busy { .. }) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Engine(EngineError::NotFound(what)) => what.clone(),
            ApiError::Engine(EngineError::Validation(why))
            | ApiError::Engine(EngineError::Conflict(why))
            | ApiError::BadRequest(why) => why.clone(),
            ApiError::Engine(busy @ EngineError::Busy { .. }) => busy.to_string(),
            other => {
                error!("Request failed: {:?}", other);
                "Internal server error".to_string()
            }
        };
        (status, Json(MessageResponse { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn engine_errors_map_to_status_codes() {
        let cases = [
            (EngineError::NotFound("goal".into()), StatusCode::NOT_FOUND),
            (EngineError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (EngineError::Conflict("dup".into()), StatusCode::BAD_REQUEST),
            (EngineError::Busy { goal_id: Uuid::nil() }, StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
        assert_eq!(
            ApiError::BadRequest("missing field `title`".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
