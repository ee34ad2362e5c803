//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;
use streak_core::StreakEngine;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<StreakEngine>,
}

/// The authenticated username, placed in request extensions by `require_identity`.
#[derive(Clone, Debug)]
pub struct Identity(pub String);
