//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::debug;

use crate::web::state::Identity;

/// Header carrying the username established by the upstream identity provider.
pub const IDENTITY_HEADER: &str = "x-username";

/// Middleware that extracts the caller's username.
///
/// If present, inserts an `Identity` into request extensions for handlers to use.
/// If missing or blank, returns 401 Unauthorized.
pub async fn require_identity(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    // 1. Extract the identity header
    let username = req
        .headers()
        .get(IDENTITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            debug!("Request rejected: no {} header", IDENTITY_HEADER);
            StatusCode::UNAUTHORIZED
        })?
        .to_string();

    // 2. Insert identity into request extensions
    req.extensions_mut().insert(Identity(username));

    // 3. Continue to the handler
    Ok(next.run(req).await)
}
