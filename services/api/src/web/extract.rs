//! services/api/src/web/extract.rs

use axum::extract::FromRequest;

use crate::error::ApiError;

/// `Json` whose rejections render as a 400 `MessageResponse` instead of axum's
/// plain-text 422.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
