//! services/api/src/adapters/notifier.rs
//!
//! This module contains the webhook adapter for check-in notifications.
//! It implements the `CheckinNotifier` port from the `core` crate by POSTing the
//! owner's username as a plain-text body to a configured URL, e.g. a message queue's
//! publish endpoint.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use streak_core::ports::{CheckinNotifier, PortError, PortResult};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    token: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: String, token: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;
        Ok(Self { client, url, token })
    }
}

//=========================================================================================
// `CheckinNotifier` Trait Implementation
//=========================================================================================

#[async_trait]
impl CheckinNotifier for WebhookNotifier {
    async fn notify(&self, owner: &str) -> PortResult<()> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain")
            .body(owner.to_string());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!(owner, url = %self.url, "Check-in notification delivered");
        Ok(())
    }
}
