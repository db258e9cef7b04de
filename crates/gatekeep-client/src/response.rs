//! Status checking for raw `reqwest` responses.
//!
//! A non-success status is returned as an error, not logged. The health probe
//! records it as an unhealthy state; controller sections log it as an error.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Response;

use crate::error::ClientError;

/// Success checking that keeps the body of a failed response.
#[async_trait]
pub trait ResponseExt: Sized {
    /// Returns the response unchanged on 2xx.
    ///
    /// Otherwise reads the body and fails with [`ClientError::RequestFailed`].
    /// The message is the body when it is not blank, else the canonical
    /// reason phrase of the status.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RequestFailed`] for any non-success status.
    async fn ensure_success(self) -> Result<Self, ClientError>;
}

#[async_trait]
impl ResponseExt for Response {
    async fn ensure_success(self) -> Result<Self, ClientError> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }

        let url = self.url().to_string();
        let body = self.text().await.unwrap_or_else(|e| {
            warn!("Failed to read error response body: {e}");
            String::new()
        });

        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string()
        } else {
            body
        };

        debug!("{url} answered {}", status.as_u16());

        Err(ClientError::RequestFailed { status, message })
    }
}
