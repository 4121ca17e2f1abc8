//! Clients for the external account-status service.
//!
//! Both checks are opaque relays: on rejection the collaborator's body and
//! status code are passed through to the frontend verbatim, so limit and
//! upgrade messaging lives entirely in that service.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::json;
use thiserror::Error;

pub type StatusResult<T> = Result<T, StatusError>;

/// Transport-level failure talking to the status service.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status check failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Verdict of the per-user status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserStatus {
    Ok,
    /// Relay this body and status code to the client unchanged.
    Rejected { status: StatusCode, body: String },
}

/// Verdict of the per-tool rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitVerdict {
    Allowed,
    /// Relay this body and status code to the client unchanged.
    Limited { status: StatusCode, body: String },
}

/// Client for the status-check endpoints.
#[derive(Debug, Clone)]
pub struct StatusClient {
    client: Client,
    user_status_url: String,
    rate_limit_url: String,
}

impl StatusClient {
    pub fn new(user_status_url: &str, rate_limit_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            user_status_url: user_status_url.to_string(),
            rate_limit_url: rate_limit_url.to_string(),
        }
    }

    /// Ask whether the caller may use `model`. The caller's Authorization
    /// header is forwarded when present.
    pub async fn check_user(&self, auth: Option<&str>, model: &str) -> StatusResult<UserStatus> {
        let mut request = self
            .client
            .post(&self.user_status_url)
            .json(&json!({ "model": model }));
        if let Some(auth) = auth {
            request = request.header("Authorization", auth);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(UserStatus::Ok);
        }
        let body = response.text().await.unwrap_or_default();
        Ok(UserStatus::Rejected { status, body })
    }

    /// Ask whether `tool_id` is rate limited for the caller.
    pub async fn check_tool_rate_limit(
        &self,
        auth: Option<&str>,
        tool_id: &str,
    ) -> StatusResult<RateLimitVerdict> {
        let mut request = self
            .client
            .post(&self.rate_limit_url)
            .json(&json!({ "toolId": tool_id }));
        if let Some(auth) = auth {
            request = request.header("Authorization", auth);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(RateLimitVerdict::Allowed);
        }
        let body = response.text().await.unwrap_or_default();
        Ok(RateLimitVerdict::Limited { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = StatusClient::new(
            "https://account.example/api/status",
            "https://account.example/api/rate-limit",
        );
        assert_eq!(client.user_status_url, "https://account.example/api/status");
        assert_eq!(
            client.rate_limit_url,
            "https://account.example/api/rate-limit"
        );
    }
}
