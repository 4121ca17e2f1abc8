//! Outbound HTTP to the scanning services.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use super::Tool;

pub type InvokeResult<T> = Result<T, InvokeError>;

/// Failure of one tool invocation. Messages surface to users behind the
/// generic scan-failure text, so they stay terse.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// HTTP transport failed.
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },

    /// The output envelope did not parse.
    #[error("failed to parse scan response: {0}")]
    Parse(String),

    /// The call outlived its timeout budget.
    #[error("the scan timed out after {secs} seconds")]
    TimedOut { secs: u64 },
}

/// A fully-built call to one scanning service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub url: String,
    pub auth_header: String,
    pub virtual_host: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ScanEnvelope {
    #[serde(default)]
    output: Option<String>,
}

/// HTTP client for the scanning services. All tools live behind one base
/// URL and share the bearer token and virtual-host routing header.
#[derive(Debug, Clone)]
pub struct ToolClient {
    client: Client,
    base_url: String,
    auth_token: String,
    virtual_host: String,
    timeout: Duration,
}

impl ToolClient {
    pub fn new(base_url: &str, auth_token: &str, virtual_host: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
            virtual_host: virtual_host.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Build the invocation for `tool` with an already-encoded query string.
    pub fn invocation(&self, tool: Tool, query: &str) -> ToolInvocation {
        let url = if query.is_empty() {
            format!("{}/api/chat/plugins/{}", self.base_url, tool.id())
        } else {
            format!("{}/api/chat/plugins/{}?{}", self.base_url, tool.id(), query)
        };
        ToolInvocation {
            url,
            auth_header: self.auth_token.clone(),
            virtual_host: self.virtual_host.clone(),
            timeout: self.timeout,
        }
    }

    /// Execute the invocation and return the raw output text. Absent output
    /// maps to an empty string so callers treat it as "found nothing".
    pub async fn invoke(&self, invocation: &ToolInvocation) -> InvokeResult<String> {
        let call = async {
            let mut request = self
                .client
                .get(&invocation.url)
                .header("Authorization", &invocation.auth_header);
            if !invocation.virtual_host.is_empty() {
                request = request.header("Host", &invocation.virtual_host);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(InvokeError::Status {
                    status: status.as_u16(),
                });
            }

            let envelope: ScanEnvelope = response
                .json()
                .await
                .map_err(|err| InvokeError::Parse(err.to_string()))?;
            Ok(envelope.output.unwrap_or_default())
        };

        match tokio::time::timeout(invocation.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(InvokeError::TimedOut {
                secs: invocation.timeout.as_secs(),
            }),
        }
    }
}
