//! Client for the nearest-neighbor vector index.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type VectorResult<T> = Result<T, VectorError>;

/// Errors from the vector index.
#[derive(Debug, Error)]
pub enum VectorError {
    /// HTTP transport failed.
    #[error("vector query failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The index answered with a non-success status.
    #[error("vector index returned HTTP {status}")]
    Status { status: u16 },

    /// The response body did not match the expected shape.
    #[error("failed to parse vector response: {0}")]
    Parse(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    top_k: usize,
    vector: &'a [f32],
    include_metadata: bool,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<MatchMetadata>,
}

#[derive(Debug, Deserialize)]
struct MatchMetadata {
    #[serde(default)]
    text: String,
}

/// A scored snippet returned by the index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub score: f32,
    pub text: String,
}

/// Client for the vector index query endpoint.
#[derive(Debug, Clone)]
pub struct VectorClient {
    client: Client,
    endpoint: String,
    api_key: String,
    namespace: String,
    top_k: usize,
}

impl VectorClient {
    pub fn new(endpoint: &str, api_key: &str, namespace: &str, top_k: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            namespace: namespace.to_string(),
            top_k,
        }
    }

    /// Query the index for the nearest neighbors of `vector`.
    pub async fn query(&self, vector: &[f32]) -> VectorResult<Vec<VectorMatch>> {
        let body = QueryRequest {
            top_k: self.top_k,
            vector,
            include_metadata: true,
            namespace: &self.namespace,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VectorError::Status {
                status: status.as_u16(),
            });
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|err| VectorError::Parse(err.to_string()))?;
        Ok(parsed
            .matches
            .into_iter()
            .map(|entry| VectorMatch {
                score: entry.score,
                text: entry.metadata.map(|metadata| metadata.text).unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = VectorClient::new("https://index.example/query", "key", "main", 5);
        assert_eq!(client.endpoint, "https://index.example/query");
        assert_eq!(client.top_k, 5);
    }

    #[test]
    fn test_query_request_uses_camel_case_keys() {
        let vector = [0.1_f32, 0.2];
        let body = QueryRequest {
            top_k: 5,
            vector: &vector,
            include_metadata: true,
            namespace: "main",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("topK").is_some());
        assert!(json.get("includeMetadata").is_some());
        assert_eq!(json["namespace"], "main");
    }
}
