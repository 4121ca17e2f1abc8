//! Wire types for the provider's completions and embeddings endpoints.

use serde::{Deserialize, Serialize};

use crate::chat::Message;

/// `POST {base}/chat/completions` request body.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub max_tokens: u32,
    pub n: u32,
    pub stream: bool,
    pub temperature: f32,
}

/// Non-streaming completion response.
#[derive(Debug, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: String,
}

/// One decoded frame of a streaming completion.
#[derive(Debug, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// Error envelope the provider returns on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    /// String or number depending on the provider.
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

/// `POST {base}/embeddings` request body.
#[derive(Debug, Serialize)]
pub struct EmbeddingRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub data: Vec<EmbeddingRecord>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingRecord {
    pub embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_serializes_all_fields() {
        let messages = [Message::user("hello")];
        let request = CompletionRequest {
            model: "gpt-4",
            messages: &messages,
            max_tokens: 1000,
            n: 1,
            stream: true,
            temperature: 0.4,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["n"], 1);
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_chunk_without_content_decodes() {
        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{},"finish_reason":null}]}"#).unwrap();
        assert!(chunk.choices[0].delta.content.is_none());
        assert!(chunk.choices[0].finish_reason.is_none());
    }

    #[test]
    fn test_error_envelope_decodes_numeric_code() {
        let envelope: ErrorEnvelope = serde_json::from_str(
            r#"{"error":{"message":"quota exceeded","type":"billing","code":429}}"#,
        )
        .unwrap();
        let body = envelope.error.unwrap();
        assert_eq!(body.message, "quota exceeded");
        assert_eq!(body.kind.as_deref(), Some("billing"));
        assert_eq!(body.code, Some(serde_json::json!(429)));
    }
}
