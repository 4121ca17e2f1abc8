//! HTTP client for the model provider.

use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use reqwest_eventsource::{Event, EventSource};

use super::error::{ProviderError, ProviderResult};
use super::types::{
    Completion, CompletionChunk, CompletionRequest, EmbeddingRequest, EmbeddingResponse,
    ErrorEnvelope,
};

/// Overall budget for buffered (non-streaming) provider calls.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);
/// Overall budget for embedding calls.
const EMBEDDING_TIMEOUT: Duration = Duration::from_secs(60);

/// Sentinel frame terminating a streaming completion.
const STREAM_DONE: &str = "[DONE]";

/// Client for an OpenAI-compatible provider API.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
}

impl ProviderClient {
    /// Create a new provider client.
    ///
    /// `chat_model` is the upstream model the assistant persona resolves to;
    /// `embedding_model` serves the embeddings endpoint.
    pub fn new(base_url: &str, api_key: &str, chat_model: &str, embedding_model: &str) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            chat_model: chat_model.to_string(),
            embedding_model: embedding_model.to_string(),
        }
    }

    /// The configured upstream chat model.
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    fn completion_builder(&self, request: &CompletionRequest<'_>) -> RequestBuilder {
        self.client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
    }

    /// Run a completion to a single buffered string. Multiple choices are
    /// joined with newlines.
    pub async fn complete(&self, request: &CompletionRequest<'_>) -> ProviderResult<String> {
        let request = CompletionRequest {
            stream: false,
            ..*request
        };
        let response = self
            .completion_builder(&request)
            .timeout(COMPLETION_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(status, response).await);
        }

        let completion: Completion = response
            .json()
            .await
            .map_err(|err| ProviderError::Parse(err.to_string()))?;
        let text = completion
            .choices
            .iter()
            .map(|choice| choice.message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(text)
    }

    /// Open a streaming completion.
    pub fn stream(&self, request: &CompletionRequest<'_>) -> ProviderResult<CompletionStream> {
        let request = CompletionRequest {
            stream: true,
            ..*request
        };
        let source = EventSource::new(self.completion_builder(&request))
            .map_err(|err| ProviderError::Stream(err.to_string()))?;
        Ok(CompletionStream {
            source,
            finished: false,
        })
    }

    /// Embed `input` with the configured embedding model.
    pub async fn embed(&self, input: &str) -> ProviderResult<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input,
        };
        let response = self
            .client
            .post(self.embeddings_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .timeout(EMBEDDING_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(status, response).await);
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Parse(err.to_string()))?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|record| record.embedding)
            .ok_or_else(|| ProviderError::Parse("embedding response contained no vectors".into()))
    }
}

/// Map a non-success provider response to an error, preferring the
/// structured envelope when one is present.
async fn error_from_response(status: StatusCode, response: Response) -> ProviderError {
    match response.json::<ErrorEnvelope>().await {
        Ok(ErrorEnvelope { error: Some(body) }) => ProviderError::Api {
            message: body.message,
            kind: body.kind,
            param: body.param,
            code: body.code.map(|value| value.to_string()),
        },
        _ => ProviderError::Status {
            status: status.as_u16(),
        },
    }
}

/// Incremental text deltas of one streaming completion.
///
/// `next_chunk` yields `Ok(None)` exactly once at the clean end of the
/// stream; frames without content are skipped, and a `finish_reason` or the
/// terminating sentinel closes the underlying connection.
pub struct CompletionStream {
    source: EventSource,
    finished: bool,
}

impl CompletionStream {
    /// The next decoded text delta.
    pub async fn next_chunk(&mut self) -> ProviderResult<Option<String>> {
        if self.finished {
            return Ok(None);
        }

        while let Some(event) = self.source.next().await {
            match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => {
                    if message.data == STREAM_DONE {
                        return Ok(self.finish());
                    }
                    let chunk: CompletionChunk = match serde_json::from_str(&message.data) {
                        Ok(chunk) => chunk,
                        Err(err) => {
                            self.finish();
                            return Err(ProviderError::Parse(err.to_string()));
                        }
                    };
                    let Some(choice) = chunk.choices.into_iter().next() else {
                        continue;
                    };
                    if choice.finish_reason.is_some() {
                        return Ok(self.finish());
                    }
                    match choice.delta.content {
                        Some(text) if !text.is_empty() => return Ok(Some(text)),
                        _ => continue,
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => return Ok(self.finish()),
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    self.finish();
                    return Err(error_from_response(status, response).await);
                }
                Err(err) => {
                    self.finish();
                    return Err(ProviderError::Stream(err.to_string()));
                }
            }
        }
        Ok(self.finish())
    }

    /// Buffer the remainder of the stream into one string.
    pub async fn collect_text(mut self) -> ProviderResult<String> {
        let mut text = String::new();
        while let Some(chunk) = self.next_chunk().await? {
            text.push_str(&chunk);
        }
        Ok(text)
    }

    fn finish(&mut self) -> Option<String> {
        self.finished = true;
        self.source.close();
        None
    }
}
