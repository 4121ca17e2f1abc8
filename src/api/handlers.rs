//! API request handlers.

use std::convert::Infallible;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::{error, info, warn};

use crate::chat::sanitize::sanitize;
use crate::chat::{ChatRequest, Message, ModelKind, ModelSpec, Role, lookup_model, select_messages};
use crate::plugins::{self, Prepared, ScanStream, Tool, synthesize};
use crate::provider::{CompletionRequest, CompletionStream};
use crate::retrieval;
use crate::status::{RateLimitVerdict, UserStatus};

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Default completion budget when the request does not set one.
const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Shown when a tool command arrives on a non-pro model.
const PRO_ONLY_MESSAGE: &str = "You can access this feature only with GPT-4.";

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// One tool in the catalog listing.
#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub github_url: &'static str,
    pub enabled: bool,
}

/// List the tool catalog with per-tool enablement.
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolInfo>> {
    let tools = plugins::TOOLS
        .iter()
        .map(|tool| ToolInfo {
            id: tool.id(),
            name: tool.guide_label(),
            description: tool.description(),
            github_url: tool.repo_url(),
            enabled: state.tool_enabled(*tool),
        })
        .collect();
    Json(tools)
}

/// Chat endpoint. Routes a conversation to the LLM provider, or to a
/// scanning tool when the last message invokes one.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Response> {
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("Error: No messages provided"));
    }
    let Some(model) = lookup_model(&request.model) else {
        return Err(ApiError::bad_request("Error: Model not found"));
    };

    let max_tokens = request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
    let stream = request.stream.unwrap_or(true);
    let temperature = request
        .temperature
        .unwrap_or(state.chat.default_temperature);

    // Trim history to the model's budget before anything is sent upstream.
    let selection = match select_messages(&request.messages, model, &state.chat.system_prompt) {
        Ok(selection) => selection,
        Err(err) => return Ok(text_response(StatusCode::OK, err.to_string())),
    };

    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if let Some(status) = &state.status {
        match status.check_user(auth, &request.model).await {
            Ok(UserStatus::Ok) => {}
            Ok(UserStatus::Rejected { status, body }) => {
                return Err(ApiError::upstream(status, body));
            }
            Err(err) => {
                error!(%err, "user status check failed");
                return Err(ApiError::internal("Error checking user status"));
            }
        }
    }

    let last_content = request
        .messages
        .last()
        .map(|message| message.content.as_str())
        .unwrap_or_default();

    if plugins::is_tools_command(last_content) {
        return Ok(text_response(StatusCode::OK, plugins::tools_guide()));
    }

    if let Some(tool) = Tool::detect(last_content) {
        info!(tool = tool.id(), "dispatching tool command");
        return run_tool_command(&state, auth, model, tool, last_content).await;
    }

    if let Some(tool_id) = &request.tool_id {
        let Some(tool) = Tool::from_id(tool_id) else {
            return Err(ApiError::bad_request("Error: Tool not found"));
        };
        info!(tool = tool.id(), "synthesizing tool command");
        return run_synthesized_tool(&state, auth, model, tool, last_content, max_tokens).await;
    }

    let mut messages = sanitize(&selection.messages, &state.chat.system_prompt);
    augment_with_context(&state, model, &request, &mut messages).await;

    let completion = CompletionRequest {
        model: model.upstream_model(state.provider.chat_model()),
        messages: &messages,
        max_tokens,
        n: 1,
        stream,
        temperature,
    };

    if stream {
        let events = state.provider.stream(&completion)?;
        Ok(completion_stream_response(events))
    } else {
        let text = state.provider.complete(&completion).await?;
        Ok(text_response(StatusCode::OK, text))
    }
}

/// Replace the system prompt with its context-augmented form when the
/// request qualifies for retrieval. Retrieval failures degrade to the
/// plain prompt.
async fn augment_with_context(
    state: &AppState,
    model: &ModelSpec,
    request: &ChatRequest,
    messages: &mut [Message],
) {
    if model.kind != ModelKind::Assistant {
        return;
    }
    let Some(vector) = &state.vector else {
        return;
    };
    let Some(last) = request.messages.last().filter(|m| m.role == Role::User) else {
        return;
    };
    if !state.retrieval.within_band(&last.content) {
        return;
    }

    match retrieval::fetch_context(&state.provider, vector, &state.retrieval, &last.content).await {
        Ok(Some(context)) => {
            let augmented = retrieval::augmented_prompt(
                &state.chat.system_prompt,
                &state.chat.context_prompt,
                &context,
            );
            if let Some(first) = messages.first_mut() {
                if first.role == Role::System {
                    first.content = augmented;
                }
            }
        }
        Ok(None) => {}
        Err(err) => warn!(%err, "context retrieval failed"),
    }
}

/// Gate checks shared by both tool paths. Returns a response to send
/// instead of running the tool, or `None` when the scan may proceed.
async fn gate_tool(
    state: &AppState,
    auth: Option<&str>,
    model: &ModelSpec,
    tool: Tool,
) -> ApiResult<Option<Response>> {
    if model.kind != ModelKind::Pro {
        return Ok(Some(text_response(StatusCode::OK, PRO_ONLY_MESSAGE)));
    }
    if !state.tool_enabled(tool) {
        return Ok(Some(text_response(StatusCode::OK, tool.disabled_message())));
    }
    if let Some(status) = &state.status {
        match status.check_tool_rate_limit(auth, tool.id()).await {
            Ok(RateLimitVerdict::Allowed) => {}
            Ok(RateLimitVerdict::Limited { status, body }) => {
                return Err(ApiError::upstream(status, body));
            }
            Err(err) => {
                error!(tool = tool.id(), %err, "rate limit check failed");
                return Err(ApiError::internal("Error checking rate limit"));
            }
        }
    }
    Ok(None)
}

/// Run an explicit slash command.
async fn run_tool_command(
    state: &AppState,
    auth: Option<&str>,
    model: &ModelSpec,
    tool: Tool,
    input: &str,
) -> ApiResult<Response> {
    if let Some(reply) = gate_tool(state, auth, model, tool).await? {
        return Ok(reply);
    }

    let job = match plugins::prepare(tool, input) {
        Prepared::Run(job) => job,
        Prepared::Reply(text) => return Ok(text_response(StatusCode::OK, text)),
    };

    let (stream, body) = ScanStream::channel();
    let tools = state.tools.clone();
    tokio::spawn(async move {
        plugins::run_scan(job, &tools, stream, None).await;
    });
    Ok(event_stream_response(body))
}

/// Ask the model to turn a natural-language request into a tool command,
/// then run it. The model's raw answer is echoed down the stream before
/// any scan output.
async fn run_synthesized_tool(
    state: &AppState,
    auth: Option<&str>,
    model: &ModelSpec,
    tool: Tool,
    query: &str,
    max_tokens: u32,
) -> ApiResult<Response> {
    if let Some(reply) = gate_tool(state, auth, model, tool).await? {
        return Ok(reply);
    }

    let prompt = plugins::synthesis_prompt(tool, query);
    let messages = [Message::user(prompt)];
    let completion = CompletionRequest {
        model: model.upstream_model(state.provider.chat_model()),
        messages: &messages,
        max_tokens,
        n: 1,
        stream: false,
        temperature: 0.1,
    };
    let raw = state.provider.complete(&completion).await?;

    let command = match synthesize::extract_command(&raw) {
        Ok(synthesized) => synthesized,
        Err(synthesize::ExtractError::Missing) => {
            return Ok(text_response(
                StatusCode::OK,
                format!("{raw}\n\nNo JSON command found in the AI response."),
            ));
        }
        Err(synthesize::ExtractError::Invalid(err)) => {
            return Ok(text_response(
                StatusCode::OK,
                format!("{raw}\n\nError extracting and parsing JSON from AI response: {err}"),
            ));
        }
    };

    let job = match plugins::prepare(tool, &command) {
        Prepared::Run(job) => job,
        Prepared::Reply(text) => {
            return Ok(text_response(StatusCode::OK, format!("{raw}\n\n{text}")));
        }
    };

    let (stream, body) = ScanStream::channel();
    let tools = state.tools.clone();
    tokio::spawn(async move {
        plugins::run_scan(job, &tools, stream, Some(raw)).await;
    });
    Ok(event_stream_response(body))
}

fn text_response(status: StatusCode, body: impl Into<String>) -> Response {
    (status, body.into()).into_response()
}

/// Wrap a scan body in the server-sent-event response headers.
fn event_stream_response(body: Body) -> Response {
    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

/// Pump provider completion chunks into a plain-text response body.
fn completion_stream_response(mut events: CompletionStream) -> Response {
    let (tx, rx) = mpsc::channel::<Bytes>(32);
    tokio::spawn(async move {
        loop {
            match events.next_chunk().await {
                Ok(Some(chunk)) => {
                    if tx.send(Bytes::from(chunk)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(%err, "completion stream ended early");
                    break;
                }
            }
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    let mut response = Response::new(body);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
