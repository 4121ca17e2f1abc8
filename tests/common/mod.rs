//! Test utilities and common setup.

use axum::Router;
use strix::api::{self, AppState};
use strix::plugins::{TOOLS, Tool, ToolClient};
use strix::provider::ProviderClient;

/// State wired to unreachable backends. Requests that consult the
/// provider or the tool service will fail fast; everything handled
/// locally works as in production.
pub fn test_state() -> AppState {
    let provider = ProviderClient::new(
        "http://127.0.0.1:9",
        "test-key",
        "gpt-3.5-turbo",
        "text-embedding-ada-002",
    );
    let tools = ToolClient::new("http://127.0.0.1:9", "test-token", "plugins.test", 5);
    AppState::new(provider, tools)
}

/// Create a test application with default state.
pub fn test_app() -> Router {
    api::create_router(test_state())
}

/// Create a test application with one tool disabled.
pub fn test_app_without_tool(disabled: Tool) -> Router {
    let enabled = TOOLS
        .iter()
        .copied()
        .filter(|tool| *tool != disabled)
        .collect();
    api::create_router(test_state().with_enabled_tools(enabled))
}
