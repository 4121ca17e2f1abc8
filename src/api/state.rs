//! Application state shared across handlers.

use crate::plugins::{TOOLS, Tool, ToolClient};
use crate::provider::ProviderClient;
use crate::retrieval::{RetrievalSettings, VectorClient};
use crate::status::StatusClient;

/// Prompt and sampling defaults for the chat surface.
#[derive(Clone, Debug)]
pub struct ChatState {
    /// System prompt prepended to every conversation.
    pub system_prompt: String,
    /// Instruction inserted between the system prompt and retrieved
    /// context when retrieval augments a request.
    pub context_prompt: String,
    /// Sampling temperature used when the request does not set one.
    pub default_temperature: f32,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            system_prompt: "You are Strix, an expert assistant for ethical hacking, bug \
                            bounty hunting, and penetration testing. Provide accurate, \
                            detailed answers and favor practical guidance the user can \
                            act on."
                .to_string(),
            context_prompt: "You have access to retrieved reference material below. Use \
                             it only when it is relevant to the user's question, and \
                             answer from your own knowledge otherwise.\n"
                .to_string(),
            default_temperature: 0.4,
        }
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Client for the LLM provider (completions and embeddings).
    pub provider: ProviderClient,
    /// Client for the scanning plugin services.
    pub tools: ToolClient,
    /// Optional per-user status and rate-limit gatekeeper.
    pub status: Option<StatusClient>,
    /// Optional vector index for retrieval augmentation.
    pub vector: Option<VectorClient>,
    /// Prompt and sampling defaults.
    pub chat: ChatState,
    /// Retrieval augmentation thresholds.
    pub retrieval: RetrievalSettings,
    /// Tools users may invoke. Commands for others answer with a
    /// disabled notice.
    pub enabled_tools: Vec<Tool>,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
}

impl AppState {
    /// Create new application state with every tool enabled and no
    /// gatekeeper or vector index attached.
    pub fn new(provider: ProviderClient, tools: ToolClient) -> Self {
        Self {
            provider,
            tools,
            status: None,
            vector: None,
            chat: ChatState::default(),
            retrieval: RetrievalSettings::default(),
            enabled_tools: TOOLS.to_vec(),
            allowed_origins: Vec::new(),
        }
    }

    /// Attach the status-check gatekeeper.
    pub fn with_status(mut self, status: StatusClient) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the vector index used for retrieval augmentation.
    pub fn with_vector(mut self, vector: VectorClient) -> Self {
        self.vector = Some(vector);
        self
    }

    /// Override prompt and sampling defaults.
    pub fn with_chat(mut self, chat: ChatState) -> Self {
        self.chat = chat;
        self
    }

    /// Override retrieval thresholds.
    pub fn with_retrieval(mut self, retrieval: RetrievalSettings) -> Self {
        self.retrieval = retrieval;
        self
    }

    /// Restrict which tools users may invoke.
    pub fn with_enabled_tools(mut self, tools: Vec<Tool>) -> Self {
        self.enabled_tools = tools;
        self
    }

    /// Set the origins allowed by the CORS layer.
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn tool_enabled(&self, tool: Tool) -> bool {
        self.enabled_tools.contains(&tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        let provider = ProviderClient::new("http://localhost:1234", "key", "gpt-4", "embed");
        let tools = ToolClient::new("http://localhost:5678", "token", "", 120);
        AppState::new(provider, tools)
    }

    #[test]
    fn test_new_state_enables_every_tool() {
        let state = state();
        for tool in TOOLS {
            assert!(state.tool_enabled(*tool));
        }
        assert!(state.status.is_none());
        assert!(state.vector.is_none());
    }

    #[test]
    fn test_enabled_tools_can_be_restricted() {
        let state = state().with_enabled_tools(vec![Tool::Subfinder]);
        assert!(state.tool_enabled(Tool::Subfinder));
        assert!(!state.tool_enabled(Tool::Katana));
    }
}
