//! The model table: client-facing model names, context limits, and routing
//! behavior.

/// How a model participates in request routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Default assistant. History is sanitized and the system prompt may be
    /// augmented with retrieved context before the provider call.
    Assistant,
    /// Browsing persona. The first history entry is a priming message and is
    /// never replayed to the provider.
    Browsing,
    /// Full-capability model, the only one allowed to drive scanning tools.
    Pro,
}

/// One entry in the model table.
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    pub name: &'static str,
    pub kind: ModelKind,
    pub token_limit: usize,
}

/// Known models. Limits are uniform today but kept per entry so new models
/// can diverge without touching the selection logic.
const MODELS: &[ModelSpec] = &[
    ModelSpec {
        name: "gpt-3.5-turbo-instruct",
        kind: ModelKind::Assistant,
        token_limit: 8000,
    },
    ModelSpec {
        name: "gpt-3.5-turbo",
        kind: ModelKind::Browsing,
        token_limit: 8000,
    },
    ModelSpec {
        name: "gpt-4",
        kind: ModelKind::Pro,
        token_limit: 8000,
    },
];

/// Look up a model by its client-facing name.
pub fn lookup_model(name: &str) -> Option<&'static ModelSpec> {
    MODELS.iter().find(|spec| spec.name == name)
}

impl ModelSpec {
    /// Upstream identifier sent to the provider. The assistant persona maps
    /// to the configured provider model; the rest pass through unchanged.
    pub fn upstream_model<'a>(&'a self, configured: &'a str) -> &'a str {
        match self.kind {
            ModelKind::Assistant => configured,
            ModelKind::Browsing | ModelKind::Pro => self.name,
        }
    }
}
