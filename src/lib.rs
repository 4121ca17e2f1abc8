//! Strix backend library.
//!
//! Chat backend for a security-assistant frontend. Requests are routed to an
//! OpenAI-compatible model provider, assistant prompts can be augmented with
//! context retrieved from a vector index, and slash commands dispatch to
//! external scanning services whose results stream back incrementally.

pub mod api;
pub mod chat;
pub mod plugins;
pub mod provider;
pub mod retrieval;
pub mod status;
