//! Client for the OpenAI-compatible model provider.

pub mod client;
pub mod error;
pub mod types;

pub use client::{CompletionStream, ProviderClient};
pub use error::{ProviderError, ProviderResult};
pub use types::CompletionRequest;
