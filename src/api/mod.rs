//! HTTP API module.
//!
//! Provides the chat endpoint, the tool catalog, and the health check.

mod error;
mod handlers;
mod routes;
mod state;

#[allow(unused_imports)]
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, ChatState};
