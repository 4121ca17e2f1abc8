//! Conversation handling: message types, the model table, token accounting,
//! history selection, and turn sanitization.

pub mod budget;
pub mod message;
pub mod model;
pub mod sanitize;
pub mod tokens;

pub use budget::{BudgetError, Selection, select_messages};
pub use message::{ChatRequest, Message, Role};
pub use model::{ModelKind, ModelSpec, lookup_model};
