//! Token-budget-aware history selection.

use thiserror::Error;

use super::message::Message;
use super::model::{ModelKind, ModelSpec};
use super::tokens::estimate_tokens;

/// Tokens held back from the context window for the model's reply.
pub const RESERVED_TOKENS: usize = 2000;

/// Running token account for one request. A charge is admitted only while
/// `used + charge + reserved` stays within the model limit.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    limit: usize,
    reserved: usize,
    used: usize,
}

impl TokenBudget {
    pub fn new(limit: usize, reserved: usize) -> Self {
        Self {
            limit,
            reserved,
            used: 0,
        }
    }

    /// Charge unconditionally. Used for the fixed system prompt, which is
    /// always sent.
    pub fn charge(&mut self, tokens: usize) {
        self.used += tokens;
    }

    /// Charge only if the reserve invariant holds; reports whether the
    /// charge was applied.
    pub fn try_charge(&mut self, tokens: usize) -> bool {
        if self.used + tokens + self.reserved <= self.limit {
            self.used += tokens;
            true
        } else {
            false
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }
}

/// History selection failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BudgetError {
    /// The newest message cannot fit alongside the prompt and the reply
    /// reserve. The text is relayed to the client verbatim.
    #[error(
        "This message exceeds the model's maximum token limit of {limit}. Please shorten your message."
    )]
    LastMessageTooLarge { limit: usize },
}

/// Outcome of history selection: a contiguous suffix of the conversation
/// plus the total token estimate including the system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub messages: Vec<Message>,
    pub token_count: usize,
}

/// Select the suffix of `messages` that fits the model's window alongside
/// `system_prompt`, leaving [`RESERVED_TOKENS`] for the reply.
///
/// The newest message is never dropped: if it does not fit, the whole
/// request is rejected. Older messages are admitted newest-first and the
/// walk stops at the first message that does not fit, so the result is
/// always contiguous. For browsing models the first history entry is a
/// priming message and is never replayed.
pub fn select_messages(
    messages: &[Message],
    spec: &ModelSpec,
    system_prompt: &str,
) -> Result<Selection, BudgetError> {
    let mut budget = TokenBudget::new(spec.token_limit, RESERVED_TOKENS);
    budget.charge(estimate_tokens(system_prompt));

    let Some((last, history)) = messages.split_last() else {
        return Ok(Selection {
            messages: Vec::new(),
            token_count: budget.used(),
        });
    };

    if !budget.try_charge(estimate_tokens(&last.content)) {
        return Err(BudgetError::LastMessageTooLarge {
            limit: spec.token_limit,
        });
    }

    let floor = match spec.kind {
        ModelKind::Browsing => 1,
        ModelKind::Assistant | ModelKind::Pro => 0,
    };

    let mut selected = vec![last.clone()];
    for message in history.iter().skip(floor).rev() {
        if !budget.try_charge(estimate_tokens(&message.content)) {
            break;
        }
        selected.push(message.clone());
    }
    selected.reverse();

    Ok(Selection {
        messages: selected,
        token_count: budget.used(),
    })
}
