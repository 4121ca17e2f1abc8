//! Conversation cleanup before a provider call.

use super::message::{Message, Role};

/// Reply shown to users who exhausted their usage allowance. A turn answered
/// with this is a no-op exchange and is dropped wholesale.
pub const USAGE_CAP_WARNING: &str = "Hold On! You've Hit Your Usage Cap.";

/// Drop no-op and duplicate turns.
///
/// Walking from the oldest pair forward: a user turn answered by a cap
/// warning is removed together with the warning, and of two consecutive
/// user turns only the later survives. The newest message is retained when
/// it is a user turn not already represented, and a leading assistant turn
/// is dropped when it would leave the conversation starting mid-exchange.
pub fn clean_turns(messages: &[Message]) -> Vec<Message> {
    let mut cleaned: Vec<Message> = Vec::with_capacity(messages.len());

    let mut i = 0;
    while i + 1 < messages.len() {
        let message = &messages[i];
        let next = &messages[i + 1];

        if next.role == Role::Assistant && next.content.contains(USAGE_CAP_WARNING) {
            // A cap warning nullifies the exchange it answers.
            i += if message.role == Role::User { 2 } else { 1 };
            continue;
        }
        if message.role == Role::User && next.role == Role::User {
            // Retried question; the later turn wins.
            i += 1;
            continue;
        }
        cleaned.push(message.clone());
        i += 1;
    }

    if let Some(last) = messages.last() {
        let last_is_pending_user =
            last.role == Role::User && !last.content.contains(USAGE_CAP_WARNING);
        if last_is_pending_user && cleaned.last().map(|m| m.role) != Some(Role::User) {
            cleaned.push(last.clone());
        }
    }

    if cleaned.len() % 2 == 0 && cleaned.first().map(|m| m.role) == Some(Role::Assistant) {
        cleaned.remove(0);
    }

    cleaned
}

/// Clean the conversation and guarantee a leading system turn carrying
/// `system_content`. An existing system turn is left untouched.
pub fn sanitize(messages: &[Message], system_content: &str) -> Vec<Message> {
    let mut cleaned = clean_turns(messages);
    if cleaned.first().map(|m| m.role) != Some(Role::System) {
        cleaned.insert(0, Message::system(system_content));
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_warning_pair_is_dropped() {
        let messages = vec![
            Message::user("first question"),
            Message::assistant(format!("{USAGE_CAP_WARNING} Come back tomorrow.")),
            Message::user("second question"),
            Message::assistant("an answer"),
            Message::user("third question"),
        ];
        let cleaned = clean_turns(&messages);
        assert_eq!(
            cleaned
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>(),
            ["second question", "an answer", "third question"]
        );
    }

    #[test]
    fn test_consecutive_user_turns_keep_the_later() {
        let messages = vec![
            Message::user("typo qestion"),
            Message::user("typo question, fixed"),
            Message::assistant("answer"),
            Message::user("followup"),
        ];
        let cleaned = clean_turns(&messages);
        assert_eq!(
            cleaned
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>(),
            ["typo question, fixed", "answer", "followup"]
        );
    }

    #[test]
    fn test_pending_user_turn_is_retained() {
        let messages = vec![
            Message::user("question"),
            Message::assistant("answer"),
            Message::user("pending"),
        ];
        let cleaned = clean_turns(&messages);
        assert_eq!(cleaned.last().unwrap().content, "pending");
    }

    #[test]
    fn test_history_with_no_pending_question_drops_the_answer() {
        // Only a pending user turn is carried past the pair walk.
        let messages = vec![Message::user("question"), Message::assistant("answer")];
        let cleaned = clean_turns(&messages);
        assert_eq!(
            cleaned
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>(),
            ["question"]
        );
    }

    #[test]
    fn test_leading_assistant_turn_is_dropped_from_even_history() {
        let messages = vec![
            Message::assistant("greeting"),
            Message::user("question"),
            Message::assistant("answer"),
            Message::user("pending"),
        ];
        let cleaned = clean_turns(&messages);
        assert_eq!(cleaned.first().unwrap().content, "question");
        assert_eq!(cleaned.len(), 3);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let messages = vec![
            Message::user("a"),
            Message::assistant(USAGE_CAP_WARNING),
            Message::user("b"),
            Message::user("c"),
            Message::assistant("answer"),
            Message::user("d"),
        ];
        let once = clean_turns(&messages);
        let twice = clean_turns(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sanitize_prepends_system_prompt() {
        let messages = vec![Message::user("question")];
        let sanitized = sanitize(&messages, "base prompt");
        assert_eq!(sanitized[0], Message::system("base prompt"));
        assert_eq!(sanitized[1].content, "question");
    }

    #[test]
    fn test_sanitize_keeps_existing_system_prompt() {
        let messages = vec![
            Message::system("custom prompt"),
            Message::user("question"),
            Message::assistant("answer"),
            Message::user("pending"),
        ];
        let sanitized = sanitize(&messages, "base prompt");
        assert_eq!(sanitized[0].content, "custom prompt");
        assert_eq!(
            sanitized
                .iter()
                .filter(|m| m.role == Role::System)
                .count(),
            1
        );
    }

    #[test]
    fn test_empty_history() {
        assert!(clean_turns(&[]).is_empty());
        let sanitized = sanitize(&[], "base prompt");
        assert_eq!(sanitized, vec![Message::system("base prompt")]);
    }
}
