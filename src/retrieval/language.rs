//! Language gate and translation fallback for retrieval queries.
//!
//! The vector index is populated with English material, so non-English
//! queries are translated before embedding. Detection is a cheap vocabulary
//! ratio, not a full language model: good enough to decide whether a
//! translation call is worth making.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::chat::Message;
use crate::provider::{CompletionRequest, ProviderClient, ProviderResult};

/// High-frequency English words plus the domain terms queries here actually
/// contain. All entries are lowercase; lookups lowercase the input.
static REFERENCE_VOCABULARY: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "be", "to", "of", "and", "a", "in", "that", "have", "i", "it", "for", "not", "on",
        "with", "he", "as", "you", "do", "at", "this", "but", "his", "by", "from", "they", "we",
        "say", "her", "she", "or", "an", "will", "my", "one", "all", "would", "there", "their",
        "what", "so", "up", "out", "if", "about", "who", "get", "which", "go", "me", "when",
        "make", "can", "like", "time", "no", "just", "him", "know", "take", "people", "into",
        "year", "your", "good", "some", "could", "them", "see", "other", "than", "then", "now",
        "look", "only", "come", "its", "over", "think", "also", "back", "after", "use", "two",
        "how", "our", "work", "first", "well", "way", "even", "new", "want", "because", "any",
        "these", "give", "day", "most", "us", "is", "are", "was", "has", "had", "been", "were",
        "hack", "hacking", "hacker", "security", "vulnerability", "vulnerabilities", "exploit",
        "payload", "malware", "phishing", "encryption", "firewall", "network", "password",
        "breach", "attack", "threat", "scan", "penetration", "cybersecurity", "injection", "xss",
        "csrf", "authentication", "authorization", "server", "website", "domain", "subdomain",
        "port", "protocol",
    ]
    .into_iter()
    .collect()
});

const TRANSLATION_SYSTEM_PROMPT: &str = "You are a translation AI. Your task is to translate \
user input text into English accurately. Focus on providing a clear and direct translation. Do \
not add any additional comments or information.";

const TRANSLATION_INSTRUCTION: &str = "Translate the provided text into English. Focus on \
accuracy and clarity. Ensure the translation is direct and concise. Add no comments, opinions, \
or extraneous information. Accurately convey the original meaning and context in English. Avoid \
engaging in discussions or providing interpretations beyond the translation.";

/// Near-deterministic temperature for translation calls.
const TRANSLATION_TEMPERATURE: f32 = 0.1;

/// Classify `text` as English when at least `threshold_pct` percent of its
/// whitespace-split words appear in the reference vocabulary. Text with no
/// words is treated as non-English.
pub fn is_english(text: &str, threshold_pct: f32) -> bool {
    let lowered = text.to_lowercase();
    let mut total = 0usize;
    let mut hits = 0usize;
    for word in lowered.split_whitespace() {
        total += 1;
        if REFERENCE_VOCABULARY.contains(word) {
            hits += 1;
        }
    }
    if total == 0 {
        return false;
    }
    hits as f32 / total as f32 >= threshold_pct / 100.0
}

/// Translate `text` to English through the provider.
pub async fn translate_to_english(provider: &ProviderClient, text: &str) -> ProviderResult<String> {
    let messages = [
        Message::system(TRANSLATION_SYSTEM_PROMPT),
        Message::user(format!("{TRANSLATION_INSTRUCTION}Translate: {text}")),
    ];
    let request = CompletionRequest {
        model: provider.chat_model(),
        messages: &messages,
        max_tokens: 1000,
        n: 1,
        stream: false,
        temperature: TRANSLATION_TEMPERATURE,
    };
    provider.complete(&request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_english_passes() {
        assert!(is_english(
            "how do i scan the network for a vulnerability",
            20.0
        ));
    }

    #[test]
    fn test_domain_terms_count_as_english() {
        assert!(is_english("subfinder subdomain scan domain security", 20.0));
    }

    #[test]
    fn test_non_english_fails() {
        assert!(!is_english(
            "wie finde ich versteckte unterseiten einer webseite",
            20.0
        ));
    }

    #[test]
    fn test_empty_text_is_not_english() {
        assert!(!is_english("", 20.0));
        assert!(!is_english("   ", 20.0));
    }

    #[test]
    fn test_detection_is_case_insensitive() {
        assert!(is_english("THE NETWORK SECURITY SCAN", 20.0));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // One of five words is in the vocabulary: exactly 20%.
        let text = "scan verborgenen seiten einer webseite";
        assert!(is_english(text, 20.0));
        assert!(!is_english(text, 21.0));
    }
}
