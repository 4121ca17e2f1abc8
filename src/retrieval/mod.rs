//! Best-effort context augmentation for assistant chats.
//!
//! The newest user message is embedded and looked up in a vector index;
//! high-scoring snippets are formatted into delimited blocks and appended to
//! the system prompt. Every stage degrades to "no context" rather than
//! failing the chat request.

pub mod language;
pub mod vector;

pub use vector::{VectorClient, VectorError, VectorMatch};

use thiserror::Error;
use tracing::warn;

use crate::provider::{ProviderClient, ProviderError};

/// Tunables for the augmentation pipeline.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    /// Queries at or below this many characters are never augmented.
    pub min_query_chars: usize,
    /// Queries at or above this many characters are never augmented.
    pub max_query_chars: usize,
    /// Vocabulary-ratio percentage below which a query counts as
    /// non-English and is translated first.
    pub english_threshold_pct: f32,
    /// Fewer raw matches than this and the result is discarded outright.
    pub min_matches: usize,
    /// Matches at or below this score are dropped.
    pub min_score: f32,
    /// Formatted context is trimmed to at most this many characters.
    pub max_context_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            min_query_chars: 30,
            max_query_chars: 3000,
            english_threshold_pct: 20.0,
            min_matches: 3,
            min_score: 0.8,
            max_context_chars: 7500,
        }
    }
}

/// Failure inside the retrieval pipeline. The chat path logs these and
/// proceeds without context.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Vector(#[from] VectorError),
    #[error("embedding failed: {0}")]
    Embedding(ProviderError),
}

/// Marker opening each retrieved snippet; trimming cuts at the last one.
const CONTEXT_OPEN: &str = "[CONTEXT ";

impl RetrievalSettings {
    /// Whether a query's length makes it eligible for augmentation. Bounds
    /// are strict on both ends.
    pub fn within_band(&self, query: &str) -> bool {
        let len = query.chars().count();
        len > self.min_query_chars && len < self.max_query_chars
    }
}

/// Build the retrieved-context block for `query`, translating it to English
/// first when the language gate says so. `Ok(None)` means the index had
/// nothing usable.
pub async fn fetch_context(
    provider: &ProviderClient,
    vector: &VectorClient,
    settings: &RetrievalSettings,
    query: &str,
) -> Result<Option<String>, RetrievalError> {
    let query = if language::is_english(query, settings.english_threshold_pct) {
        query.to_string()
    } else {
        match language::translate_to_english(provider, query).await {
            Ok(translated) => translated,
            Err(err) => {
                warn!("query translation failed, skipping retrieval: {err}");
                String::new()
            }
        }
    };
    if query.is_empty() {
        return Ok(None);
    }

    let embedding = provider
        .embed(&query)
        .await
        .map_err(RetrievalError::Embedding)?;
    let matches = vector.query(&embedding).await?;
    Ok(format_context(&matches, settings))
}

/// Format scored matches into delimited context blocks, trimming whole
/// blocks from the least-relevant end until under the character budget.
pub fn format_context(matches: &[VectorMatch], settings: &RetrievalSettings) -> Option<String> {
    if matches.len() < settings.min_matches {
        return None;
    }

    let relevant: Vec<&VectorMatch> = matches
        .iter()
        .filter(|entry| entry.score > settings.min_score)
        .collect();

    let mut formatted = String::new();
    for (index, entry) in relevant.iter().enumerate() {
        formatted.push_str(&format!(
            "[CONTEXT {index}]:\n{}\n[END CONTEXT {index}]\n\n",
            entry.text
        ));
    }

    while formatted.len() > settings.max_context_chars {
        let Some(position) = formatted.rfind(CONTEXT_OPEN) else {
            break;
        };
        formatted.truncate(position);
        let trimmed_len = formatted.trim_end().len();
        formatted.truncate(trimmed_len);
    }

    if formatted.is_empty() {
        None
    } else {
        Some(formatted)
    }
}

/// System prompt with the retrieved block appended.
pub fn augmented_prompt(base: &str, context_prompt: &str, context: &str) -> String {
    format!("{base} {context_prompt}Context:\n {context}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: f32, text: &str) -> VectorMatch {
        VectorMatch {
            score,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_too_few_matches_yield_nothing() {
        let settings = RetrievalSettings::default();
        let matches = vec![entry(0.95, "a"), entry(0.92, "b")];
        assert_eq!(format_context(&matches, &settings), None);
    }

    #[test]
    fn test_low_scores_are_filtered() {
        let settings = RetrievalSettings::default();
        let matches = vec![entry(0.5, "a"), entry(0.6, "b"), entry(0.7, "c")];
        assert_eq!(format_context(&matches, &settings), None);
    }

    #[test]
    fn test_blocks_are_numbered_and_delimited() {
        let settings = RetrievalSettings::default();
        let matches = vec![
            entry(0.95, "first snippet"),
            entry(0.90, "second snippet"),
            entry(0.4, "irrelevant"),
        ];
        let context = format_context(&matches, &settings).unwrap();
        assert!(context.starts_with("[CONTEXT 0]:\nfirst snippet\n[END CONTEXT 0]\n\n"));
        assert!(context.contains("[CONTEXT 1]:\nsecond snippet\n[END CONTEXT 1]"));
        assert!(!context.contains("irrelevant"));
    }

    #[test]
    fn test_oversized_context_drops_whole_trailing_blocks() {
        let settings = RetrievalSettings {
            max_context_chars: 120,
            ..Default::default()
        };
        let matches = vec![
            entry(0.95, &"x".repeat(60)),
            entry(0.90, &"y".repeat(60)),
            entry(0.85, &"z".repeat(60)),
        ];
        let context = format_context(&matches, &settings).unwrap();
        assert!(context.len() <= 120);
        assert!(context.contains("[CONTEXT 0]"));
        assert!(!context.contains("[CONTEXT 2]"));
        // Blocks are removed whole; no dangling open marker remains.
        assert_eq!(context.matches("[CONTEXT ").count(), context.matches("[END CONTEXT ").count());
    }

    #[test]
    fn test_band_bounds_are_strict() {
        let settings = RetrievalSettings::default();
        assert!(!settings.within_band(&"a".repeat(30)));
        assert!(settings.within_band(&"a".repeat(31)));
        assert!(settings.within_band(&"a".repeat(2999)));
        assert!(!settings.within_band(&"a".repeat(3000)));
    }

    #[test]
    fn test_augmented_prompt_layout() {
        let prompt = augmented_prompt("Base.", "Use the context. ", "[CONTEXT 0]:\nx\n[END CONTEXT 0]");
        assert_eq!(
            prompt,
            "Base. Use the context. Context:\n [CONTEXT 0]:\nx\n[END CONTEXT 0]"
        );
    }
}
