//! Token estimation without a tokenizer dependency.
//!
//! Selection only has to stay safely under the provider's context window, so
//! a character-ratio heuristic that slightly overestimates is sufficient.

/// Average characters per token for English-heavy chat text.
const CHARS_PER_TOKEN: f32 = 3.2;

/// Estimate how many tokens `text` will cost at the provider.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() as f32 / CHARS_PER_TOKEN).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_free() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_short_text_rounds_up() {
        // 1 byte / 3.2 rounds up to a whole token.
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 2);
    }

    #[test]
    fn test_estimate_is_monotonic() {
        let short = estimate_tokens("what is a buffer overflow");
        let long = estimate_tokens("what is a buffer overflow and how do I detect one in a heap dump");
        assert!(long > short);
    }

    #[test]
    fn test_multibyte_text_counts_bytes() {
        // Byte length is deliberate: multibyte text overestimates, which
        // keeps the selection under the window.
        assert!(estimate_tokens("héllo wörld") >= estimate_tokens("hello world"));
    }
}
