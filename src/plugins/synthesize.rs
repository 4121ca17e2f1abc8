//! Extraction of model-synthesized tool commands.
//!
//! When a request names a `tool_id` instead of carrying a typed command, the
//! model is prompted to answer with a fenced JSON block holding the command
//! line. The whole response is buffered first, then the block is pulled out
//! and parsed here.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Why a buffered model response yielded no usable command.
#[derive(Debug, PartialEq, Eq)]
pub enum ExtractError {
    /// No fenced JSON block anywhere in the response.
    Missing,
    /// A block was found but did not parse as `{"command": ...}`.
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct SynthesizedCommand {
    command: String,
}

static COMMAND_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\n\{.*?\}\n```").expect("static regex"));

/// Pull the synthesized command line out of a buffered model response.
pub fn extract_command(response: &str) -> Result<String, ExtractError> {
    let block = COMMAND_BLOCK.find(response).ok_or(ExtractError::Missing)?;
    let json = block
        .as_str()
        .trim_start_matches("```json\n")
        .trim_end_matches("\n```");
    let parsed: SynthesizedCommand =
        serde_json::from_str(json).map_err(|err| ExtractError::Invalid(err.to_string()))?;
    Ok(parsed.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_command_from_surrounding_prose() {
        let response = "Here is the command you need:\n```json\n{ \"command\": \"katana -u example.com -d 3\" }\n```\nLet me know how it goes.";
        assert_eq!(
            extract_command(response).unwrap(),
            "katana -u example.com -d 3"
        );
    }

    #[test]
    fn test_missing_block() {
        let response = "I could not determine a command for that request.";
        assert_eq!(extract_command(response), Err(ExtractError::Missing));
    }

    #[test]
    fn test_malformed_json_in_block() {
        let response = "```json\n{ \"command\": }\n```";
        assert!(matches!(
            extract_command(response),
            Err(ExtractError::Invalid(_))
        ));
    }

    #[test]
    fn test_block_without_command_key() {
        let response = "```json\n{ \"cmd\": \"naabu -host x\" }\n```";
        assert!(matches!(
            extract_command(response),
            Err(ExtractError::Invalid(_))
        ));
    }

    #[test]
    fn test_first_block_wins() {
        let response = "```json\n{ \"command\": \"httpx -u a.com\" }\n```\n```json\n{ \"command\": \"httpx -u b.com\" }\n```";
        assert_eq!(extract_command(response).unwrap(), "httpx -u a.com");
    }
}
