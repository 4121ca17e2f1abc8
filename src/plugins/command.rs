//! Shared building blocks for the per-tool command parsers.
//!
//! Every parser is total: any input maps to parameters, a help guide, or an
//! error message, never a panic. Helpers here cover the token shapes the
//! grammars share; each tool module owns its own flag set and messages.

use once_cell::sync::Lazy;
use regex::Regex;

/// Outcome of parsing one slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<P> {
    /// Validated parameters, ready to build an invocation.
    Params(P),
    /// A help flag short-circuited parsing; render this guide.
    Help(String),
    /// Validation failed; render this message to the user.
    Error(String),
}

/// Strip characters outside the permissive command allowlist (alphanumerics,
/// comma, dot, hyphen, whitespace). Used by grammars whose values are plain
/// hostnames; URL- and regex-taking grammars skip this.
pub fn strip_to_allowlist(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ',' | '.' | '-') || c.is_whitespace())
        .collect()
}

/// Exact-match unsigned integer token.
pub fn is_integer(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

static URL_WITH_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://\S+$").expect("static regex"));
static BARE_HOST: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+\.\S+$").expect("static regex"));

/// Loose URL shape check: a scheme'd URL or a bare host containing a dot.
pub fn is_valid_url(value: &str) -> bool {
    URL_WITH_SCHEME.is_match(value) || BARE_HOST.is_match(value)
}

/// Whether `pattern` compiles as a regular expression.
pub fn is_valid_regex(pattern: &str) -> bool {
    Regex::new(pattern).is_ok()
}

/// Whether any token in `tokens` is a help flag.
pub fn wants_help(tokens: &[&str]) -> bool {
    tokens.iter().any(|token| *token == "-h" || *token == "-help")
}

/// Consume the values following the list flag at `index`: every subsequent
/// token up to the next `-`-prefixed one. `index` is left on the last value
/// consumed.
pub fn take_values(tokens: &[&str], index: &mut usize) -> Vec<String> {
    let mut values = Vec::new();
    while let Some(next) = tokens.get(*index + 1) {
        if next.starts_with('-') {
            break;
        }
        *index += 1;
        values.push((*next).to_string());
    }
    values
}

/// The single value following the flag at `index`, if present and not
/// itself a flag. `index` is advanced past a consumed value.
pub fn take_value<'a>(tokens: &[&'a str], index: &mut usize) -> Option<&'a str> {
    match tokens.get(*index + 1) {
        Some(next) if !next.starts_with('-') => {
            *index += 1;
            Some(*next)
        }
        _ => None,
    }
}

/// Split comma-joined values and append the parts, capping the target at
/// `cap` entries. Excess entries are dropped silently.
pub fn extend_csv(target: &mut Vec<String>, values: &[String], cap: usize) {
    for value in values {
        for part in value.split(',') {
            if target.len() >= cap {
                return;
            }
            if !part.is_empty() {
                target.push(part.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlist_strips_shell_metacharacters() {
        assert_eq!(
            strip_to_allowlist("/subfinder -d example.com; rm -rf /"),
            "subfinder -d example.com rm -rf "
        );
        assert_eq!(strip_to_allowlist("a.b,c-d e"), "a.b,c-d e");
    }

    #[test]
    fn test_is_integer() {
        assert!(is_integer("0"));
        assert!(is_integer("42"));
        assert!(!is_integer(""));
        assert!(!is_integer("-5"));
        assert!(!is_integer("4.2"));
        assert!(!is_integer("5x"));
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com/path"));
        assert!(is_valid_url("http://example.com"));
        assert!(is_valid_url("example.com"));
        assert!(is_valid_url("sub.example.co.uk"));
        assert!(!is_valid_url("localhost"));
        assert!(!is_valid_url("http://with space.com"));
    }

    #[test]
    fn test_is_valid_regex() {
        assert!(is_valid_regex(r"^admin.*$"));
        assert!(!is_valid_regex(r"([unclosed"));
    }

    #[test]
    fn test_take_values_stops_at_next_flag() {
        let tokens = ["-u", "a.com", "b.com", "-d", "3"];
        let mut index = 0;
        let values = take_values(&tokens, &mut index);
        assert_eq!(values, ["a.com", "b.com"]);
        assert_eq!(index, 2);
        assert_eq!(tokens[index + 1], "-d");
    }

    #[test]
    fn test_take_values_empty_when_flag_follows() {
        let tokens = ["-u", "-d", "3"];
        let mut index = 0;
        assert!(take_values(&tokens, &mut index).is_empty());
        assert_eq!(index, 0);
    }

    #[test]
    fn test_take_value() {
        let tokens = ["-timeout", "30"];
        let mut index = 0;
        assert_eq!(take_value(&tokens, &mut index), Some("30"));
        assert_eq!(index, 1);

        let tokens = ["-timeout", "-u"];
        let mut index = 0;
        assert_eq!(take_value(&tokens, &mut index), None);
        assert_eq!(index, 0);
    }

    #[test]
    fn test_extend_csv_splits_and_caps() {
        let mut target = Vec::new();
        let values = vec!["a.com,b.com".to_string(), "c.com".to_string()];
        extend_csv(&mut target, &values, 50);
        assert_eq!(target, ["a.com", "b.com", "c.com"]);

        let mut capped = Vec::new();
        let many = vec!["x,".repeat(60)];
        extend_csv(&mut capped, &many, 50);
        assert_eq!(capped.len(), 50);
    }
}
