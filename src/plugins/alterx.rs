//! Alterx subdomain-wordlist command: grammar, help, query, and result
//! rendering.

use super::command::{self, Parsed};

const MAX_INPUT_LENGTH: usize = 2000;
const MAX_PARAM_LENGTH: usize = 100;
const MAX_PARAMETER_COUNT: usize = 15;
const MAX_LIST_ENTRIES: usize = 50;

/// Validated `/alterx` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlterxParams {
    pub list: Vec<String>,
    pub patterns: Vec<String>,
    pub enrich: bool,
    pub limit: u32,
}

/// Usage guide shown for the help flag.
pub fn help() -> String {
    "[Alterx](https://github.com/projectdiscovery/alterx) is a fast and customizable \
subdomain wordlist generator using DSL.

    Usage:
       /alterx [flags]

    Flags:
    INPUT:
       -l, -list string[]      subdomains file or list to use for creating permutations (comma-separated)
       -p, -pattern string[]   custom permutation patterns input to generate (comma-separated)

    CONFIGURATION:
       -en, -enrich   enrich wordlist by extracting words from input
       -limit int     limit the number of results to return (default 0)"
        .to_string()
}

/// Parse the full text of an `/alterx` command.
pub fn parse(input: &str) -> Parsed<AlterxParams> {
    if input.len() > MAX_INPUT_LENGTH {
        return Parsed::Error("🚨 Input command is too long".into());
    }

    let sanitized = command::strip_to_allowlist(input);
    let tokens: Vec<&str> = sanitized.split_whitespace().skip(1).collect();
    if tokens.len() > MAX_PARAMETER_COUNT {
        return Parsed::Error("🚨 Too many parameters provided".into());
    }
    if command::wants_help(&tokens) {
        return Parsed::Help(help());
    }

    let mut params = AlterxParams::default();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "-l" | "-list" => {
                let values = command::take_values(&tokens, &mut i);
                if values.is_empty() {
                    return Parsed::Error("🚨 List flag provided without value".into());
                }
                for value in &values {
                    if value.len() > MAX_PARAM_LENGTH {
                        return Parsed::Error("🚨 List parameter is too long".into());
                    }
                }
                command::extend_csv(&mut params.list, &values, MAX_LIST_ENTRIES);
            }
            "-p" | "-pattern" => {
                let values = command::take_values(&tokens, &mut i);
                if values.is_empty() {
                    return Parsed::Error("🚨 Pattern flag provided without value".into());
                }
                for value in &values {
                    if value.len() > MAX_PARAM_LENGTH {
                        return Parsed::Error("🚨 Pattern parameter is too long".into());
                    }
                }
                command::extend_csv(&mut params.patterns, &values, MAX_LIST_ENTRIES);
            }
            "-en" | "-enrich" => params.enrich = true,
            "-limit" => match command::take_value(&tokens, &mut i) {
                Some(value) if command::is_integer(value) => {
                    let Ok(limit) = value.parse::<u32>() else {
                        return Parsed::Error("🚨 Invalid limit value".into());
                    };
                    params.limit = limit;
                }
                _ => return Parsed::Error("🚨 Invalid limit value".into()),
            },
            unknown => {
                return Parsed::Error(format!("🚨 Invalid or unrecognized flag: {unknown}"));
            }
        }
        i += 1;
    }

    if params.list.is_empty() {
        return Parsed::Error("🚨 Error: -l parameter is required.".into());
    }

    Parsed::Params(params)
}

/// Query string for the scanning service.
pub fn build_query(params: &AlterxParams) -> String {
    let mut pairs = vec![format!(
        "list={}",
        urlencoding::encode(&params.list.join(","))
    )];
    if !params.patterns.is_empty() {
        pairs.push(format!(
            "pattern={}",
            urlencoding::encode(&params.patterns.join(","))
        ));
    }
    if params.enrich {
        pairs.push("enrich=true".into());
    }
    if params.limit > 0 {
        pairs.push(format!("limit={}", params.limit));
    }
    pairs.join("&")
}

/// Prompt instructing the model to synthesize an `/alterx` command.
pub fn synthesis_prompt(query: &str) -> String {
    format!(
        r#"Query: "{query}"

Based on this query, generate a command for the 'alterx' tool, focusing on subdomain wordlist generation. The command must start with 'alterx' followed by the flags that reflect the user's request. Include the -l flag with the subdomains or domain to permute; add patterns and other flags only when the request asks for them.

ALWAYS USE THIS FORMAT:
```json
{{ "command": "alterx [flags]" }}
```
Replace '[flags]' with the actual flags and values.

Available flags:
- -l, -list string[]: Subdomains or domains to use for creating permutations (required).
- -p, -pattern string[]: Custom permutation patterns to generate.
- -en, -enrich: Enrich wordlist by extracting words from the input.
- -limit int: Limit the number of results to return (default 0, unlimited).

Example commands:
```json
{{ "command": "alterx -l api.example.com" }}
```

```json
{{ "command": "alterx -l api.example.com,admin.example.com -en -limit 500" }}
```

Response:"#
    )
}

/// Render generated permutations into the result block.
pub fn format_response(output: &str, params: &AlterxParams) -> String {
    let entries = super::clean_output_lines(output);
    format!(
        "## [Alterx](https://github.com/projectdiscovery/alterx) Results\n\
         **Input Domain**: \"{}\"\n\n\
         ### Generated Subdomains:\n```\n{}\n```\n",
        params.list.join(","),
        entries.join("\n"),
    )
}

/// Terminal message when the scan produced nothing.
pub fn no_data_message(params: &AlterxParams) -> String {
    format!(
        "🔍 Unable to generate wordlist for \"{}\"",
        params.list.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(input: &str) -> AlterxParams {
        match parse(input) {
            Parsed::Params(params) => params,
            other => panic!("expected params, got {other:?}"),
        }
    }

    fn error(input: &str) -> String {
        match parse(input) {
            Parsed::Error(message) => message,
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_minimal_command() {
        let params = params("/alterx -l api.example.com");
        assert_eq!(params.list, ["api.example.com"]);
        assert!(params.patterns.is_empty());
        assert_eq!(params.limit, 0);
    }

    #[test]
    fn test_multi_token_list_values() {
        let params = params("/alterx -l api.example.com admin.example.com -en");
        assert_eq!(params.list, ["api.example.com", "admin.example.com"]);
        assert!(params.enrich);
    }

    #[test]
    fn test_full_command_round_trips_to_query() {
        let params = params("/alterx -l api.example.com -p word.word2.tld -en -limit 100");
        assert_eq!(
            build_query(&params),
            "list=api.example.com&pattern=word.word2.tld&enrich=true&limit=100"
        );
    }

    #[test]
    fn test_zero_limit_is_omitted_from_query() {
        let params = params("/alterx -l api.example.com -limit 0");
        assert_eq!(build_query(&params), "list=api.example.com");
    }

    #[test]
    fn test_help_flag_short_circuits() {
        let Parsed::Help(guide) = parse("/alterx -help") else {
            panic!("expected help");
        };
        assert!(guide.contains("permutations"));
    }

    #[test]
    fn test_missing_list() {
        assert_eq!(error("/alterx -en"), "🚨 Error: -l parameter is required.");
    }

    #[test]
    fn test_list_flag_without_value() {
        assert_eq!(error("/alterx -l -en"), "🚨 List flag provided without value");
    }

    #[test]
    fn test_oversized_list_entry() {
        let input = format!("/alterx -l {}", "a".repeat(150));
        assert_eq!(error(&input), "🚨 List parameter is too long");
    }

    #[test]
    fn test_invalid_limit() {
        assert_eq!(
            error("/alterx -l api.example.com -limit abc"),
            "🚨 Invalid limit value"
        );
    }

    #[test]
    fn test_unknown_flag() {
        assert_eq!(
            error("/alterx -l api.example.com -q"),
            "🚨 Invalid or unrecognized flag: -q"
        );
    }

    #[test]
    fn test_format_has_no_timestamp() {
        let params = params("/alterx -l api.example.com");
        let formatted = format_response("x.example.com\ny.example.com", &params);
        assert!(formatted.contains("**Input Domain**: \"api.example.com\""));
        assert!(!formatted.contains("Scan Date"));
        assert!(formatted.contains("x.example.com\ny.example.com"));
    }

    #[test]
    fn test_no_data_message() {
        let params = params("/alterx -l a.com,b.com");
        assert_eq!(
            no_data_message(&params),
            "🔍 Unable to generate wordlist for \"a.com, b.com\""
        );
    }
}
