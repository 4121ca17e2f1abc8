//! Subfinder passive subdomain-enumeration command: grammar, help, query,
//! and result rendering.

use chrono::Utc;

use super::command::{self, Parsed};

const MAX_INPUT_LENGTH: usize = 2000;
const MAX_PARAM_LENGTH: usize = 100;
const MAX_PARAMETER_COUNT: usize = 15;
const MAX_DOMAINS: usize = 50;

const DEFAULT_TIMEOUT: u32 = 30;
const MAX_TIMEOUT: u32 = 90;

/// Validated `/subfinder` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubfinderParams {
    pub domains: Vec<String>,
    pub include_ips: bool,
    pub only_active: bool,
    pub output_json: bool,
    pub include_sources: bool,
    pub timeout: u32,
}

impl Default for SubfinderParams {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            include_ips: false,
            only_active: false,
            output_json: false,
            include_sources: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Usage guide shown for the help flag.
pub fn help() -> String {
    "[Subfinder](https://github.com/projectdiscovery/subfinder) is a subdomain discovery tool \
that finds and returns valid subdomains for websites.

    Usage:
       /subfinder [flags]

    Flags:
    INPUT:
       -d, -domain string[]   domains to find subdomains for (comma-separated)

    CONFIGURATION:
       -t, -timeout int        seconds to wait before timing out (default 30)
       -cs, -include-sources   show the sources of discovered subdomains

    OUTPUT:
       -oj, -output-json   write output in JSONL(ines) format
       -ip                 include host IP in output (works with -active only)
       -a, -active         display active subdomains only"
        .to_string()
}

/// Parse the full text of a `/subfinder` command.
pub fn parse(input: &str) -> Parsed<SubfinderParams> {
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

    let mut params = SubfinderParams::default();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "-d" | "-domain" => {
                let values = command::take_values(&tokens, &mut i);
                if values.is_empty() {
                    return Parsed::Error("🚨 Domain flag provided without value".into());
                }
                for value in &values {
                    if value.len() > MAX_PARAM_LENGTH {
                        return Parsed::Error("🚨 Domain parameter is too long".into());
                    }
                }
                command::extend_csv(&mut params.domains, &values, MAX_DOMAINS);
            }
            "-ip" => params.include_ips = true,
            "-a" | "-active" => params.only_active = true,
            "-oj" | "-output-json" => params.output_json = true,
            "-cs" | "-include-sources" => params.include_sources = true,
            "-t" | "-timeout" => match command::take_value(&tokens, &mut i) {
                Some(value) if command::is_integer(value) => {
                    let Ok(timeout) = value.parse::<u32>() else {
                        return Parsed::Error("🚨 Invalid timeout value".into());
                    };
                    if timeout > MAX_TIMEOUT {
                        return Parsed::Error(format!(
                            "🚨 Timeout value exceeds the maximum limit of {MAX_TIMEOUT} seconds"
                        ));
                    }
                    params.timeout = timeout;
                }
                _ => return Parsed::Error("🚨 Invalid timeout value".into()),
            },
            unknown => {
                return Parsed::Error(format!("🚨 Invalid or unrecognized flag: {unknown}"));
            }
        }
        i += 1;
    }

    if params.domains.is_empty() {
        return Parsed::Error("🚨 Error: -d parameter is required.".into());
    }

    Parsed::Params(params)
}

/// Query string for the scanning service.
pub fn build_query(params: &SubfinderParams) -> String {
    let mut pairs = vec![format!(
        "domain={}",
        urlencoding::encode(&params.domains.join(","))
    )];
    if params.only_active {
        pairs.push("onlyActive=true".into());
    }
    if params.include_ips {
        pairs.push("includeIP=true".into());
    }
    if params.include_sources {
        pairs.push("includeSources=true".into());
    }
    if params.timeout != DEFAULT_TIMEOUT {
        pairs.push(format!("timeout={}", params.timeout));
    }
    pairs.join("&")
}

/// Prompt instructing the model to synthesize a `/subfinder` command.
pub fn synthesis_prompt(query: &str) -> String {
    format!(
        r#"Query: "{query}"

Based on this query, generate a command for the 'subfinder' tool, focusing on subdomain discovery. The command must start with 'subfinder' followed by the flags that reflect the user's request. Include the -d flag with the target domain; add other flags only when the request asks for them.

ALWAYS USE THIS FORMAT:
```json
{{ "command": "subfinder [flags]" }}
```
Replace '[flags]' with the actual flags and values.

Available flags:
- -d, -domain string[]: Domains to find subdomains for (required).
- -t, -timeout int: Seconds to wait before timing out (default 30, maximum 90).
- -cs, -include-sources: Show the sources of discovered subdomains.
- -oj, -output-json: Write output in JSONL format.
- -ip: Include host IP in output (works with -active only).
- -a, -active: Display active subdomains only.

Example commands:
```json
{{ "command": "subfinder -d example.com" }}
```

```json
{{ "command": "subfinder -d example.com,example.org -active -cs" }}
```

Response:"#
    )
}

/// Render scan output into the result block. JSONL records are reduced to
/// their hosts unless raw JSON output was requested.
pub fn format_response(output: &str, params: &SubfinderParams) -> String {
    let entries = if params.output_json {
        super::clean_output_lines(output)
    } else {
        hosts_from_jsonl(output, params.include_sources)
    };
    format!(
        "## [Subfinder](https://github.com/projectdiscovery/subfinder) Scan Results\n\
         **Target**: \"{}\"\n\n\
         **Scan Date and Time**: {} (UTC) \n\n\
         ### Identified Subdomains:\n```\n{}\n```\n",
        params.domains.join(","),
        Utc::now().format("%m/%d/%Y, %r"),
        entries.join("\n"),
    )
}

/// Terminal message when the scan produced nothing.
pub fn no_data_message(params: &SubfinderParams) -> String {
    format!(
        "🔍 No subdomains found for \"{}\"",
        params.domains.join(", ")
    )
}

/// Pull hosts out of JSONL records, keeping the raw line when it is not
/// JSON. With sources requested, each host carries its source list.
fn hosts_from_jsonl(output: &str, include_sources: bool) -> Vec<String> {
    super::clean_output_lines(output)
        .into_iter()
        .map(|line| match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(record) => {
                let host = record
                    .get("host")
                    .and_then(|value| value.as_str())
                    .unwrap_or(&line)
                    .to_string();
                if include_sources {
                    let sources = record
                        .get("sources")
                        .and_then(|value| value.as_array())
                        .map(|entries| {
                            entries
                                .iter()
                                .filter_map(|entry| entry.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        })
                        .unwrap_or_default();
                    if sources.is_empty() {
                        host
                    } else {
                        format!("{host} [{sources}]")
                    }
                } else {
                    host
                }
            }
            Err(_) => line,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(input: &str) -> SubfinderParams {
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
        let params = params("/subfinder -d example.com");
        assert_eq!(params.domains, ["example.com"]);
        assert_eq!(params.timeout, DEFAULT_TIMEOUT);
        assert!(!params.only_active);
    }

    #[test]
    fn test_full_command_round_trips_to_query() {
        let params = params("/subfinder -d example.com,example.org -active -cs -t 60");
        assert_eq!(params.domains, ["example.com", "example.org"]);
        assert_eq!(
            build_query(&params),
            "domain=example.com%2Cexample.org&onlyActive=true&includeSources=true&timeout=60"
        );
    }

    #[test]
    fn test_default_timeout_is_omitted_from_query() {
        let params = params("/subfinder -d example.com -t 30");
        assert_eq!(build_query(&params), "domain=example.com");
    }

    #[test]
    fn test_help_flag_short_circuits() {
        let Parsed::Help(guide) = parse("/subfinder -h") else {
            panic!("expected help");
        };
        assert!(guide.contains("Usage:"));
        assert!(guide.contains("-d, -domain"));
    }

    #[test]
    fn test_missing_domain() {
        assert_eq!(error("/subfinder -cs"), "🚨 Error: -d parameter is required.");
    }

    #[test]
    fn test_domain_flag_without_value() {
        assert_eq!(
            error("/subfinder -d -cs"),
            "🚨 Domain flag provided without value"
        );
    }

    #[test]
    fn test_oversized_input() {
        let input = format!("/subfinder -d {}", "a".repeat(2100));
        assert_eq!(error(&input), "🚨 Input command is too long");
    }

    #[test]
    fn test_too_many_parameters() {
        let input = format!("/subfinder -d example.com {}", "-ip ".repeat(15));
        assert_eq!(error(&input), "🚨 Too many parameters provided");
    }

    #[test]
    fn test_timeout_bounds() {
        assert_eq!(
            error("/subfinder -d example.com -t 91"),
            "🚨 Timeout value exceeds the maximum limit of 90 seconds"
        );
        assert_eq!(
            error("/subfinder -d example.com -t abc"),
            "🚨 Invalid timeout value"
        );
    }

    #[test]
    fn test_unknown_flag() {
        assert_eq!(
            error("/subfinder -d example.com -x"),
            "🚨 Invalid or unrecognized flag: -x"
        );
    }

    #[test]
    fn test_shell_metacharacters_are_stripped_before_parsing() {
        let params = params("/subfinder -d example.com;id");
        assert_eq!(params.domains, ["example.comid"]);
    }

    #[test]
    fn test_jsonl_output_reduces_to_hosts() {
        let output = "{\"host\":\"a.example.com\",\"sources\":[\"crtsh\"]}\n{\"host\":\"b.example.com\",\"sources\":[\"dnsdb\",\"crtsh\"]}";
        let params = params("/subfinder -d example.com");
        let formatted = format_response(output, &params);
        assert!(formatted.contains("a.example.com\nb.example.com"));
        assert!(!formatted.contains("crtsh"));
    }

    #[test]
    fn test_sources_are_appended_when_requested() {
        let output = "{\"host\":\"a.example.com\",\"sources\":[\"crtsh\",\"dnsdb\"]}";
        let params = params("/subfinder -d example.com -cs");
        let formatted = format_response(output, &params);
        assert!(formatted.contains("a.example.com [crtsh, dnsdb]"));
    }

    #[test]
    fn test_no_data_message_quotes_targets() {
        let params = params("/subfinder -d a.com,b.com");
        assert_eq!(no_data_message(&params), "🔍 No subdomains found for \"a.com, b.com\"");
    }
}
