//! Naabu port-scanning command: grammar, help, query, and result rendering.

use chrono::Utc;

use super::command::{self, Parsed};

const MAX_INPUT_LENGTH: usize = 2000;
const MAX_PARAM_LENGTH: usize = 100;
const MAX_LIST_ENTRIES: usize = 50;

const DEFAULT_TIMEOUT: u32 = 10;
const MAX_TIMEOUT: u32 = 90;

/// Validated `/naabu` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaabuParams {
    pub hosts: Vec<String>,
    pub ports: Vec<String>,
    pub top_ports: String,
    pub exclude_ports: Vec<String>,
    pub port_threshold: u32,
    pub scan_all_ips: bool,
    pub timeout: u32,
}

impl Default for NaabuParams {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            ports: Vec::new(),
            top_ports: String::new(),
            exclude_ports: Vec::new(),
            port_threshold: 0,
            scan_all_ips: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Usage guide shown for the help flag.
pub fn help() -> String {
    "[Naabu](https://github.com/projectdiscovery/naabu) is a port scanning tool written \
in Go that allows you to enumerate valid ports for hosts in a fast and reliable manner.

    Usage:
       /naabu [flags]

    Flags:
    INPUT:
       -host string[]   hosts to scan ports for (comma-separated)

    PORT:
       -p, -port string            ports to scan (80,443, 100-200)
       -tp, -top-ports string      top ports to scan (100,1000)
       -ep, -exclude-ports string  ports to exclude from scan (comma-separated)
       -pts, -port-threshold int   port threshold to skip port scan for the host

    CONFIGURATION:
       -sa, -scan-all-ips   scan all the IP's associated with DNS record
       -timeout int         seconds to wait before timing out (default 10)"
        .to_string()
}

/// A port spec is a single port or an inclusive `low-high` range.
fn is_port_spec(value: &str) -> bool {
    let mut sides = value.splitn(2, '-');
    let low = sides.next().unwrap_or_default();
    if !command::is_integer(low) {
        return false;
    }
    match sides.next() {
        Some(high) => command::is_integer(high),
        None => true,
    }
}

/// Parse the full text of a `/naabu` command.
pub fn parse(input: &str) -> Parsed<NaabuParams> {
    if input.len() > MAX_INPUT_LENGTH {
        return Parsed::Error("🚨 Input command is too long".into());
    }

    let tokens: Vec<&str> = input.split_whitespace().skip(1).collect();
    for token in &tokens {
        if token.len() > MAX_PARAM_LENGTH {
            return Parsed::Error(format!("🚨 Parameter value too long: {token}"));
        }
    }
    if command::wants_help(&tokens) {
        return Parsed::Help(help());
    }

    let mut params = NaabuParams::default();
    let mut i = 0;
    while i < tokens.len() {
        let flag = tokens[i];
        match flag {
            "-host" => {
                let values = command::take_values(&tokens, &mut i);
                if values.is_empty() {
                    return Parsed::Error("🚨 No host provided for '-host' flag".into());
                }
                command::extend_csv(&mut params.hosts, &values, MAX_LIST_ENTRIES);
            }
            "-p" | "-port" => match command::take_value(&tokens, &mut i) {
                Some(value) => {
                    let mut parts = Vec::new();
                    command::extend_csv(&mut parts, &[value.to_string()], MAX_LIST_ENTRIES);
                    for part in &parts {
                        if !is_port_spec(part) {
                            return Parsed::Error(format!("🚨 Invalid port value: {part}"));
                        }
                    }
                    params.ports.extend(parts);
                }
                None => {
                    return Parsed::Error(format!("🚨 No port provided for '{flag}' flag"));
                }
            },
            "-tp" | "-top-ports" => match command::take_value(&tokens, &mut i) {
                Some("100") => params.top_ports = "100".into(),
                Some("1000") => params.top_ports = "1000".into(),
                Some(value) => {
                    return Parsed::Error(format!("🚨 Invalid top-ports value: {value}"));
                }
                None => {
                    return Parsed::Error(format!("🚨 No top-ports value provided for '{flag}' flag"));
                }
            },
            "-ep" | "-exclude-ports" => match command::take_value(&tokens, &mut i) {
                Some(value) => {
                    let mut parts = Vec::new();
                    command::extend_csv(&mut parts, &[value.to_string()], MAX_LIST_ENTRIES);
                    for part in &parts {
                        if !is_port_spec(part) {
                            return Parsed::Error(format!("🚨 Invalid exclude-ports value: {part}"));
                        }
                    }
                    params.exclude_ports.extend(parts);
                }
                None => {
                    return Parsed::Error(format!("🚨 No exclude-ports value provided for '{flag}' flag"));
                }
            },
            "-pts" | "-port-threshold" => match command::take_value(&tokens, &mut i) {
                Some(value) if command::is_integer(value) => {
                    let Ok(threshold) = value.parse::<u32>() else {
                        return Parsed::Error("🚨 Invalid port threshold value".into());
                    };
                    params.port_threshold = threshold;
                }
                _ => {
                    return Parsed::Error("🚨 Invalid port threshold value".into());
                }
            },
            "-sa" | "-scan-all-ips" => params.scan_all_ips = true,
            "-timeout" => match command::take_value(&tokens, &mut i) {
                Some(value) if command::is_integer(value) => {
                    let Ok(timeout) = value.parse::<u32>() else {
                        return Parsed::Error("🚨 Invalid timeout value for '-timeout' flag".into());
                    };
                    if timeout > MAX_TIMEOUT {
                        return Parsed::Error(format!(
                            "🚨 Timeout value exceeds the maximum limit of {MAX_TIMEOUT} seconds"
                        ));
                    }
                    params.timeout = timeout;
                }
                _ => {
                    return Parsed::Error("🚨 Invalid timeout value for '-timeout' flag".into());
                }
            },
            unknown => {
                return Parsed::Error(format!("🚨 Invalid or unrecognized flag: {unknown}"));
            }
        }
        i += 1;
    }

    if params.hosts.is_empty() {
        return Parsed::Error("🚨 Error: -host parameter is required.".into());
    }

    Parsed::Params(params)
}

/// Query string for the scanning service.
pub fn build_query(params: &NaabuParams) -> String {
    let mut pairs = vec![format!(
        "host={}",
        urlencoding::encode(&params.hosts.join(","))
    )];
    if !params.ports.is_empty() {
        pairs.push(format!(
            "port={}",
            urlencoding::encode(&params.ports.join(","))
        ));
    }
    if !params.top_ports.is_empty() {
        pairs.push(format!("topPorts={}", params.top_ports));
    }
    if !params.exclude_ports.is_empty() {
        pairs.push(format!(
            "excludePorts={}",
            urlencoding::encode(&params.exclude_ports.join(","))
        ));
    }
    if params.port_threshold > 0 {
        pairs.push(format!("portThreshold={}", params.port_threshold));
    }
    if params.scan_all_ips {
        pairs.push("scanAllIps=true".into());
    }
    if params.timeout != DEFAULT_TIMEOUT {
        pairs.push(format!("timeout={}", params.timeout));
    }
    pairs.join("&")
}

/// Prompt instructing the model to synthesize a `/naabu` command.
pub fn synthesis_prompt(query: &str) -> String {
    format!(
        r#"Query: "{query}"

Based on this query, generate a command for the 'naabu' tool, focusing on port scanning. The command must start with 'naabu' followed by the relevant flags. The -host flag is required to specify the target host(s). Add port selection flags only when the request names specific ports or ranges.

ALWAYS USE THIS FORMAT:
```json
{{ "command": "naabu [flags]" }}
```
Replace '[flags]' with the actual flags and values.

Available flags:
- -host string[]: Hosts to scan ports for (required).
- -p, -port string: Ports to scan (80,443, 100-200).
- -tp, -top-ports string: Top ports to scan (100 or 1000).
- -ep, -exclude-ports string: Ports to exclude from the scan.
- -pts, -port-threshold int: Port threshold to skip port scan for the host.
- -sa, -scan-all-ips: Scan all the IPs associated with a DNS record.
- -timeout int: Seconds to wait before timing out (default 10, maximum 90).

Example commands:
```json
{{ "command": "naabu -host example.com" }}
```

```json
{{ "command": "naabu -host example.com,example.org -p 80,443,8080 -sa" }}
```

Response:"#
    )
}

/// Render open ports into the result block.
pub fn format_response(output: &str, params: &NaabuParams) -> String {
    let entries = super::clean_output_lines(output);
    format!(
        "## [Naabu](https://github.com/projectdiscovery/naabu) Scan Results\n\
         **Target**: \"{}\"\n\n\
         **Scan Date and Time**: {} (UTC) \n\n\
         ### Identified Ports:\n```\n{}\n```\n",
        params.hosts.join(","),
        Utc::now().format("%m/%d/%Y, %r"),
        entries.join("\n"),
    )
}

/// Terminal message when the scan produced nothing.
pub fn no_data_message(params: &NaabuParams) -> String {
    format!("🔍 No open ports found for {}.", params.hosts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(input: &str) -> NaabuParams {
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
        let params = params("/naabu -host example.com");
        assert_eq!(params.hosts, ["example.com"]);
        assert_eq!(build_query(&params), "host=example.com");
    }

    #[test]
    fn test_ports_and_ranges() {
        let params = params("/naabu -host example.com -p 80,443,100-200");
        assert_eq!(params.ports, ["80", "443", "100-200"]);
        assert_eq!(
            build_query(&params),
            "host=example.com&port=80%2C443%2C100-200"
        );
    }

    #[test]
    fn test_invalid_port() {
        assert_eq!(
            error("/naabu -host example.com -p http"),
            "🚨 Invalid port value: http"
        );
    }

    #[test]
    fn test_top_ports_allows_known_buckets_only() {
        let params = params("/naabu -host example.com -tp 1000");
        assert_eq!(params.top_ports, "1000");
        assert_eq!(
            error("/naabu -host example.com -tp 500"),
            "🚨 Invalid top-ports value: 500"
        );
    }

    #[test]
    fn test_scan_all_ips_and_threshold() {
        let params = params("/naabu -host example.com -sa -pts 1000");
        assert!(params.scan_all_ips);
        assert_eq!(params.port_threshold, 1000);
        assert_eq!(
            build_query(&params),
            "host=example.com&portThreshold=1000&scanAllIps=true"
        );
    }

    #[test]
    fn test_missing_host() {
        assert_eq!(error("/naabu -p 80"), "🚨 Error: -host parameter is required.");
    }

    #[test]
    fn test_timeout_cap() {
        assert_eq!(
            error("/naabu -host example.com -timeout 91"),
            "🚨 Timeout value exceeds the maximum limit of 90 seconds"
        );
    }

    #[test]
    fn test_help() {
        let Parsed::Help(guide) = parse("/naabu -h") else {
            panic!("expected help");
        };
        assert!(guide.contains("-host string[]"));
        assert!(guide.contains("port scanning tool"));
    }

    #[test]
    fn test_no_data_message() {
        let params = params("/naabu -host a.com,b.com");
        assert_eq!(no_data_message(&params), "🔍 No open ports found for a.com, b.com.");
    }
}
