//! Gau known-URL fetching command: grammar, help, query, and result
//! rendering.

use chrono::Utc;

use super::command::{self, Parsed};

const MAX_INPUT_LENGTH: usize = 2000;
const MAX_PARAM_LENGTH: usize = 500;
const MAX_LIST_ENTRIES: usize = 50;

/// Validated `/gau` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GauParams {
    pub target: String,
    pub subs: bool,
    pub from: String,
    pub to: String,
    pub providers: Vec<String>,
    pub blacklist: Vec<String>,
    pub filter_codes: Vec<String>,
    pub match_codes: Vec<String>,
    pub filter_types: Vec<String>,
    pub match_types: Vec<String>,
    pub remove_parameters: bool,
}

/// Usage guide shown for the help flag.
pub fn help() -> String {
    "[GAU (Get All URLs)](https://github.com/lc/gau) is a tool that fetches known URLs \
from AlienVault's Open Threat Exchange, the Wayback Machine, Common Crawl, and URLScan \
for any given domain.

    Usage:
       /gau [target] [flags]

    Flags:
    CONFIGURATION:
       -subs              include subdomains of target domain
       -from string       fetch URLs from date (format: YYYYMM)
       -to string         fetch URLs to date (format: YYYYMM)
       -providers string  list of providers to use (wayback, commoncrawl, otx, urlscan)
       -fp                remove different parameters of the same endpoint

    FILTER:
       -blacklist string  list of extensions to skip
       -fc string         list of status codes to filter
       -mc string         list of status codes to match
       -ft string         list of mime-types to filter
       -mt string         list of mime-types to match"
        .to_string()
}

fn is_yyyymm(value: &str) -> bool {
    value.len() == 6 && command::is_integer(value)
}

/// Parse the full text of a `/gau` command. The target is positional.
pub fn parse(input: &str) -> Parsed<GauParams> {
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

    let mut params = GauParams::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        if !token.starts_with('-') {
            if params.target.is_empty() {
                params.target = token.to_string();
            } else {
                return Parsed::Error("🚨 Only one target is allowed".into());
            }
            i += 1;
            continue;
        }
        match token {
            "-subs" => params.subs = true,
            "-fp" => params.remove_parameters = true,
            "-from" => match command::take_value(&tokens, &mut i) {
                Some(value) if is_yyyymm(value) => params.from = value.to_string(),
                _ => {
                    return Parsed::Error(
                        "🚨 Invalid date format for '-from' flag. Use YYYYMM".into(),
                    );
                }
            },
            "-to" => match command::take_value(&tokens, &mut i) {
                Some(value) if is_yyyymm(value) => params.to = value.to_string(),
                _ => {
                    return Parsed::Error(
                        "🚨 Invalid date format for '-to' flag. Use YYYYMM".into(),
                    );
                }
            },
            "-providers" => match command::take_value(&tokens, &mut i) {
                Some(value) => {
                    command::extend_csv(&mut params.providers, &[value.to_string()], MAX_LIST_ENTRIES);
                }
                None => {
                    return Parsed::Error("🚨 No providers provided for '-providers' flag".into());
                }
            },
            "-blacklist" => match command::take_value(&tokens, &mut i) {
                Some(value) => {
                    command::extend_csv(&mut params.blacklist, &[value.to_string()], MAX_LIST_ENTRIES);
                }
                None => {
                    return Parsed::Error("🚨 No extensions provided for '-blacklist' flag".into());
                }
            },
            "-fc" => match command::take_value(&tokens, &mut i) {
                Some(value) => {
                    let mut parts = Vec::new();
                    command::extend_csv(&mut parts, &[value.to_string()], MAX_LIST_ENTRIES);
                    for part in &parts {
                        if !command::is_integer(part) {
                            return Parsed::Error(format!("🚨 Invalid filter code value: {part}"));
                        }
                    }
                    params.filter_codes.extend(parts);
                }
                None => {
                    return Parsed::Error("🚨 No status codes provided for '-fc' flag".into());
                }
            },
            "-mc" => match command::take_value(&tokens, &mut i) {
                Some(value) => {
                    let mut parts = Vec::new();
                    command::extend_csv(&mut parts, &[value.to_string()], MAX_LIST_ENTRIES);
                    for part in &parts {
                        if !command::is_integer(part) {
                            return Parsed::Error(format!("🚨 Invalid match code value: {part}"));
                        }
                    }
                    params.match_codes.extend(parts);
                }
                None => {
                    return Parsed::Error("🚨 No status codes provided for '-mc' flag".into());
                }
            },
            "-ft" => match command::take_value(&tokens, &mut i) {
                Some(value) => {
                    command::extend_csv(&mut params.filter_types, &[value.to_string()], MAX_LIST_ENTRIES);
                }
                None => {
                    return Parsed::Error("🚨 No mime-types provided for '-ft' flag".into());
                }
            },
            "-mt" => match command::take_value(&tokens, &mut i) {
                Some(value) => {
                    command::extend_csv(&mut params.match_types, &[value.to_string()], MAX_LIST_ENTRIES);
                }
                None => {
                    return Parsed::Error("🚨 No mime-types provided for '-mt' flag".into());
                }
            },
            unknown => {
                return Parsed::Error(format!("🚨 Invalid or unrecognized flag: {unknown}"));
            }
        }
        i += 1;
    }

    if params.target.is_empty() {
        return Parsed::Error("🚨 Error: target parameter is required.".into());
    }

    Parsed::Params(params)
}

/// Query string for the scanning service.
pub fn build_query(params: &GauParams) -> String {
    let mut pairs = vec![format!("target={}", urlencoding::encode(&params.target))];
    if params.subs {
        pairs.push("subs=true".into());
    }
    if !params.from.is_empty() {
        pairs.push(format!("from={}", params.from));
    }
    if !params.to.is_empty() {
        pairs.push(format!("to={}", params.to));
    }
    if !params.providers.is_empty() {
        pairs.push(format!(
            "providers={}",
            urlencoding::encode(&params.providers.join(","))
        ));
    }
    if !params.blacklist.is_empty() {
        pairs.push(format!(
            "blacklist={}",
            urlencoding::encode(&params.blacklist.join(","))
        ));
    }
    if !params.filter_codes.is_empty() {
        pairs.push(format!("fc={}", params.filter_codes.join(",")));
    }
    if !params.match_codes.is_empty() {
        pairs.push(format!("mc={}", params.match_codes.join(",")));
    }
    if !params.filter_types.is_empty() {
        pairs.push(format!(
            "ft={}",
            urlencoding::encode(&params.filter_types.join(","))
        ));
    }
    if !params.match_types.is_empty() {
        pairs.push(format!(
            "mt={}",
            urlencoding::encode(&params.match_types.join(","))
        ));
    }
    if params.remove_parameters {
        pairs.push("fp=true".into());
    }
    pairs.join("&")
}

/// Prompt instructing the model to synthesize a `/gau` command.
pub fn synthesis_prompt(query: &str) -> String {
    format!(
        r#"Query: "{query}"

Based on this query, generate a command for the 'gau' tool, focusing on fetching known URLs for a domain. The command must start with 'gau' followed by the target domain and then any flags that reflect the user's request. The target domain is required and positional.

ALWAYS USE THIS FORMAT:
```json
{{ "command": "gau [target] [flags]" }}
```
Replace '[target]' with the domain and '[flags]' with the actual flags and values.

Available flags:
- -subs: Include subdomains of the target domain.
- -from string: Fetch URLs from date (format: YYYYMM).
- -to string: Fetch URLs to date (format: YYYYMM).
- -providers string: Providers to use (wayback, commoncrawl, otx, urlscan).
- -blacklist string: Extensions to skip.
- -fc string: Status codes to filter.
- -mc string: Status codes to match.
- -ft string: Mime-types to filter.
- -mt string: Mime-types to match.
- -fp: Remove different parameters of the same endpoint.

Example commands:
```json
{{ "command": "gau example.com" }}
```

```json
{{ "command": "gau example.com -subs -from 202301 -blacklist png,jpg" }}
```

Response:"#
    )
}

/// Render fetched URLs into the result block.
pub fn format_response(output: &str, params: &GauParams) -> String {
    let entries = super::clean_output_lines(output);
    format!(
        "## [Gau](https://github.com/lc/gau) Scan Results\n\
         **Target**: \"{}\"\n\n\
         **Scan Date and Time**: {} (UTC) \n\n\
         ### Identified URLs:\n```\n{}\n```\n",
        params.target,
        Utc::now().format("%m/%d/%Y, %r"),
        entries.join("\n"),
    )
}

/// Terminal message when the scan produced nothing.
pub fn no_data_message(params: &GauParams) -> String {
    format!("🔍 No URLs found for {}.", params.target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(input: &str) -> GauParams {
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
    fn test_positional_target() {
        let params = params("/gau example.com");
        assert_eq!(params.target, "example.com");
        assert_eq!(build_query(&params), "target=example.com");
    }

    #[test]
    fn test_target_after_flags() {
        let params = params("/gau -subs example.com");
        assert_eq!(params.target, "example.com");
        assert!(params.subs);
    }

    #[test]
    fn test_full_command_round_trips_to_query() {
        let params = params("/gau example.com -subs -from 202301 -to 202312 -blacklist png,jpg");
        assert_eq!(
            build_query(&params),
            "target=example.com&subs=true&from=202301&to=202312&blacklist=png%2Cjpg"
        );
    }

    #[test]
    fn test_invalid_date() {
        assert_eq!(
            error("/gau example.com -from 2023"),
            "🚨 Invalid date format for '-from' flag. Use YYYYMM"
        );
        assert_eq!(
            error("/gau example.com -to janury"),
            "🚨 Invalid date format for '-to' flag. Use YYYYMM"
        );
    }

    #[test]
    fn test_status_code_lists() {
        let params = params("/gau example.com -fc 404,500 -mc 200");
        assert_eq!(params.filter_codes, ["404", "500"]);
        assert_eq!(params.match_codes, ["200"]);
    }

    #[test]
    fn test_invalid_status_code() {
        assert_eq!(
            error("/gau example.com -fc 4xx"),
            "🚨 Invalid filter code value: 4xx"
        );
    }

    #[test]
    fn test_second_target_rejected() {
        assert_eq!(
            error("/gau example.com example.org"),
            "🚨 Only one target is allowed"
        );
    }

    #[test]
    fn test_missing_target() {
        assert_eq!(error("/gau -subs"), "🚨 Error: target parameter is required.");
    }

    #[test]
    fn test_help() {
        let Parsed::Help(guide) = parse("/gau -h") else {
            panic!("expected help");
        };
        assert!(guide.contains("Wayback Machine"));
        assert!(guide.contains("-providers string"));
    }
}
