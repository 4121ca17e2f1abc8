//! Katana crawler command: grammar, sectioned help, query, and result
//! rendering.

use chrono::Utc;

use super::command::{self, Parsed};

const MAX_INPUT_LENGTH: usize = 1000;
const MAX_PARAM_LENGTH: usize = 100;
const MAX_LIST_ENTRIES: usize = 50;

const DEFAULT_DEPTH: u32 = 3;
const DEFAULT_TIMEOUT: u32 = 10;
const MAX_TIMEOUT: u32 = 90;

const INTRO: &str = "[Katana](https://github.com/projectdiscovery/katana) is a fast crawler \
focused on execution in automation pipelines offering both headless and non-headless crawling.";

const HELP_PREFIX: &str = "```\nUsage:\n   katana [flags]\n\nFlags:\n";

const INPUT_SECTION: &str = "INPUT:\n  -u, -list string[]  target url / list to crawl\n";

const CONFIGURATION_SECTION: &str = "CONFIGURATION:\n  \
-jc, -js-crawl               enable endpoint parsing / crawling in javascript file\n  \
-iqp, -ignore-query-params   Ignore crawling same path with different query-param values\n  \
-timeout int                 time to wait for request in seconds (default 10)\n";

const HEADLESS_SECTION: &str =
    "HEADLESS:\n  -xhr, -xhr-extraction   extract xhr request url,method in jsonl output\n";

const SCOPE_SECTION: &str = "SCOPE:\n  \
-cs, -crawl-scope string[]        in scope url regex to be followed by crawler\n  \
-cos, -crawl-out-scope string[]   out of scope url regex to be excluded by crawler\n  \
-do, -display-out-scope           display external endpoint from scoped crawling\n";

const FILTER_SECTION: &str = "FILTER:\n  \
-mr, -match-regex string[]        regex or list of regex to match on output url (cli, file)\n  \
-fr, -filter-regex string[]       regex or list of regex to filter on output url (cli, file)\n  \
-em, -extension-match string[]    match output for given extension (eg, -em php,html,js)\n  \
-ef, -extension-filter string[]   filter output for given extension (eg, -ef png,css)\n  \
-mdc, -match-condition string     match response with dsl based condition\n  \
-fdc, -filter-condition string    filter response with dsl based condition\n";

/// Validated `/katana` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KatanaParams {
    pub urls: Vec<String>,
    pub depth: u32,
    pub js_crawl: bool,
    pub ignore_query_params: bool,
    pub xhr_extraction: bool,
    pub crawl_scope: Vec<String>,
    pub crawl_out_scope: Vec<String>,
    pub display_out_scope: bool,
    pub match_regex: Vec<String>,
    pub filter_regex: Vec<String>,
    pub extension_match: Vec<String>,
    pub extension_filter: Vec<String>,
    pub match_condition: String,
    pub filter_condition: String,
    pub timeout: u32,
}

impl Default for KatanaParams {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            depth: DEFAULT_DEPTH,
            js_crawl: false,
            ignore_query_params: false,
            xhr_extraction: false,
            crawl_scope: Vec::new(),
            crawl_out_scope: Vec::new(),
            display_out_scope: false,
            match_regex: Vec::new(),
            filter_regex: Vec::new(),
            extension_match: Vec::new(),
            extension_filter: Vec::new(),
            match_condition: String::new(),
            filter_condition: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn full_help() -> String {
    format!(
        "{INTRO}\n\n{HELP_PREFIX}{INPUT_SECTION}\n{CONFIGURATION_SECTION}\n{HEADLESS_SECTION}\n{SCOPE_SECTION}\n{FILTER_SECTION}```"
    )
}

/// Usage guide, optionally narrowed to one flag section.
pub fn help(section: Option<&str>) -> String {
    let Some(name) = section else {
        return full_help();
    };
    let body = match name.to_lowercase().as_str() {
        "input" => INPUT_SECTION,
        "configuration" => CONFIGURATION_SECTION,
        "headless" => HEADLESS_SECTION,
        "scope" => SCOPE_SECTION,
        "filter" => FILTER_SECTION,
        _ => return full_help(),
    };
    format!("{HELP_PREFIX}{body}```")
}

/// Parse the full text of a `/katana` command.
pub fn parse(input: &str) -> Parsed<KatanaParams> {
    if input.len() > MAX_INPUT_LENGTH {
        return Parsed::Error("Input command is too long".into());
    }

    let tokens: Vec<&str> = input.split_whitespace().skip(1).collect();
    for token in &tokens {
        if token.len() > MAX_PARAM_LENGTH {
            return Parsed::Error(format!("Parameter value too long: {token}"));
        }
    }
    if let Some(position) = tokens
        .iter()
        .position(|&token| token == "-h" || token == "-help")
    {
        let section = tokens
            .get(position + 1)
            .filter(|token| !token.starts_with('-'))
            .copied();
        return Parsed::Help(help(section));
    }

    let mut params = KatanaParams::default();
    let mut i = 0;
    while i < tokens.len() {
        let flag = tokens[i];
        match flag {
            "-u" | "-list" => {
                let values = command::take_values(&tokens, &mut i);
                if values.is_empty() {
                    return Parsed::Error(format!("🚨 No URL provided for '{flag}' flag"));
                }
                let mut parts = Vec::new();
                command::extend_csv(&mut parts, &values, MAX_LIST_ENTRIES);
                for part in &parts {
                    if !command::is_valid_url(part) {
                        return Parsed::Error(format!(
                            "🚨 Invalid URL provided for '{flag}' flag: {part}"
                        ));
                    }
                }
                params.urls.extend(parts);
            }
            "-d" | "-depth" => match command::take_value(&tokens, &mut i) {
                Some(value) if command::is_integer(value) => {
                    let Ok(depth) = value.parse::<u32>() else {
                        return Parsed::Error(format!(
                            "🚨 Invalid depth value for '{flag}' flag"
                        ));
                    };
                    params.depth = depth;
                }
                _ => {
                    return Parsed::Error(format!("🚨 Invalid depth value for '{flag}' flag"));
                }
            },
            "-jc" | "-js-crawl" => params.js_crawl = true,
            "-iqp" | "-ignore-query-params" => params.ignore_query_params = true,
            "-xhr" | "-xhr-extraction" => params.xhr_extraction = true,
            "-cs" | "-crawl-scope" => {
                let parts = match regex_list(&tokens, &mut i, flag, "crawl scope") {
                    Ok(parts) => parts,
                    Err(message) => return Parsed::Error(message),
                };
                params.crawl_scope.extend(parts);
            }
            "-cos" | "-crawl-out-scope" => {
                let parts = match regex_list(&tokens, &mut i, flag, "crawl out-scope") {
                    Ok(parts) => parts,
                    Err(message) => return Parsed::Error(message),
                };
                params.crawl_out_scope.extend(parts);
            }
            "-do" | "-display-out-scope" => params.display_out_scope = true,
            "-mr" | "-match-regex" => {
                let parts = match regex_list(&tokens, &mut i, flag, "match regex") {
                    Ok(parts) => parts,
                    Err(message) => return Parsed::Error(message),
                };
                params.match_regex.extend(parts);
            }
            "-fr" | "-filter-regex" => {
                let parts = match regex_list(&tokens, &mut i, flag, "filter regex") {
                    Ok(parts) => parts,
                    Err(message) => return Parsed::Error(message),
                };
                params.filter_regex.extend(parts);
            }
            "-em" | "-extension-match" => {
                let values = command::take_values(&tokens, &mut i);
                if values.is_empty() {
                    return Parsed::Error(format!(
                        "🚨 No extension match provided for '{flag}' flag"
                    ));
                }
                command::extend_csv(&mut params.extension_match, &values, MAX_LIST_ENTRIES);
            }
            "-ef" | "-extension-filter" => {
                let values = command::take_values(&tokens, &mut i);
                if values.is_empty() {
                    return Parsed::Error(format!(
                        "🚨 No extension filter provided for '{flag}' flag"
                    ));
                }
                command::extend_csv(&mut params.extension_filter, &values, MAX_LIST_ENTRIES);
            }
            "-mdc" | "-match-condition" => {
                let values = command::take_values(&tokens, &mut i);
                if values.is_empty() {
                    return Parsed::Error(format!(
                        "🚨 No match condition provided for '{flag}' flag"
                    ));
                }
                params.match_condition = values.join(" ");
            }
            "-fdc" | "-filter-condition" => {
                let values = command::take_values(&tokens, &mut i);
                if values.is_empty() {
                    return Parsed::Error(format!(
                        "🚨 No filter condition provided for '{flag}' flag"
                    ));
                }
                params.filter_condition = values.join(" ");
            }
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

    if params.urls.is_empty() {
        return Parsed::Error("🚨 Error: -u parameter is required.".into());
    }

    Parsed::Params(params)
}

/// Collect a comma-separable regex list for `flag`, validating each part.
fn regex_list(
    tokens: &[&str],
    index: &mut usize,
    flag: &str,
    what: &str,
) -> Result<Vec<String>, String> {
    let values = command::take_values(tokens, index);
    if values.is_empty() {
        return Err(format!("🚨 No {what} regex pattern provided for '{flag}' flag"));
    }
    let mut parts = Vec::new();
    command::extend_csv(&mut parts, &values, MAX_LIST_ENTRIES);
    for part in &parts {
        if !command::is_valid_regex(part) {
            return Err(format!(
                "🚨 Invalid {what} regex pattern for '{flag}' flag: {part}"
            ));
        }
    }
    Ok(parts)
}

fn encoded_csv(values: &[String]) -> String {
    values
        .iter()
        .map(|value| urlencoding::encode(value).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Query string for the scanning service.
pub fn build_query(params: &KatanaParams) -> String {
    let mut pairs: Vec<String> = params
        .urls
        .iter()
        .map(|url| format!("urls={}", urlencoding::encode(url)))
        .collect();
    if params.depth != DEFAULT_DEPTH {
        pairs.push(format!("depth={}", params.depth));
    }
    if params.js_crawl {
        pairs.push("jsCrawl=true".into());
    }
    if params.ignore_query_params {
        pairs.push("ignoreQueryParams=true".into());
    }
    if params.xhr_extraction {
        pairs.push("xhrExtraction=true".into());
    }
    if !params.crawl_scope.is_empty() {
        pairs.push(format!("crawlScope={}", encoded_csv(&params.crawl_scope)));
    }
    if !params.crawl_out_scope.is_empty() {
        pairs.push(format!(
            "crawlOutScope={}",
            encoded_csv(&params.crawl_out_scope)
        ));
    }
    if params.display_out_scope {
        pairs.push("displayOutScope=true".into());
    }
    if !params.match_regex.is_empty() {
        pairs.push(format!("matchRegex={}", encoded_csv(&params.match_regex)));
    }
    if !params.filter_regex.is_empty() {
        pairs.push(format!("filterRegex={}", encoded_csv(&params.filter_regex)));
    }
    if !params.extension_match.is_empty() {
        pairs.push(format!(
            "extensionMatch={}",
            encoded_csv(&params.extension_match)
        ));
    }
    if !params.extension_filter.is_empty() {
        pairs.push(format!(
            "extensionFilter={}",
            encoded_csv(&params.extension_filter)
        ));
    }
    if !params.match_condition.is_empty() {
        pairs.push(format!(
            "matchCondition={}",
            urlencoding::encode(&params.match_condition)
        ));
    }
    if !params.filter_condition.is_empty() {
        pairs.push(format!(
            "filterCondition={}",
            urlencoding::encode(&params.filter_condition)
        ));
    }
    if params.timeout != DEFAULT_TIMEOUT {
        pairs.push(format!("timeout={}", params.timeout));
    }
    pairs.join("&")
}

/// Prompt instructing the model to synthesize a `/katana` command.
pub fn synthesis_prompt(query: &str) -> String {
    format!(
        r#"Query: "{query}"

Based on this query, generate a command for the 'katana' tool, focusing on URL crawling and filtering. The command must start with 'katana' followed by the relevant flags. The -u flag is required to specify the target URL. Use other flags only when the request explicitly calls for them, and prefer the smallest set of flags that satisfies the request.

ALWAYS USE THIS FORMAT:
```json
{{ "command": "katana [flags]" }}
```
Replace '[flags]' with the actual flags and values.

Available flags:
- -u, -list string[]: Target URL or list to crawl (required).
- -d, -depth int: Maximum depth to crawl (default 3).
- -jc, -js-crawl: Enable endpoint parsing and crawling in JavaScript files.
- -iqp, -ignore-query-params: Ignore crawling the same path with different query-param values.
- -xhr, -xhr-extraction: Extract XHR request url and method in jsonl output.
- -cs, -crawl-scope string[]: In-scope URL regex to be followed by the crawler.
- -cos, -crawl-out-scope string[]: Out-of-scope URL regex to be excluded by the crawler.
- -do, -display-out-scope: Display external endpoints from scoped crawling.
- -mr, -match-regex string[]: Regex or list of regex to match on output URLs.
- -fr, -filter-regex string[]: Regex or list of regex to filter on output URLs.
- -em, -extension-match string[]: Match output for given extensions (eg, -em php,html,js).
- -ef, -extension-filter string[]: Filter output for given extensions (eg, -ef png,css).
- -mdc, -match-condition string: Match responses with a DSL-based condition.
- -fdc, -filter-condition string: Filter responses with a DSL-based condition.
- -timeout int: Time to wait for the request in seconds (default 10, maximum 90).

Example commands:
```json
{{ "command": "katana -u https://example.com" }}
```

```json
{{ "command": "katana -u https://example.com -d 5 -jc -em js,php" }}
```

Response:"#
    )
}

/// Render crawled URLs into the result block.
pub fn format_response(output: &str, params: &KatanaParams) -> String {
    let entries = super::clean_output_lines(output);
    format!(
        "## [Katana](https://github.com/projectdiscovery/katana) Scan Results\n\
         **Target**: \"{}\"\n\n\
         **Scan Date and Time**: {} (UTC) \n\n\
         ### Identified Urls:\n```\n{}\n```\n",
        params.urls.join(","),
        Utc::now().format("%m/%d/%Y, %r"),
        entries.join("\n"),
    )
}

/// Terminal message when the scan produced nothing.
pub fn no_data_message(params: &KatanaParams) -> String {
    format!("🔍 Didn't find anything for {}.", params.urls.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(input: &str) -> KatanaParams {
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
        let params = params("/katana -u https://example.com");
        assert_eq!(params.urls, ["https://example.com"]);
        assert_eq!(params.depth, DEFAULT_DEPTH);
        assert_eq!(params.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_full_command_round_trips_to_query() {
        let params =
            params("/katana -u https://example.com -d 5 -jc -em js,php -timeout 20");
        assert_eq!(
            build_query(&params),
            "urls=https%3A%2F%2Fexample.com&depth=5&jsCrawl=true&extensionMatch=js,php&timeout=20"
        );
    }

    #[test]
    fn test_multiple_urls_repeat_the_key() {
        let params = params("/katana -u https://a.com,https://b.com");
        assert_eq!(
            build_query(&params),
            "urls=https%3A%2F%2Fa.com&urls=https%3A%2F%2Fb.com"
        );
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert_eq!(
            error("/katana -u not_a_url"),
            "🚨 Invalid URL provided for '-u' flag: not_a_url"
        );
    }

    #[test]
    fn test_bare_host_is_accepted() {
        let params = params("/katana -u example.com");
        assert_eq!(params.urls, ["example.com"]);
    }

    #[test]
    fn test_invalid_scope_regex() {
        assert_eq!(
            error("/katana -u https://example.com -cs ([a-z"),
            "🚨 Invalid crawl scope regex pattern for '-cs' flag: ([a-z"
        );
    }

    #[test]
    fn test_match_condition_joins_tokens() {
        let params =
            params("/katana -u https://example.com -mdc status_code == 200");
        assert_eq!(params.match_condition, "status_code == 200");
    }

    #[test]
    fn test_timeout_cap() {
        assert_eq!(
            error("/katana -u https://example.com -timeout 120"),
            "🚨 Timeout value exceeds the maximum limit of 90 seconds"
        );
    }

    #[test]
    fn test_missing_target() {
        assert_eq!(error("/katana -jc"), "🚨 Error: -u parameter is required.");
    }

    #[test]
    fn test_full_help_lists_every_section() {
        let Parsed::Help(guide) = parse("/katana -h") else {
            panic!("expected help");
        };
        for heading in ["INPUT:", "CONFIGURATION:", "HEADLESS:", "SCOPE:", "FILTER:"] {
            assert!(guide.contains(heading), "missing {heading}");
        }
        assert!(guide.ends_with("```"));
    }

    #[test]
    fn test_sectioned_help_is_narrowed_and_fenced() {
        let Parsed::Help(guide) = parse("/katana -h scope") else {
            panic!("expected help");
        };
        assert!(guide.contains("SCOPE:"));
        assert!(!guide.contains("FILTER:"));
        assert!(guide.ends_with("```"));
    }

    #[test]
    fn test_oversized_parameter() {
        let long = "a".repeat(150);
        let message = error(&format!("/katana -u {long}"));
        assert_eq!(message, format!("Parameter value too long: {long}"));
    }

    #[test]
    fn test_no_data_message_has_no_quotes() {
        let params = params("/katana -u https://a.com");
        assert_eq!(no_data_message(&params), "🔍 Didn't find anything for https://a.com.");
    }
}
