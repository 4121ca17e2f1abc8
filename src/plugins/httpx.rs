//! HttpX probing command: grammar, sectioned help, query, and result
//! rendering.

use chrono::Utc;

use super::command::{self, Parsed};

const MAX_INPUT_LENGTH: usize = 2000;
const MAX_PARAM_LENGTH: usize = 100;
const MAX_LIST_ENTRIES: usize = 50;

const DEFAULT_TIMEOUT: u32 = 15;
const MAX_TIMEOUT: u32 = 90;

const INTRO: &str = "[HttpX](https://github.com/projectdiscovery/httpx) is a fast and \
multi-purpose HTTP toolkit that allows running multiple probes using the retryablehttp \
library.";

const HELP_PREFIX: &str = "```\nUsage:\n   httpx [flags]\n\nFlags:\n";

const INPUT_SECTION: &str = "INPUT:\n  -u, -list string[]  input target host(s) to probe\n";

const PROBES_SECTION: &str = "PROBES:\n  \
-sc, -status-code     display response status-code\n  \
-cl, -content-length  display response content-length\n  \
-ct, -content-type    display response content-type\n  \
-location             display response redirect location\n  \
-title                display page title\n  \
-server, -web-server  display server name\n  \
-td, -tech-detect     display technology in use based on wappalyzer dataset\n  \
-method               display http request method\n  \
-ip                   display host ip\n  \
-cname                display host cname\n  \
-asn                  display host asn information\n  \
-cdn                  display cdn/waf in use\n  \
-probe                display probe status\n";

const MATCHERS_SECTION: &str = "MATCHERS:\n  \
-mc, -match-code string     match response with specified status code (-mc 200,302)\n  \
-ms, -match-string string   match response with specified string (-ms admin)\n  \
-mr, -match-regex string    match response with specified regex (-mr admin)\n";

const FILTERS_SECTION: &str = "FILTERS:\n  \
-fc, -filter-code string     filter response with specified status code (-fc 403,401)\n  \
-fs, -filter-string string   filter response with specified string (-fs admin)\n  \
-fr, -filter-regex string    filter response with specified regex (-fr admin)\n";

const CONFIGURATIONS_SECTION: &str =
    "CONFIGURATIONS:\n  -timeout int   timeout in seconds (default 15)\n";

/// Validated `/httpx` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpxParams {
    pub urls: Vec<String>,
    pub status_code: bool,
    pub content_length: bool,
    pub content_type: bool,
    pub location: bool,
    pub title: bool,
    pub web_server: bool,
    pub tech_detect: bool,
    pub method: bool,
    pub ip: bool,
    pub cname: bool,
    pub asn: bool,
    pub cdn: bool,
    pub probe: bool,
    pub match_code: Vec<String>,
    pub match_string: String,
    pub match_regex: String,
    pub filter_code: Vec<String>,
    pub filter_string: String,
    pub filter_regex: String,
    pub timeout: u32,
}

impl Default for HttpxParams {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            status_code: false,
            content_length: false,
            content_type: false,
            location: false,
            title: false,
            web_server: false,
            tech_detect: false,
            method: false,
            ip: false,
            cname: false,
            asn: false,
            cdn: false,
            probe: false,
            match_code: Vec::new(),
            match_string: String::new(),
            match_regex: String::new(),
            filter_code: Vec::new(),
            filter_string: String::new(),
            filter_regex: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn full_help() -> String {
    format!(
        "{INTRO}\n\n{HELP_PREFIX}{INPUT_SECTION}\n{PROBES_SECTION}\n{MATCHERS_SECTION}\n{FILTERS_SECTION}\n{CONFIGURATIONS_SECTION}```"
    )
}

/// Usage guide, optionally narrowed to one flag section.
pub fn help(section: Option<&str>) -> String {
    let Some(name) = section else {
        return full_help();
    };
    let body = match name.to_lowercase().as_str() {
        "input" => INPUT_SECTION,
        "probes" => PROBES_SECTION,
        "matchers" => MATCHERS_SECTION,
        "filters" => FILTERS_SECTION,
        "configurations" => CONFIGURATIONS_SECTION,
        _ => return full_help(),
    };
    format!("{HELP_PREFIX}{body}```")
}

/// Parse the full text of an `/httpx` command.
pub fn parse(input: &str) -> Parsed<HttpxParams> {
    if input.len() > MAX_INPUT_LENGTH {
        return Parsed::Error("🚨 Input command is too long".into());
    }

    let tokens: Vec<&str> = input.split_whitespace().skip(1).collect();
    for token in &tokens {
        if token.len() > MAX_PARAM_LENGTH {
            return Parsed::Error(format!("🚨 Parameter value too long: {token}"));
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

    let mut params = HttpxParams::default();
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
            "-sc" | "-status-code" => params.status_code = true,
            "-cl" | "-content-length" => params.content_length = true,
            "-ct" | "-content-type" => params.content_type = true,
            "-location" => params.location = true,
            "-title" => params.title = true,
            "-server" | "-web-server" => params.web_server = true,
            "-td" | "-tech-detect" => params.tech_detect = true,
            "-method" => params.method = true,
            "-ip" => params.ip = true,
            "-cname" => params.cname = true,
            "-asn" => params.asn = true,
            "-cdn" => params.cdn = true,
            "-probe" => params.probe = true,
            "-mc" | "-match-code" => {
                let values = command::take_values(&tokens, &mut i);
                if values.is_empty() {
                    return Parsed::Error(format!("🚨 No match code provided for '{flag}' flag"));
                }
                let mut parts = Vec::new();
                command::extend_csv(&mut parts, &values, MAX_LIST_ENTRIES);
                for part in &parts {
                    if !command::is_integer(part) {
                        return Parsed::Error(format!("🚨 Invalid match code value: {part}"));
                    }
                }
                params.match_code.extend(parts);
            }
            "-ms" | "-match-string" => match command::take_value(&tokens, &mut i) {
                Some(value) => params.match_string = value.to_string(),
                None => {
                    return Parsed::Error(format!("🚨 No match string provided for '{flag}' flag"));
                }
            },
            "-mr" | "-match-regex" => match command::take_value(&tokens, &mut i) {
                Some(value) if command::is_valid_regex(value) => {
                    params.match_regex = value.to_string();
                }
                Some(value) => {
                    return Parsed::Error(format!(
                        "🚨 Invalid match regex for '{flag}' flag: {value}"
                    ));
                }
                None => {
                    return Parsed::Error(format!("🚨 No match regex provided for '{flag}' flag"));
                }
            },
            "-fc" | "-filter-code" => {
                let values = command::take_values(&tokens, &mut i);
                if values.is_empty() {
                    return Parsed::Error(format!("🚨 No filter code provided for '{flag}' flag"));
                }
                let mut parts = Vec::new();
                command::extend_csv(&mut parts, &values, MAX_LIST_ENTRIES);
                for part in &parts {
                    if !command::is_integer(part) {
                        return Parsed::Error(format!("🚨 Invalid filter code value: {part}"));
                    }
                }
                params.filter_code.extend(parts);
            }
            "-fs" | "-filter-string" => match command::take_value(&tokens, &mut i) {
                Some(value) => params.filter_string = value.to_string(),
                None => {
                    return Parsed::Error(format!(
                        "🚨 No filter string provided for '{flag}' flag"
                    ));
                }
            },
            "-fr" | "-filter-regex" => match command::take_value(&tokens, &mut i) {
                Some(value) if command::is_valid_regex(value) => {
                    params.filter_regex = value.to_string();
                }
                Some(value) => {
                    return Parsed::Error(format!(
                        "🚨 Invalid filter regex for '{flag}' flag: {value}"
                    ));
                }
                None => {
                    return Parsed::Error(format!("🚨 No filter regex provided for '{flag}' flag"));
                }
            },
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

/// Query string for the scanning service.
pub fn build_query(params: &HttpxParams) -> String {
    let mut pairs: Vec<String> = params
        .urls
        .iter()
        .map(|url| format!("urls={}", urlencoding::encode(url)))
        .collect();
    let probes: [(&str, bool); 13] = [
        ("statusCode", params.status_code),
        ("contentLength", params.content_length),
        ("contentType", params.content_type),
        ("location", params.location),
        ("title", params.title),
        ("webServer", params.web_server),
        ("techDetect", params.tech_detect),
        ("method", params.method),
        ("ip", params.ip),
        ("cname", params.cname),
        ("asn", params.asn),
        ("cdn", params.cdn),
        ("probe", params.probe),
    ];
    for (key, enabled) in probes {
        if enabled {
            pairs.push(format!("{key}=true"));
        }
    }
    if !params.match_code.is_empty() {
        pairs.push(format!("matchCode={}", params.match_code.join(",")));
    }
    if !params.match_string.is_empty() {
        pairs.push(format!(
            "matchString={}",
            urlencoding::encode(&params.match_string)
        ));
    }
    if !params.match_regex.is_empty() {
        pairs.push(format!(
            "matchRegex={}",
            urlencoding::encode(&params.match_regex)
        ));
    }
    if !params.filter_code.is_empty() {
        pairs.push(format!("filterCode={}", params.filter_code.join(",")));
    }
    if !params.filter_string.is_empty() {
        pairs.push(format!(
            "filterString={}",
            urlencoding::encode(&params.filter_string)
        ));
    }
    if !params.filter_regex.is_empty() {
        pairs.push(format!(
            "filterRegex={}",
            urlencoding::encode(&params.filter_regex)
        ));
    }
    if params.timeout != DEFAULT_TIMEOUT {
        pairs.push(format!("timeout={}", params.timeout));
    }
    pairs.join("&")
}

/// Prompt instructing the model to synthesize an `/httpx` command.
pub fn synthesis_prompt(query: &str) -> String {
    format!(
        r#"Query: "{query}"

Based on this query, generate a command for the 'httpx' tool, focusing on HTTP probing of hosts. The command must start with 'httpx' followed by the relevant flags. The -u flag is required to specify the target host or list of hosts. Add probe, matcher, and filter flags only when the request asks for that information.

ALWAYS USE THIS FORMAT:
```json
{{ "command": "httpx [flags]" }}
```
Replace '[flags]' with the actual flags and values.

Available flags:
- -u, -list string[]: Target host(s) to probe (required).
- -sc, -status-code: Display response status-code.
- -cl, -content-length: Display response content-length.
- -ct, -content-type: Display response content-type.
- -location: Display response redirect location.
- -title: Display page title.
- -server, -web-server: Display server name.
- -td, -tech-detect: Display technology in use.
- -method: Display http request method.
- -ip: Display host ip.
- -cname: Display host cname.
- -asn: Display host asn information.
- -cdn: Display cdn/waf in use.
- -probe: Display probe status.
- -mc, -match-code string: Match responses with specified status codes (-mc 200,302).
- -ms, -match-string string: Match responses containing a string.
- -mr, -match-regex string: Match responses against a regex.
- -fc, -filter-code string: Filter responses with specified status codes (-fc 403,401).
- -fs, -filter-string string: Filter responses containing a string.
- -fr, -filter-regex string: Filter responses against a regex.
- -timeout int: Timeout in seconds (default 15, maximum 90).

Example commands:
```json
{{ "command": "httpx -u example.com -sc -title" }}
```

```json
{{ "command": "httpx -u example.com,example.org -td -server -mc 200" }}
```

Response:"#
    )
}

/// Render probe results into the result block.
pub fn format_response(output: &str, params: &HttpxParams) -> String {
    let entries = super::clean_output_lines(output);
    format!(
        "## [HttpX](https://github.com/projectdiscovery/httpx) Scan Results\n\
         **Target**: \"{}\"\n\n\
         **Scan Date and Time**: {} (UTC) \n\n\
         ### Results:\n```\n{}\n```\n",
        params.urls.join(","),
        Utc::now().format("%m/%d/%Y, %r"),
        entries.join("\n"),
    )
}

/// Terminal message when the scan produced nothing.
pub fn no_data_message(params: &HttpxParams) -> String {
    format!("🔍 Didn't find anything for {}.", params.urls.join(", "))
}
