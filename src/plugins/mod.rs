//! Slash-command scanning tools: detection, parsing, and scan execution.
//!
//! Every tool is a variant of [`Tool`]; adding one does not compile until
//! its parser, synthesis prompt, and formatter exist.

use std::time::Duration;

use tracing::error;

pub mod alterx;
pub mod command;
pub mod gau;
pub mod httpx;
pub mod invoker;
pub mod katana;
pub mod naabu;
pub mod stream;
pub mod subfinder;
pub mod synthesize;

pub use invoker::{InvokeError, ToolClient};
pub use stream::ScanStream;

use command::Parsed;
use stream::{PROCESSING_MESSAGE, STARTING_MESSAGE, await_with_heartbeat};

/// Returned when tool output carries its own failure markers.
pub const RUNTIME_ERROR_MESSAGE: &str =
    "🚨 An error occurred while running your query. Please try again or check your input.";

/// Generic transport failure shown to the user.
pub const SCAN_PROBLEM_MESSAGE: &str = "🚨 There was a problem during the scan. Please try again.";

/// The scanning tools the backend can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Subfinder,
    Katana,
    Httpx,
    Naabu,
    Gau,
    Alterx,
}

/// Guide order.
pub const TOOLS: &[Tool] = &[
    Tool::Subfinder,
    Tool::Katana,
    Tool::Httpx,
    Tool::Naabu,
    Tool::Gau,
    Tool::Alterx,
];

impl Tool {
    /// Stable identifier used in URLs and configuration.
    pub fn id(self) -> &'static str {
        match self {
            Tool::Subfinder => "subfinder",
            Tool::Katana => "katana",
            Tool::Httpx => "httpx",
            Tool::Naabu => "naabu",
            Tool::Gau => "gau",
            Tool::Alterx => "alterx",
        }
    }

    /// Name used in user-facing gate messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Tool::Subfinder => "Subfinder",
            Tool::Katana => "Katana",
            Tool::Httpx => "HttpX",
            Tool::Naabu => "Naabu",
            Tool::Gau => "Gau",
            Tool::Alterx => "Alterx",
        }
    }

    /// Label used in the tools guide.
    pub fn guide_label(self) -> &'static str {
        match self {
            Tool::Gau => "GAU (Get All URLs)",
            other => other.display_name(),
        }
    }

    pub fn repo_url(self) -> &'static str {
        match self {
            Tool::Subfinder => "https://github.com/projectdiscovery/subfinder",
            Tool::Katana => "https://github.com/projectdiscovery/katana",
            Tool::Httpx => "https://github.com/projectdiscovery/httpx",
            Tool::Naabu => "https://github.com/projectdiscovery/naabu",
            Tool::Gau => "https://github.com/lc/gau",
            Tool::Alterx => "https://github.com/projectdiscovery/alterx",
        }
    }

    /// One-line summary shown in the tools guide.
    pub fn description(self) -> &'static str {
        match self {
            Tool::Subfinder => {
                "A robust discovery tool for passive enumeration on valid subdomains."
            }
            Tool::Katana => {
                "A web crawling framework designed to navigate and parse for hidden details."
            }
            Tool::Httpx => {
                "An HTTP toolkit that probes services, web servers, and other valuable metadata."
            }
            Tool::Naabu => "A port scanning tool.",
            Tool::Gau => "A tool for fetching known URLs from multiple sources.",
            Tool::Alterx => "A fast and customizable subdomain wordlist generator.",
        }
    }

    pub fn command_prefix(self) -> &'static str {
        match self {
            Tool::Subfinder => "/subfinder",
            Tool::Katana => "/katana",
            Tool::Httpx => "/httpx",
            Tool::Naabu => "/naabu",
            Tool::Gau => "/gau",
            Tool::Alterx => "/alterx",
        }
    }

    /// How often to reassure the client while this tool's scan runs.
    /// Crawling and probing tools take longer between first bytes.
    pub fn heartbeat_interval(self) -> Duration {
        match self {
            Tool::Katana | Tool::Httpx | Tool::Naabu => Duration::from_secs(15),
            Tool::Subfinder | Tool::Gau | Tool::Alterx => Duration::from_secs(10),
        }
    }

    pub fn disabled_message(self) -> String {
        format!("The {} feature is disabled.", self.display_name())
    }

    /// True when `text` is this tool's command, i.e. the prefix followed
    /// by nothing or whitespace. `/katanax` matches no tool.
    pub fn matches_command(self, text: &str) -> bool {
        let trimmed = text.trim();
        match trimmed
            .strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(self.id()))
        {
            Some("") => true,
            Some(rest) => rest.starts_with(char::is_whitespace),
            None => false,
        }
    }

    /// Find the tool a message invokes, if any.
    pub fn detect(message: &str) -> Option<Tool> {
        if !message.trim_start().starts_with('/') {
            return None;
        }
        TOOLS.iter().copied().find(|tool| tool.matches_command(message))
    }

    pub fn from_id(id: &str) -> Option<Tool> {
        TOOLS.iter().copied().find(|tool| tool.id() == id)
    }
}

/// True when the message asks for the tools overview.
pub fn is_tools_command(message: &str) -> bool {
    message.trim() == "/tools"
}

/// The overview returned for `/tools`.
pub fn tools_guide() -> String {
    let mut guide = String::from("Tools available in Strix:");
    for tool in TOOLS {
        guide.push_str(&format!(
            "\n\n+ [{}]({}): {} Use {} -h for more details.",
            tool.guide_label(),
            tool.repo_url(),
            tool.description(),
            tool.command_prefix(),
        ));
    }
    guide.push_str(
        "\n\nTo use these tools, type the tool's command followed by -h to see specific \
         instructions and options for each tool.",
    );
    guide
}

/// Normalize raw service output: strip server-sent-event framing and
/// carriage returns, and drop blank lines.
pub fn clean_output_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .map(|line| line.strip_prefix("data: ").unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// A parsed scan ready to run against the plugin service.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanJob {
    Subfinder(subfinder::SubfinderParams),
    Katana(katana::KatanaParams),
    Httpx(httpx::HttpxParams),
    Naabu(naabu::NaabuParams),
    Gau(gau::GauParams),
    Alterx(alterx::AlterxParams),
}

/// Outcome of parsing a tool command: a runnable job, or text to return
/// to the user as-is (help or a validation error).
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    Run(ScanJob),
    Reply(String),
}

/// Parse `input` with the grammar of `tool`.
pub fn prepare(tool: Tool, input: &str) -> Prepared {
    fn fold<P>(parsed: Parsed<P>, wrap: impl FnOnce(P) -> ScanJob) -> Prepared {
        match parsed {
            Parsed::Params(params) => Prepared::Run(wrap(params)),
            Parsed::Help(text) | Parsed::Error(text) => Prepared::Reply(text),
        }
    }
    match tool {
        Tool::Subfinder => fold(subfinder::parse(input), ScanJob::Subfinder),
        Tool::Katana => fold(katana::parse(input), ScanJob::Katana),
        Tool::Httpx => fold(httpx::parse(input), ScanJob::Httpx),
        Tool::Naabu => fold(naabu::parse(input), ScanJob::Naabu),
        Tool::Gau => fold(gau::parse(input), ScanJob::Gau),
        Tool::Alterx => fold(alterx::parse(input), ScanJob::Alterx),
    }
}

/// Prompt for turning a natural-language request into a tool command.
pub fn synthesis_prompt(tool: Tool, query: &str) -> String {
    match tool {
        Tool::Subfinder => subfinder::synthesis_prompt(query),
        Tool::Katana => katana::synthesis_prompt(query),
        Tool::Httpx => httpx::synthesis_prompt(query),
        Tool::Naabu => naabu::synthesis_prompt(query),
        Tool::Gau => gau::synthesis_prompt(query),
        Tool::Alterx => alterx::synthesis_prompt(query),
    }
}

impl ScanJob {
    pub fn tool(&self) -> Tool {
        match self {
            ScanJob::Subfinder(_) => Tool::Subfinder,
            ScanJob::Katana(_) => Tool::Katana,
            ScanJob::Httpx(_) => Tool::Httpx,
            ScanJob::Naabu(_) => Tool::Naabu,
            ScanJob::Gau(_) => Tool::Gau,
            ScanJob::Alterx(_) => Tool::Alterx,
        }
    }

    pub fn query(&self) -> String {
        match self {
            ScanJob::Subfinder(params) => subfinder::build_query(params),
            ScanJob::Katana(params) => katana::build_query(params),
            ScanJob::Httpx(params) => httpx::build_query(params),
            ScanJob::Naabu(params) => naabu::build_query(params),
            ScanJob::Gau(params) => gau::build_query(params),
            ScanJob::Alterx(params) => alterx::build_query(params),
        }
    }

    pub fn format_output(&self, output: &str) -> String {
        match self {
            ScanJob::Subfinder(params) => subfinder::format_response(output, params),
            ScanJob::Katana(params) => katana::format_response(output, params),
            ScanJob::Httpx(params) => httpx::format_response(output, params),
            ScanJob::Naabu(params) => naabu::format_response(output, params),
            ScanJob::Gau(params) => gau::format_response(output, params),
            ScanJob::Alterx(params) => alterx::format_response(output, params),
        }
    }

    pub fn no_data_message(&self) -> String {
        match self {
            ScanJob::Subfinder(params) => subfinder::no_data_message(params),
            ScanJob::Katana(params) => katana::no_data_message(params),
            ScanJob::Httpx(params) => httpx::no_data_message(params),
            ScanJob::Naabu(params) => naabu::no_data_message(params),
            ScanJob::Gau(params) => gau::no_data_message(params),
            ScanJob::Alterx(params) => alterx::no_data_message(params),
        }
    }
}

/// Tool binaries report their own failures on stdout.
fn output_signals_failure(output: &str) -> bool {
    output.contains("Error executing") && output.contains("Error reading output file")
}

fn scan_error_text(err: &InvokeError) -> String {
    match err {
        InvokeError::Request(_) => SCAN_PROBLEM_MESSAGE.to_string(),
        other => format!("🚨 Error: {other}"),
    }
}

/// Execute a prepared scan end to end, writing progress and the final
/// result to `stream`. `echo` is sent first when the command came from
/// the model rather than the user.
pub async fn run_scan(job: ScanJob, client: &ToolClient, stream: ScanStream, echo: Option<String>) {
    if let Some(text) = echo {
        stream.progress(text).await;
    }
    stream.progress(STARTING_MESSAGE).await;

    let tool = job.tool();
    let invocation = client.invocation(tool, &job.query());
    let result =
        await_with_heartbeat(&stream, tool.heartbeat_interval(), client.invoke(&invocation)).await;

    let output = match result {
        Ok(output) => output,
        Err(err) => {
            error!(tool = tool.id(), %err, "scan failed");
            stream.fail(scan_error_text(&err)).await;
            return;
        }
    };

    if output_signals_failure(&output) {
        stream.fail(RUNTIME_ERROR_MESSAGE).await;
        return;
    }
    if output.trim().is_empty() {
        stream.progress(job.no_data_message()).await;
        stream.finish().await;
        return;
    }

    stream.progress(PROCESSING_MESSAGE).await;
    stream.chunk(job.format_output(&output)).await;
    stream.finish().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Json;
    use axum::Router;
    use axum::routing::get;
    use serde_json::json;

    #[test]
    fn test_detect_matches_exact_prefix_only() {
        assert_eq!(Tool::detect("/subfinder -d example.com"), Some(Tool::Subfinder));
        assert_eq!(Tool::detect("  /katana -u https://a.com"), Some(Tool::Katana));
        assert_eq!(Tool::detect("/katana"), Some(Tool::Katana));
        assert_eq!(Tool::detect("/katanax -u https://a.com"), None);
        assert_eq!(Tool::detect("scan example.com for me"), None);
        assert_eq!(Tool::detect("/unknown"), None);
    }

    #[test]
    fn test_tools_command_detection() {
        assert!(is_tools_command("/tools"));
        assert!(is_tools_command("  /tools  "));
        assert!(!is_tools_command("/toolsx"));
        assert!(!is_tools_command("tools"));
    }

    #[test]
    fn test_from_id_round_trips() {
        for tool in TOOLS {
            assert_eq!(Tool::from_id(tool.id()), Some(*tool));
        }
        assert_eq!(Tool::from_id("nmap"), None);
    }

    #[test]
    fn test_guide_lists_every_tool() {
        let guide = tools_guide();
        assert!(guide.starts_with("Tools available in Strix:"));
        for tool in TOOLS {
            assert!(guide.contains(tool.guide_label()), "missing {}", tool.id());
            assert!(guide.contains(tool.repo_url()));
        }
        assert!(guide.contains("GAU (Get All URLs)"));
        assert!(guide.ends_with("options for each tool."));
    }

    #[test]
    fn test_clean_output_lines_strips_framing() {
        let raw = "data: a.example.com\r\n\nb.example.com\ndata: \n";
        assert_eq!(clean_output_lines(raw), ["a.example.com", "b.example.com"]);
    }

    #[test]
    fn test_prepare_folds_errors_into_replies() {
        match prepare(Tool::Subfinder, "/subfinder") {
            Prepared::Reply(text) => assert_eq!(text, "🚨 Error: -d parameter is required."),
            other => panic!("expected reply, got {other:?}"),
        }
        match prepare(Tool::Naabu, "/naabu -h") {
            Prepared::Reply(text) => assert!(text.contains("Usage:")),
            other => panic!("expected reply, got {other:?}"),
        }
        match prepare(Tool::Alterx, "/alterx -l api.example.com") {
            Prepared::Run(job) => assert_eq!(job.tool(), Tool::Alterx),
            other => panic!("expected job, got {other:?}"),
        }
    }

    #[test]
    fn test_output_failure_markers_must_both_appear() {
        assert!(output_signals_failure(
            "Error executing Katana command: exit 1\nError reading output file"
        ));
        assert!(!output_signals_failure("Error executing Katana command"));
        assert!(!output_signals_failure("https://example.com/login"));
    }

    #[test]
    fn test_disabled_message() {
        assert_eq!(Tool::Httpx.disabled_message(), "The HttpX feature is disabled.");
    }

    async fn serve_output(output: &'static str) -> String {
        let app = Router::new().route(
            "/api/chat/plugins/{tool}",
            get(move || async move { Json(json!({ "output": output })) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn collect(body: axum::body::Body) -> String {
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn alterx_job() -> ScanJob {
        match prepare(Tool::Alterx, "/alterx -l api.example.com") {
            Prepared::Run(job) => job,
            other => panic!("expected job, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_scan_formats_successful_output() {
        let base = serve_output("api-dev.example.com\napi-staging.example.com").await;
        let client = ToolClient::new(&base, "secret", "", 30);
        let (stream, body) = ScanStream::channel();
        run_scan(alterx_job(), &client, stream, Some("alterx -l api.example.com".into())).await;

        let text = collect(body).await;
        assert!(text.contains("alterx -l api.example.com"));
        assert!(text.contains(STARTING_MESSAGE));
        assert!(text.contains(PROCESSING_MESSAGE));
        assert!(text.contains("### Generated Subdomains:"));
        assert!(text.contains("api-dev.example.com"));
    }

    #[tokio::test]
    async fn test_run_scan_reports_empty_results() {
        let base = serve_output("").await;
        let client = ToolClient::new(&base, "secret", "", 30);
        let (stream, body) = ScanStream::channel();
        run_scan(alterx_job(), &client, stream, None).await;

        let text = collect(body).await;
        assert!(text.contains("🔍 Unable to generate wordlist for \"api.example.com\""));
        assert!(!text.contains(PROCESSING_MESSAGE));
    }

    #[tokio::test]
    async fn test_run_scan_detects_embedded_tool_failure() {
        let base =
            serve_output("Error executing Katana command: exit 1\nError reading output file").await;
        let client = ToolClient::new(&base, "secret", "", 30);
        let (stream, body) = ScanStream::channel();
        run_scan(alterx_job(), &client, stream, None).await;

        let text = collect(body).await;
        assert!(text.contains(RUNTIME_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_run_scan_reports_transport_failure() {
        let client = ToolClient::new("http://127.0.0.1:1", "secret", "", 5);
        let (stream, body) = ScanStream::channel();
        run_scan(alterx_job(), &client, stream, None).await;

        let text = collect(body).await;
        assert!(text.contains(STARTING_MESSAGE));
        assert!(text.contains(SCAN_PROBLEM_MESSAGE));
    }
}
