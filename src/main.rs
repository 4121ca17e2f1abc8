use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use config::{Config, Environment, File, FileFormat};
use log::{LevelFilter, debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use strix::api::{AppState, ChatState, create_router};
use strix::plugins::{TOOLS, Tool, ToolClient};
use strix::provider::ProviderClient;
use strix::retrieval::{RetrievalSettings, VectorClient};
use strix::status::StatusClient;

const APP_NAME: &str = "strix";

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_main(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging()?;
    debug!("resolved paths: {:#?}", ctx.paths);

    match cli.command {
        Command::Serve(cmd) => async_main(ctx, cmd),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Strix - security assistant chat backend.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    debug: bool,
    /// Enable trace logging (overrides other levels)
    #[arg(long, global = true)]
    trace: bool,
    /// Output machine readable JSON
    #[arg(long, global = true, conflicts_with = "yaml")]
    json: bool,
    /// Output machine readable YAML
    #[arg(long, global = true)]
    yaml: bool,
    /// Disable ANSI colors in output
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    no_color: bool,
    /// Control color output (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    color: ColorOption,
    /// Do not change anything on disk
    #[arg(long = "dry-run", global = true)]
    dry_run: bool,
    /// Assume "yes" for interactive prompts
    #[arg(short = 'y', long = "yes", alias = "force", global = true)]
    assume_yes: bool,
    /// Emit additional diagnostics for troubleshooting
    #[arg(long = "diagnostics", global = true)]
    diagnostics: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Create config directories and default files
    Init(InitCommand),
    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[derive(Debug, Clone, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration
    Show,
    /// Print the resolved config file path
    Path,
    /// Regenerate the default configuration file
    Reset,
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let paths = AppPaths::discover(common.config.clone())?;
        let config = load_or_init_config(&paths, &common)?;
        Ok(Self {
            common,
            paths,
            config,
        })
    }

    fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }

        let level = match self.effective_log_level() {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        };

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("strix={level},tower_http={level}")));

        // Use JSON output if --json flag is set, otherwise pretty format
        if self.common.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .ok();
        } else {
            let force_color = matches!(self.common.color, ColorOption::Always)
                || env::var_os("FORCE_COLOR").is_some();
            let disable_color = self.common.no_color
                || matches!(self.common.color, ColorOption::Never)
                || env::var_os("NO_COLOR").is_some()
                || (!force_color && !io::stderr().is_terminal());

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(!disable_color)
                        .with_target(self.common.diagnostics)
                        .with_file(self.common.diagnostics)
                        .with_line_number(self.common.diagnostics),
                )
                .try_init()
                .ok();
        }

        // Also init env_logger for compatibility with log crate users
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        builder.filter_level(self.effective_log_level());
        builder.try_init().ok();

        Ok(())
    }

    fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => configured_log_level(&self.config.logging.level),
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

fn configured_log_level(level: &str) -> LevelFilter {
    match level {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

#[derive(Debug, Clone)]
struct AppPaths {
    config_file: PathBuf,
}

impl AppPaths {
    fn discover(override_path: Option<PathBuf>) -> Result<Self> {
        let config_file = match override_path {
            Some(path) => {
                let expanded = expand_path(path)?;
                if expanded.is_dir() {
                    expanded.join("config.toml")
                } else {
                    expanded
                }
            }
            None => default_config_dir()?.join("config.toml"),
        };

        if config_file.parent().is_none() {
            return Err(anyhow!("invalid config file path: {config_file:?}"));
        }

        Ok(Self { config_file })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct AppConfig {
    logging: LoggingConfig,
    server: ServerConfig,
    chat: ChatConfig,
    provider: ProviderConfig,
    status: StatusConfig,
    retrieval: RetrievalConfig,
    plugins: PluginsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
            chat: ChatConfig::default(),
            provider: ProviderConfig::default(),
            status: StatusConfig::default(),
            retrieval: RetrievalConfig::default(),
            plugins: PluginsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct LoggingConfig {
    level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ServerConfig {
    /// Host address to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Origins allowed by CORS; empty denies all cross-origin requests
    allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ChatConfig {
    /// System prompt prepended to every conversation
    system_prompt: String,
    /// Instructions inserted ahead of retrieved context
    context_prompt: String,
    /// Sampling temperature when the request does not set one
    default_temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let defaults = ChatState::default();
        Self {
            system_prompt: defaults.system_prompt,
            context_prompt: defaults.context_prompt,
            default_temperature: defaults.default_temperature,
        }
    }
}

/// OpenAI-compatible model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ProviderConfig {
    /// Base URL of the provider API
    base_url: String,
    /// API key sent as a bearer token
    api_key: String,
    /// Model used for assistant conversations
    chat_model: String,
    /// Model used for retrieval embeddings
    embedding_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            chat_model: "gpt-3.5-turbo".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
        }
    }
}

/// External user-status and rate-limit service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct StatusConfig {
    /// Whether user status checks are performed
    enabled: bool,
    /// Endpoint consulted before each chat request
    user_status_url: String,
    /// Endpoint consulted before each tool invocation
    rate_limit_url: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user_status_url: String::new(),
            rate_limit_url: String::new(),
        }
    }
}

/// Vector index configuration for context retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RetrievalConfig {
    /// Whether assistant prompts are augmented with retrieved context
    enabled: bool,
    /// Vector index query endpoint
    endpoint: String,
    /// API key for the vector index
    api_key: String,
    /// Namespace queried within the index
    namespace: String,
    /// Number of matches requested per query
    top_k: usize,
    min_score: f32,
    min_matches: usize,
    max_context_chars: usize,
    min_query_chars: usize,
    max_query_chars: usize,
    english_threshold_pct: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let defaults = RetrievalSettings::default();
        Self {
            enabled: false,
            endpoint: String::new(),
            api_key: String::new(),
            namespace: String::new(),
            top_k: 4,
            min_score: defaults.min_score,
            min_matches: defaults.min_matches,
            max_context_chars: defaults.max_context_chars,
            min_query_chars: defaults.min_query_chars,
            max_query_chars: defaults.max_query_chars,
            english_threshold_pct: defaults.english_threshold_pct,
        }
    }
}

/// Scanning tool service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct PluginsConfig {
    /// Base URL of the tool service
    base_url: String,
    /// Bearer token sent with each tool request
    auth_token: String,
    /// Value for the Host header on tool requests
    virtual_host: String,
    /// Per-scan request timeout in seconds
    request_timeout_secs: u64,
    /// Tool ids users may invoke; defaults to all tools
    enabled_tools: Vec<String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_token: String::new(),
            virtual_host: String::new(),
            request_timeout_secs: 120,
            enabled_tools: TOOLS.iter().map(|tool| tool.id().to_string()).collect(),
        }
    }
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !(cmd.force || ctx.common.assume_yes) {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            ctx.paths.config_file.display()
        ));
    }

    if ctx.common.dry_run {
        info!(
            "dry-run: would write default config to {}",
            ctx.paths.config_file.display()
        );
        return Ok(());
    }

    write_default_config(&ctx.paths.config_file)
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ctx.config)
                        .context("serializing config to JSON")?
                );
            } else if ctx.common.yaml {
                println!(
                    "{}",
                    serde_yaml::to_string(&ctx.config).context("serializing config to YAML")?
                );
            } else {
                println!("{:#?}", ctx.config);
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Reset => {
            if ctx.common.dry_run {
                info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
                return Ok(());
            }
            write_default_config(&ctx.paths.config_file)
        }
    }
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}

async fn handle_serve(ctx: &RuntimeContext, cmd: ServeCommand) -> Result<()> {
    info!("Starting chat backend server...");

    let cfg = &ctx.config;

    if cfg.provider.api_key.is_empty() {
        warn!(
            "provider.api_key is not set (set it in config.toml or STRIX__PROVIDER__API_KEY); upstream requests will fail"
        );
    }

    let provider = ProviderClient::new(
        &cfg.provider.base_url,
        &cfg.provider.api_key,
        &cfg.provider.chat_model,
        &cfg.provider.embedding_model,
    );

    let tools = ToolClient::new(
        &cfg.plugins.base_url,
        &cfg.plugins.auth_token,
        &cfg.plugins.virtual_host,
        cfg.plugins.request_timeout_secs,
    );

    let chat = ChatState {
        system_prompt: cfg.chat.system_prompt.clone(),
        context_prompt: cfg.chat.context_prompt.clone(),
        default_temperature: cfg.chat.default_temperature,
    };

    let retrieval = RetrievalSettings {
        min_query_chars: cfg.retrieval.min_query_chars,
        max_query_chars: cfg.retrieval.max_query_chars,
        english_threshold_pct: cfg.retrieval.english_threshold_pct,
        min_matches: cfg.retrieval.min_matches,
        min_score: cfg.retrieval.min_score,
        max_context_chars: cfg.retrieval.max_context_chars,
    };

    let enabled_tools: Vec<Tool> = cfg
        .plugins
        .enabled_tools
        .iter()
        .filter_map(|id| {
            let tool = Tool::from_id(id);
            if tool.is_none() {
                warn!("Unknown tool id in plugins.enabled_tools: {id}");
            }
            tool
        })
        .collect();

    let mut state = AppState::new(provider, tools)
        .with_chat(chat)
        .with_retrieval(retrieval)
        .with_enabled_tools(enabled_tools)
        .with_allowed_origins(cfg.server.allowed_origins.clone());

    if cfg.status.enabled {
        info!("User status checks enabled");
        state = state.with_status(StatusClient::new(
            &cfg.status.user_status_url,
            &cfg.status.rate_limit_url,
        ));
    }

    if cfg.retrieval.enabled {
        info!("Context retrieval enabled (namespace: {})", cfg.retrieval.namespace);
        state = state.with_vector(VectorClient::new(
            &cfg.retrieval.endpoint,
            &cfg.retrieval.api_key,
            &cfg.retrieval.namespace,
            cfg.retrieval.top_k,
        ));
    }

    let app = create_router(state);

    // CLI args override config file values
    let host = if cmd.host != "0.0.0.0" {
        cmd.host.clone()
    } else {
        cfg.server.host.clone()
    };
    let port = if cmd.port != 8080 {
        cmd.port
    } else {
        cfg.server.port
    };

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("invalid address")?;

    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("running server")?;

    Ok(())
}

fn load_or_init_config(paths: &AppPaths, common: &CommonOpts) -> Result<AppConfig> {
    if !paths.config_file.exists() {
        if common.dry_run {
            info!(
                "dry-run: would create default config at {}",
                paths.config_file.display()
            );
        } else {
            write_default_config(&paths.config_file)?;
        }
    }

    let env_prefix = env_prefix();
    let built = Config::builder()
        .set_default("logging.level", "info")?
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080_i64)?
        .add_source(
            File::from(paths.config_file.as_path())
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(Environment::with_prefix(env_prefix.as_str()).separator("__"))
        .build()?;

    let config: AppConfig = built.try_deserialize()?;
    Ok(config)
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let config = AppConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = default_config_header(path)?;
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn default_config_header(path: &Path) -> Result<String> {
    let mut buffer = String::new();
    buffer.push_str("# Configuration for ");
    buffer.push_str(APP_NAME);
    buffer.push('\n');
    buffer.push_str("# File: ");
    buffer.push_str(&path.display().to_string());
    buffer.push('\n');
    buffer.push('\n');
    Ok(buffer)
}

fn expand_path(path: PathBuf) -> Result<PathBuf> {
    if let Some(text) = path.to_str() {
        expand_str_path(text)
    } else {
        Ok(path)
    }
}

fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}

fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        let mut path = PathBuf::from(dir);
        path.push(APP_NAME);
        return Ok(path);
    }

    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_opts(config: Option<PathBuf>) -> CommonOpts {
        CommonOpts {
            config,
            quiet: false,
            verbose: 0,
            debug: false,
            trace: false,
            json: false,
            yaml: false,
            no_color: false,
            color: ColorOption::Auto,
            dry_run: false,
            assume_yes: false,
            diagnostics: false,
        }
    }

    #[test]
    fn test_write_default_config_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_default_config(&path).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("# Configuration for strix"));
        assert!(body.contains("[server]"));
        assert!(body.contains("[plugins]"));
    }

    #[test]
    fn test_load_config_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        write_default_config(&path).unwrap();

        let paths = AppPaths::discover(Some(path)).unwrap();
        let config = load_or_init_config(&paths, &test_opts(None)).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.provider.chat_model, "gpt-3.5-turbo");
        assert_eq!(config.plugins.enabled_tools.len(), 6);
        assert!(!config.status.enabled);
    }

    #[test]
    fn test_discover_treats_directory_as_parent() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::discover(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(paths.config_file, dir.path().join("config.toml"));
    }

    #[test]
    fn test_env_prefix_is_uppercase() {
        assert_eq!(env_prefix(), "STRIX");
    }

    #[test]
    fn test_configured_log_level_falls_back_to_info() {
        assert_eq!(configured_log_level("debug"), LevelFilter::Debug);
        assert_eq!(configured_log_level("bogus"), LevelFilter::Info);
    }
}
