//! linear-mcp - Model Context Protocol server for Linear.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use linear_api::LinearClient;
use linear_core::config::{Config, Routing, TOKEN_ENV_VAR};
use linear_mcp::{McpServer, StdioTransport, ToolRegistry, Transport, WebSocketTransport};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "linear-mcp")]
#[command(author, version, about = "Linear tools for MCP clients", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Linear API key (falls back to LINEAR_API_TOKEN, then the config file)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Read and write configuration at this path instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve over stdin/stdout (default)
    Stdio,

    /// Serve over WebSocket
    Websocket {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Outbound addressing: broadcast or requester
        #[arg(long)]
        routing: Option<Routing>,
    },

    /// Print every tool with its input and output schema
    Tools,

    /// Inspect or change the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print one value, e.g. `server.port`
    Get { key: String },

    /// Set one value, e.g. `linear.token lin_api_...`
    Set { key: String, value: String },

    /// Show current configuration
    Show,

    /// Print the config file location
    Path,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout carries protocol traffic in stdio mode.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Stdio) {
        Commands::Stdio => {
            let config = load_config(config_path)?;
            let server = build_server(&config, cli.token)?;
            tracing::info!("Serving MCP over stdio");
            serve(server, StdioTransport::stdio()).await
        }
        Commands::Websocket {
            host,
            port,
            routing,
        } => {
            let config = load_config(config_path)?;
            let server = build_server(&config, cli.token)?;

            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let routing = routing.unwrap_or(config.server.routing);

            let transport = WebSocketTransport::bind(&format!("{}:{}", host, port), routing)
                .await
                .context("Failed to start WebSocket transport")?;
            serve(server, transport).await
        }
        Commands::Tools => {
            let tools = ToolRegistry::builtin().descriptors();
            println!("{}", serde_json::to_string_pretty(&tools)?);
            Ok(())
        }
        Commands::Config { command } => run_config(command, config_path),
    }
}

fn run_config(command: ConfigCommands, path: Option<&Path>) -> Result<()> {
    match command {
        ConfigCommands::Get { key } => {
            let config = load_config(path)?;
            match config.get(&key)? {
                Some(value) => println!("{}", value),
                None => println!("(not set)"),
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut config = load_config(path)?;
            config.set(&key, &value)?;
            match path {
                Some(path) => config.save_to(path)?,
                None => config.save()?,
            }
            let shown = if key.ends_with("token") {
                mask(&value)
            } else {
                value
            };
            println!("{} = {}", key, shown);
        }
        ConfigCommands::Show => {
            let mut config = load_config(path)?;
            config.linear.token = config.linear.token.as_deref().map(mask);
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommands::Path => {
            let location = match path {
                Some(path) => path.to_path_buf(),
                None => Config::config_path()?,
            };
            println!("{}", location.display());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

fn build_server(config: &Config, token: Option<String>) -> Result<McpServer> {
    let Some(token) = config.resolve_token(token) else {
        bail!(
            "No Linear API key. Pass --token, set {} or run `linear-mcp config set linear.token <key>`",
            TOKEN_ENV_VAR
        );
    };

    let client = LinearClient::with_base_url(config.linear.api_url.clone(), token)?;
    Ok(McpServer::new(Arc::new(client))
        .with_call_timeout(Duration::from_secs(config.server.call_timeout_secs)))
}

async fn serve<T: Transport>(server: McpServer, transport: T) -> Result<()> {
    tokio::select! {
        result = server.connect(transport) => result.context("Transport failed"),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(())
        }
    }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
