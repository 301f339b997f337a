//! MCP Tool Server
//!
//! Serves the built-in tools over stdio using the Model Context Protocol.

use clap::{Parser, Subcommand};

use mcp_tool_server::config::{Config, ToolErrorPolicy};
use mcp_tool_server::error::Result;
use mcp_tool_server::mcp::server::McpServer;
use mcp_tool_server::mcp::types::ListToolsResult;
use mcp_tool_server::tools::register_builtin_tools;

/// MCP Tool Server
#[derive(Parser)]
#[command(name = "mcp-tool-server")]
#[command(
    author,
    version,
    about = "MCP Tool Server - A Model Context Protocol server for tool invocation"
)]
struct Cli {
    /// How failed tool calls are reported (overrides MCP_TOOL_ERRORS)
    #[arg(long, value_enum)]
    tool_errors: Option<ToolErrorPolicy>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tools/list payload and exit
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON-RPC
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::new()?;
    if let Some(policy) = cli.tool_errors {
        config = config.with_tool_error_policy(policy);
    }

    let mut server = McpServer::new(config);
    register_builtin_tools(&mut server)?;

    match cli.command {
        Some(Commands::Tools) => {
            let listing = ListToolsResult {
                tools: server.registry().list_tools(),
            };
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        None => {
            server.run_stdio().await?;
        }
    }

    Ok(())
}
