//! File manager MCP server
//!
//! Serves on stdio by default; `--transport http` (or `TRANSPORT=http`)
//! starts the Streamable HTTP endpoint at `/mcp` instead.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use file_manager_server::{factory, DEFAULT_PORT};
use mcp_server::{init_logging, McpServer, ServerArgs, ServerMode};

/// File manager MCP server - file tools over stdio or HTTP
#[derive(Parser, Debug)]
#[command(name = "file-manager-server")]
#[command(version)]
#[command(about = "File manager MCP server - read, write, list and inspect files")]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,

    /// Directory relative paths resolve against (default: current directory)
    #[arg(long, env = "FILE_MANAGER_ROOT")]
    root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to determine the working directory")?,
    };

    let mode = cli.server.mode(DEFAULT_PORT);
    match &mode {
        ServerMode::Stdio => info!("File manager server ready on stdio"),
        ServerMode::Http(config) => {
            info!("Streamable HTTP endpoint: http://localhost:{}/mcp", config.port);
            info!("Allowed CORS origins: {}", config.allowed_origins.join(", "));
        }
    }
    info!("Root directory: {}", root.display());
    info!("Tools: read_file, write_file, list_directory, create_directory, delete_path, file_info");
    info!("Resources: file://overview/, file://content/{{path}}");
    info!("Prompts: file_analyzer");

    McpServer::new(factory(root)).with_mode(mode).run().await?;
    Ok(())
}
