//! Calculator MCP server
//!
//! Serves on stdio by default; `--transport http` (or `TRANSPORT=http`)
//! starts the Streamable HTTP endpoint at `/mcp` instead.

use clap::Parser;
use tracing::info;

use calculator_server::{factory, DEFAULT_PORT};
use mcp_server::{init_logging, McpServer, ServerArgs, ServerMode};

/// Calculator MCP server - arithmetic tools over stdio or HTTP
#[derive(Parser, Debug)]
#[command(name = "calculator-server")]
#[command(version)]
#[command(about = "Calculator MCP server - arithmetic tools, math resources and a tutor prompt")]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mode = cli.server.mode(DEFAULT_PORT);
    match &mode {
        ServerMode::Stdio => info!("Calculator server ready on stdio"),
        ServerMode::Http(config) => {
            info!("Streamable HTTP endpoint: http://localhost:{}/mcp", config.port);
            info!("Allowed CORS origins: {}", config.allowed_origins.join(", "));
        }
    }
    info!("Tools: add, subtract, multiply, divide, calculate");
    info!("Resources: math://pi, math://formula/{{name}}");
    info!("Prompts: math-tutor");

    McpServer::new(factory()).with_mode(mode).run().await?;
    Ok(())
}
