//! Main MCP server orchestration

use tracing::info;

use crate::config::HttpConfig;
use crate::error::Result;
use crate::registry::RegistryFactory;
use crate::transport::{HttpTransport, StdioTransport};

/// Server mode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServerMode {
    /// stdio transport (for desktop MCP clients)
    #[default]
    Stdio,
    /// Streamable HTTP transport with sessions
    Http(HttpConfig),
}

/// MCP server
pub struct McpServer {
    factory: RegistryFactory,
    mode: ServerMode,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(factory: RegistryFactory) -> Self {
        Self {
            factory,
            mode: ServerMode::default(),
        }
    }

    /// Set the server mode
    pub fn with_mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> &ServerMode {
        &self.mode
    }

    /// Run the server until its transport finishes
    pub async fn run(self) -> Result<()> {
        match self.mode {
            ServerMode::Stdio => {
                info!("Starting MCP server in stdio mode");
                let registry = (self.factory)()?;
                let mut transport = StdioTransport::new(registry);
                transport.run().await
            }
            ServerMode::Http(config) => {
                info!("Starting MCP server in HTTP mode on port {}", config.port);
                let transport = HttpTransport::new(self.factory, config)?;
                transport.run().await
            }
        }
    }
}
