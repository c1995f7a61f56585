//! # mcp-server
//!
//! Shared MCP (Model Context Protocol) server kernel.
//!
//! Servers describe their tools, resources and prompts once in a
//! [`Registry`] and get both transports for free: newline-delimited
//! JSON-RPC over stdio, and Streamable HTTP with one session per client.

pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod registry;
mod server;
pub mod transport;

pub use config::{HttpConfig, ServerArgs, TransportKind};
pub use error::{RegistryError, ServerError, ToolError};
pub use logging::init_logging;
pub use protocol::{McpError, McpMessage, ServerCapabilities};
pub use registry::{
    Arguments, FieldSpec, InputSchema, PromptDescriptor, Registry, RegistryFactory,
    ResourceDescriptor, ResourceRequest, ToolDescriptor, ToolResult,
};
pub use server::{McpServer, ServerMode};
pub use transport::{HttpTransport, SessionManager, StdioTransport};
