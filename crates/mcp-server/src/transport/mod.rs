//! Transport implementations for MCP server

mod http;
mod session;
mod stdio;

pub use http::{HttpTransport, PROTOCOL_VERSION_HEADER, SESSION_HEADER};
pub use session::{Initialization, Session, SessionManager};
pub use stdio::StdioTransport;
