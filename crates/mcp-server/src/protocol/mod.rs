//! MCP protocol types and handling

mod types;
mod handler;
mod capabilities;
mod payload;

pub use types::*;
pub use handler::{RequestHandler, NOTIFICATION_BUFFER};
pub use capabilities::ServerCapabilities;
pub use payload::{IncomingPayload, OutgoingPayload};
