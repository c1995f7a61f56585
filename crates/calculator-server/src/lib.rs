//! # calculator-server
//!
//! Arithmetic over MCP: five calculator tools, the `pi` constant and a
//! small formula library as resources, and a `math-tutor` prompt.

mod content;
mod tools;

pub use tools::{format_number, Operation};

use std::sync::Arc;

use mcp_server::{Registry, RegistryError, RegistryFactory};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "calculator-server";

/// Default port for the HTTP transport
pub const DEFAULT_PORT: u16 = 3001;

/// Build the calculator registry
pub fn build_registry() -> Result<Registry, RegistryError> {
    let builder = Registry::builder(SERVER_NAME, env!("CARGO_PKG_VERSION"))
        .instructions("Arithmetic tools (add, subtract, multiply, divide, calculate), math constants and formulas.");

    let builder = tools::register(builder)?;
    let builder = content::register(builder)?;
    Ok(builder.build())
}

/// Registry factory handing every HTTP session its own calculator
pub fn factory() -> RegistryFactory {
    Arc::new(build_registry)
}
