//! # file-manager-server
//!
//! File management over MCP. Six tools read, write, list, create, delete
//! and inspect paths under a root directory; two resources expose a root
//! overview and file contents; one prompt asks for a file review.

mod content;
pub mod fs;
mod tools;

pub use fs::{Encoding, Entry, EntryKind, FileManager};

use std::path::PathBuf;
use std::sync::Arc;

use mcp_server::{Registry, RegistryError, RegistryFactory};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "file-manager-server";

/// Default port for the HTTP transport
pub const DEFAULT_PORT: u16 = 3002;

/// Build the file manager registry over `root`
pub fn build_registry(root: impl Into<PathBuf>) -> Result<Registry, RegistryError> {
    let manager = Arc::new(FileManager::new(root));

    let builder = Registry::builder(SERVER_NAME, env!("CARGO_PKG_VERSION")).instructions(format!(
        "File management tools. Relative paths resolve against {}.",
        manager.root().display()
    ));

    let builder = tools::register(builder, &manager)?;
    let builder = content::register(builder, &manager)?;
    Ok(builder.build())
}

/// Registry factory handing every HTTP session its own manager over `root`
pub fn factory(root: impl Into<PathBuf>) -> RegistryFactory {
    let root = root.into();
    Arc::new(move || build_registry(root.clone()))
}
