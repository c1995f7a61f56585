//! Logging setup shared by the server binaries

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber
///
/// Output always goes to stderr: stdout belongs to the stdio transport.
/// `RUST_LOG` overrides the default `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding binaries)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
