//! Command line and environment configuration shared by the server binaries

use clap::{Args, ValueEnum};

use crate::server::ServerMode;

/// Origins allowed to call the HTTP transport when none are configured
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];

/// Host headers accepted under DNS rebinding protection when none are configured
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &["127.0.0.1", "localhost"];

/// Transport selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportKind {
    /// Newline-delimited JSON-RPC over stdin/stdout
    #[default]
    Stdio,
    /// Streamable HTTP with session management
    Http,
}

/// Options common to every server binary
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Transport to serve on
    #[arg(long, env = "TRANSPORT", value_enum, default_value_t = TransportKind::Stdio)]
    pub transport: TransportKind,

    /// Port for the HTTP transport
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address the HTTP transport binds to
    #[arg(long = "bind", env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Comma-separated origins allowed by CORS and origin validation
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values = DEFAULT_ALLOWED_ORIGINS.iter().copied()
    )]
    pub allowed_origins: Vec<String>,

    /// Comma-separated Host header values accepted in production
    #[arg(
        long,
        env = "ALLOWED_HOSTS",
        value_delimiter = ',',
        default_values = DEFAULT_ALLOWED_HOSTS.iter().copied()
    )]
    pub allowed_hosts: Vec<String>,

    /// Deployment environment; "production" enables DNS rebinding protection
    #[arg(long = "node-env", env = "NODE_ENV")]
    pub node_env: Option<String>,
}

impl ServerArgs {
    pub fn is_production(&self) -> bool {
        self.node_env.as_deref() == Some("production")
    }

    /// HTTP settings, using `default_port` when no port was given
    pub fn http_config(&self, default_port: u16) -> HttpConfig {
        HttpConfig {
            bind_address: self.bind_address.clone(),
            port: self.port.unwrap_or(default_port),
            allowed_origins: clean_list(&self.allowed_origins),
            allowed_hosts: clean_list(&self.allowed_hosts),
            dns_rebinding_protection: self.is_production(),
        }
    }

    /// Resolve the transport to run
    pub fn mode(&self, default_port: u16) -> ServerMode {
        match self.transport {
            TransportKind::Stdio => ServerMode::Stdio,
            TransportKind::Http => ServerMode::Http(self.http_config(default_port)),
        }
    }
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Settings for the HTTP transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub bind_address: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub allowed_hosts: Vec<String>,
    /// Validate `Host` and `Origin` headers on `/mcp`
    pub dns_rebinding_protection: bool,
}

impl HttpConfig {
    pub fn new(port: u16) -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
            allowed_hosts: DEFAULT_ALLOWED_HOSTS.iter().map(|s| s.to_string()).collect(),
            dns_rebinding_protection: false,
        }
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Whether a `Host` header value is allowed, with or without its port
    pub fn is_allowed_host(&self, host: &str) -> bool {
        let bare = strip_port(host);
        self.allowed_hosts.iter().any(|allowed| allowed == host || allowed == bare)
    }

    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == "*" || allowed == origin)
    }
}

/// `localhost:3000` -> `localhost`, `[::1]:3000` -> `[::1]`
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}
