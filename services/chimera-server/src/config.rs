//! Server Configuration
//!
//! Supports environment variables, config files, and CLI arguments.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server binding configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Where documents and the frontend live
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server binding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

/// Filesystem locations served by the operator endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Directory holding `acceptance_criteria.json` or `.md`
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,

    /// MCP server list returned by `/servers`
    #[serde(default = "default_mcp_config")]
    pub mcp_config: PathBuf,

    /// Static frontend served under `/`
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            mcp_config: default_mcp_config(),
            frontend_dir: default_frontend_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// =============================================================================
// Default Functions
// =============================================================================

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("docs")
}

fn default_mcp_config() -> PathBuf {
    PathBuf::from(".vscode/mcp.json")
}

fn default_frontend_dir() -> PathBuf {
    PathBuf::from("frontend")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl ServerConfig {
    /// Load configuration from environment and optional config file
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        // CHIMERA__SERVER__PORT=9000 sets server.port
        builder = builder.add_source(
            config::Environment::with_prefix("CHIMERA")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config
            .try_deserialize()
            .context("failed to deserialize server configuration")
    }
}
