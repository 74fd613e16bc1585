//! Chimera Server
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings
//! chimera-server
//!
//! # Start with custom config
//! chimera-server --config /path/to/config.toml
//!
//! # Start with environment overrides
//! CHIMERA__SERVER__PORT=9000 chimera-server
//! ```

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chimera_server::config::{LoggingConfig, ServerConfig};
use chimera_server::{create_router, AppState};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Chimera Server - operator endpoints and frontend hosting
#[derive(Parser, Debug)]
#[command(name = "chimera-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "CHIMERA_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "CHIMERA_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "CHIMERA_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CHIMERA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "CHIMERA_LOG_FORMAT")]
    log_format: Option<String>,

    /// Directory holding the acceptance criteria
    #[arg(long)]
    docs_dir: Option<String>,

    /// MCP server list file
    #[arg(long)]
    mcp_config: Option<String>,

    /// Static frontend directory
    #[arg(long)]
    frontend_dir: Option<String>,
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;

    // Override with CLI arguments
    if let Some(host) = args.host {
        server_config.server.host = host;
    }
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    if let Some(level) = args.log_level {
        server_config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        server_config.logging.format = format;
    }
    if let Some(dir) = args.docs_dir {
        server_config.paths.docs_dir = dir.into();
    }
    if let Some(path) = args.mcp_config {
        server_config.paths.mcp_config = path.into();
    }
    if let Some(dir) = args.frontend_dir {
        server_config.paths.frontend_dir = dir.into();
    }

    init_logging(&server_config.logging);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Chimera Server"
    );

    if !server_config.paths.frontend_dir.is_dir() {
        tracing::warn!(
            frontend_dir = %server_config.paths.frontend_dir.display(),
            "Frontend directory not found; static requests will return 404"
        );
    }

    let addr = server_config.server.socket_addr()?;
    let app = create_router(Arc::new(AppState::new(server_config.paths.clone())));

    tracing::info!(
        host = %server_config.server.host,
        port = %server_config.server.port,
        "Server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .init();
        }
    }
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
