//! Chimera operator service
//!
//! Exposes the collaborating endpoints around the governance core:
//!
//! - `GET /health` - liveness check with the service version
//! - `GET /acceptance` - acceptance criteria, JSON first, then markdown
//! - `GET /servers` - MCP server discovery from a JSON file
//! - everything else - static frontend files
//!
//! Every response carries a fixed set of hardening headers.

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::config::PathSettings;

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; style-src 'self' 'unsafe-inline';";

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub paths: PathSettings,
}

impl AppState {
    pub fn new(paths: PathSettings) -> Self {
        Self { paths }
    }
}

/// Build the full router, hardening headers included
pub fn create_router(state: Arc<AppState>) -> Router {
    let frontend = ServeDir::new(&state.paths.frontend_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/acceptance", get(handlers::acceptance))
        .route("/servers", get(handlers::servers))
        .fallback_service(frontend)
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
