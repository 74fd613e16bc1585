//! Operator endpoint handlers
//!
//! Each endpoint degrades to a fixed JSON body when its backing file is
//! missing or malformed. Only an unreadable file is reported as a 500.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::ServerError;
use crate::AppState;

const ACCEPTANCE_JSON: &str = "acceptance_criteria.json";
const ACCEPTANCE_MARKDOWN: &str = "acceptance_criteria.md";

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /acceptance
pub async fn acceptance(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ServerError> {
    let docs_dir = &state.paths.docs_dir;

    let json_path = docs_dir.join(ACCEPTANCE_JSON);
    if let Some(raw) = read_optional(&json_path).await? {
        return Ok(Json(parse_or_report(&raw, &json_path)));
    }

    let markdown_path = docs_dir.join(ACCEPTANCE_MARKDOWN);
    if let Some(markdown) = read_optional(&markdown_path).await? {
        return Ok(Json(json!({ "markdown": markdown })));
    }

    Ok(Json(json!({ "message": "Acceptance criteria not found." })))
}

/// GET /servers
pub async fn servers(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ServerError> {
    let path = &state.paths.mcp_config;
    match read_optional(path).await? {
        Some(raw) => Ok(Json(parse_or_report(&raw, path))),
        None => Ok(Json(json!({ "servers": [] }))),
    }
}

/// `None` when the file does not exist
async fn read_optional(path: &Path) -> Result<Option<String>, ServerError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ServerError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_or_report(raw: &str, path: &Path) -> Value {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "malformed JSON document");
            json!({ "error": format!("Invalid JSON in {}", path.display()) })
        }
    }
}
