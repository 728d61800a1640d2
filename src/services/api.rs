//! Small JSON bodies for the HTTP surface.
//!
//! Snapshot and station-board bodies are served as the cached JSON text
//! verbatim; only status bodies are modelled here.

use serde::{Deserialize, Serialize};

/// `GET /healthz` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always true while the process serves requests
    pub ok: bool,
}

impl HealthResponse {
    /// Healthy response
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Error body for 4xx/5xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
}

impl ErrorResponse {
    /// Create an error response
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
