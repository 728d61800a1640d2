//! Axum-based HTTP server over the snapshot store.
//!
//! Provides endpoints for:
//! - GET `/healthz` - Liveness probe
//! - GET `/now` - Cached snapshot (204 when none)
//! - GET `/station-etas` - Cached station board (204 when none)
//! - GET `/stream` - Server-sent events, one `data:` event per snapshot

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures_util::stream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::config::WebConfig;

use super::api::{ErrorResponse, HealthResponse};
use super::store::SnapshotStore;

// ============================================================================
// State
// ============================================================================

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Snapshot cache and channel
    pub store: Arc<SnapshotStore>,
    /// SSE keep-alive interval
    pub keep_alive: Duration,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /healthz
async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// GET /now - Latest snapshot
async fn now(State(state): State<AppState>) -> Response {
    cached_json(state.store.latest_snapshot_json())
}

/// GET /station-etas - Latest station board
async fn station_etas(State(state): State<AppState>) -> Response {
    cached_json(state.store.latest_station_etas_json())
}

fn cached_json(json: Option<Arc<str>>) -> Response {
    match json {
        Some(json) => (
            [(header::CONTENT_TYPE, "application/json")],
            json.to_string(),
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// GET /stream - Snapshot event stream
async fn stream_snapshots(State(state): State<AppState>) -> Response {
    if !state.store.is_enabled() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("Streaming unavailable: cache disabled")),
        )
            .into_response();
    }

    let subscription = state.store.subscribe();
    debug!(subscribers = state.store.subscriber_count(), "stream client connected");

    let events = stream::unfold(subscription, |mut subscription| async move {
        let json = subscription.recv().await?;
        let event = Event::default().data(&*json);
        Some((Ok::<_, Infallible>(event), subscription))
    });

    Sse::new(events)
        .keep_alive(KeepAlive::new().interval(state.keep_alive))
        .into_response()
}

/// Fallback handler for 404
async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not found")))
}

// ============================================================================
// Server Builder
// ============================================================================

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Address to bind to
    pub addr: SocketAddr,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
    /// SSE keep-alive interval
    pub keep_alive: Duration,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self::from_config(&WebConfig::default())
    }
}

impl WebServerConfig {
    /// Create a new config with the given address
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set whether CORS should be permissive
    pub fn cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Create from shared WebConfig
    pub fn from_config(config: &WebConfig) -> Self {
        Self {
            addr: ([0, 0, 0, 0], config.port).into(),
            cors_permissive: config.cors_permissive,
            keep_alive: Duration::from_secs(config.keep_alive_secs),
        }
    }
}

/// Build the Axum router with all routes
pub fn build_router(store: Arc<SnapshotStore>, config: &WebServerConfig) -> Router {
    let state = AppState {
        store,
        keep_alive: config.keep_alive,
    };

    let mut router = Router::new()
        .route("/healthz", get(healthz))
        .route("/now", get(now))
        .route("/station-etas", get(station_etas))
        .route("/stream", get(stream_snapshots))
        .fallback(not_found)
        .with_state(state);

    if config.cors_permissive {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Start the web server
///
/// This function blocks until the server is shut down.
pub async fn run_server(
    store: Arc<SnapshotStore>,
    config: WebServerConfig,
) -> Result<(), std::io::Error> {
    let router = build_router(store, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "web server listening");

    axum::serve(listener, router).await
}
