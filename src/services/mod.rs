//! Runtime services: the poll loop, the snapshot store and its consumers.
//!
//! - `store`: latest-value cache and broadcast channel shared by everything
//! - `poller`: the fetch/normalize/publish loop
//! - `fetch`: HTTP and file feed sources
//! - `mqtt_bridge`: forwards the snapshot channel to an MQTT publisher
//! - `web` feature: Axum-based HTTP server with SSE streaming
//! - `mqtt` feature: rumqttc-backed MQTT publisher
//!
//! # Shared State Pattern
//!
//! The poller is the only writer; every other service only reads from the
//! store, so one `Arc<SnapshotStore>` is shared by all of them:
//!
//! ```ignore
//! use std::sync::Arc;
//! use metro_live::services::{build_router, Poller, SnapshotStore};
//!
//! let store = Arc::new(SnapshotStore::new(&config.cache));
//!
//! // Poller writes, web reads
//! tokio::spawn(Poller::new(feed, SystemClock, Arc::clone(&store), config.poller, hours).run());
//! let web_router = build_router(Arc::clone(&store), &web_config);
//! ```

pub mod fetch;
pub mod mqtt_bridge;
pub mod poller;
pub mod store;

// API types are only served over HTTP
#[cfg(feature = "web")]
pub mod api;

#[cfg(feature = "web")]
pub mod web;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-exports
pub use fetch::*;
pub use mqtt_bridge::*;
pub use poller::*;
pub use store::*;

#[cfg(feature = "web")]
pub use api::*;

#[cfg(feature = "web")]
pub use web::*;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
