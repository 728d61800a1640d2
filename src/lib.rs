//! # metro-live
//!
//! Live train positions for the Lisbon metro, inferred from the operator's
//! per-station arrival feed and fanned out to many viewers at once.
//!
//! ## Features
//!
//! - **Position inference**: folds redundant per-station ETAs into one train
//!   per id with line, direction, segment and progress
//! - **Station boards**: per-station arrival lists for every line
//! - **Service hours**: publishes a "closed" frame overnight instead of polling
//! - **Resilient polling**: hard fetch timeout, exponential backoff with
//!   jitter, last good frame re-emitted while upstream is down
//! - **Fan-out**: TTL cache plus broadcast channel; late joiners get the
//!   cached frame first
//! - **HTTP/SSE** (`web` feature) and a retained **MQTT mirror** (`mqtt`)
//!
//! ## Architecture
//!
//! - `topology` - Static line, station and destination tables
//! - `feed` - Upstream JSON model
//! - `normalize` / `station_eta` - Pure transforms of one poll response
//! - `service_hours` / `backoff` - Scheduling policy
//! - `traits` - Clock, feed and MQTT seams
//! - `services` - Poller, store, fetchers, web server, MQTT bridge
//! - `mock` - Test doubles for every trait
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use metro_live::{
//!     config::{CacheConfig, PollerConfig},
//!     feed::{FeedResponse, RawObservation},
//!     mock::{MockClock, MockFeed},
//!     services::{Poller, SnapshotStore},
//!     LineName, ServiceHours,
//! };
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let feed = MockFeed::new();
//! feed.push_ok(FeedResponse::new(vec![
//!     RawObservation::new("CS").with_train(1, "123C", "45"),
//! ]));
//!
//! let store = Arc::new(SnapshotStore::new(&CacheConfig::default()));
//! let clock = MockClock::at_epoch(1_705_320_000); // 12:00 in Lisbon
//! let mut poller = Poller::new(
//!     feed,
//!     clock,
//!     Arc::clone(&store),
//!     PollerConfig::default(),
//!     ServiceHours::default(),
//! );
//!
//! // One tick: fetch, normalize, publish
//! poller.tick().await;
//!
//! let snapshot = store.latest_snapshot().unwrap();
//! let train = &snapshot.trains(LineName::Verde)[0];
//! assert_eq!((train.from.as_str(), train.to.as_str()), ("BC", "CS"));
//! # });
//! ```

#![warn(missing_docs)]

/// Retry backoff for upstream failures.
pub mod backoff;
/// Environment-driven configuration with defaults.
pub mod config;
/// Error types.
pub mod error;
/// Upstream feed model and parsing.
pub mod feed;
/// Test doubles for the collaborator traits.
pub mod mock;
/// Train position inference.
pub mod normalize;
/// Daily service window.
pub mod service_hours;
/// Runtime services: poller, store, fetchers, HTTP and MQTT.
pub mod services;
/// Published snapshot types (serde-based).
pub mod snapshot;
/// Per-station arrival boards.
pub mod station_eta;
/// Static network tables.
pub mod topology;
/// Core traits for time and network collaborators.
pub mod traits;

// Re-exports for convenience
pub use backoff::Backoff;
pub use config::{
    CacheConfig, Config, MqttConfig, PollerConfig, ServiceHoursConfig, UpstreamConfig, WebConfig,
};
pub use error::{ConfigError, FetchError, MqttError};
pub use feed::{FeedResponse, RawObservation};
pub use normalize::{normalize, TrainMemory, TrainSegmentState};
pub use service_hours::{ServiceHours, ServiceStatus};
pub use snapshot::{
    Arrival, InferredTrain, LineStations, LineTrains, Snapshot, StationEta, StationEtaSnapshot,
};
pub use station_eta::build_station_etas;
pub use topology::{destination, line_from_train_id, station_name, Destination, LineName};
pub use traits::{Clock, FeedSource, MqttPublisher, SystemClock};
