//! Snapshot cache and broadcast channel.
//!
//! The store keeps the latest serialized snapshot (and station board) with a
//! TTL, and fans every published snapshot out to any number of subscribers.
//! Late joiners get the cached value first, so a new viewer never waits a
//! full poll interval for its first frame.
//!
//! ```rust
//! use metro_live::config::CacheConfig;
//! use metro_live::services::SnapshotStore;
//! use metro_live::Snapshot;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let store = SnapshotStore::new(&CacheConfig::default());
//! store.publish_snapshot(&Snapshot::closed(100));
//!
//! // A late subscriber still sees the cached snapshot
//! let mut sub = store.subscribe();
//! let first = sub.recv().await.unwrap();
//! assert!(first.contains("\"serviceOpen\":false"));
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::snapshot::{Snapshot, StationEtaSnapshot};

// ============================================================================
// Store
// ============================================================================

#[derive(Debug)]
struct CacheEntry {
    json: Arc<str>,
    expires_at: Instant,
}

/// Backing state of an enabled store.
#[derive(Debug)]
pub struct ActiveStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
    sender: broadcast::Sender<Arc<str>>,
    channel: String,
    snapshot_key: String,
    station_eta_key: String,
    ttl: Duration,
}

/// Latest-value cache plus broadcast fan-out.
///
/// Chosen once at construction: with caching disabled every publish is a
/// no-op, reads miss and subscriptions end immediately.
#[derive(Debug)]
pub enum SnapshotStore {
    /// Caching and broadcast are live.
    Active(ActiveStore),
    /// Caching is turned off by configuration.
    Disabled,
}

impl SnapshotStore {
    /// Build from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        if !config.enabled {
            debug!("snapshot cache disabled");
            return SnapshotStore::Disabled;
        }
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        SnapshotStore::Active(ActiveStore {
            entries: RwLock::new(HashMap::new()),
            sender,
            channel: config.channel.clone(),
            snapshot_key: config.snapshot_key.clone(),
            station_eta_key: config.station_eta_key.clone(),
            ttl: Duration::from_secs(config.ttl_seconds),
        })
    }

    /// Whether the store is active.
    pub fn is_enabled(&self) -> bool {
        matches!(self, SnapshotStore::Active(_))
    }

    /// Broadcast channel name (`None` when disabled).
    pub fn channel(&self) -> Option<&str> {
        match self {
            SnapshotStore::Active(store) => Some(&store.channel),
            SnapshotStore::Disabled => None,
        }
    }

    /// Default entry lifetime.
    pub fn ttl(&self) -> Duration {
        match self {
            SnapshotStore::Active(store) => store.ttl,
            SnapshotStore::Disabled => Duration::ZERO,
        }
    }

    /// Cache a snapshot with the default TTL and broadcast it.
    pub fn publish_snapshot(&self, snapshot: &Snapshot) {
        self.publish_snapshot_for(snapshot, self.ttl());
    }

    /// Cache a snapshot with an explicit TTL and broadcast it.
    pub fn publish_snapshot_for(&self, snapshot: &Snapshot, ttl: Duration) {
        let SnapshotStore::Active(store) = self else {
            return;
        };
        let Some(json) = encode(snapshot) else {
            return;
        };

        let mut entries = store.write();
        entries.insert(
            store.snapshot_key.clone(),
            CacheEntry {
                json: Arc::clone(&json),
                expires_at: Instant::now() + ttl,
            },
        );
        // No receivers is not an error
        let delivered = store.sender.send(json).unwrap_or(0);
        debug!(
            channel = %store.channel,
            subscribers = delivered,
            t = snapshot.timestamp,
            service_open = snapshot.service_open,
            "published snapshot"
        );
    }

    /// Cache a station board with the default TTL. Boards are not broadcast.
    pub fn store_station_etas(&self, board: &StationEtaSnapshot) {
        let SnapshotStore::Active(store) = self else {
            return;
        };
        let Some(json) = encode(board) else {
            return;
        };
        store.write().insert(
            store.station_eta_key.clone(),
            CacheEntry {
                json,
                expires_at: Instant::now() + store.ttl,
            },
        );
    }

    /// Cached snapshot JSON, if present and unexpired.
    pub fn latest_snapshot_json(&self) -> Option<Arc<str>> {
        match self {
            SnapshotStore::Active(store) => store.get(&store.snapshot_key),
            SnapshotStore::Disabled => None,
        }
    }

    /// Cached snapshot, decoded.
    pub fn latest_snapshot(&self) -> Option<Snapshot> {
        let json = self.latest_snapshot_json()?;
        serde_json::from_str(&json).ok()
    }

    /// Cached station board JSON, if present and unexpired.
    pub fn latest_station_etas_json(&self) -> Option<Arc<str>> {
        match self {
            SnapshotStore::Active(store) => store.get(&store.station_eta_key),
            SnapshotStore::Disabled => None,
        }
    }

    /// Cached station board, decoded.
    pub fn latest_station_etas(&self) -> Option<StationEtaSnapshot> {
        let json = self.latest_station_etas_json()?;
        serde_json::from_str(&json).ok()
    }

    /// Open a subscription: the cached snapshot first (if any), then every
    /// later publish.
    pub fn subscribe(&self) -> Subscription {
        let SnapshotStore::Active(store) = self else {
            return Subscription::closed();
        };
        // Holding the read lock orders this against publish: a value is
        // either in the cache snapshot taken here or delivered live, never both.
        let entries = store.read();
        let initial = live_entry(&entries, &store.snapshot_key);
        let receiver = store.sender.subscribe();
        drop(entries);
        Subscription {
            initial,
            receiver: Some(receiver),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        match self {
            SnapshotStore::Active(store) => store.sender.receiver_count(),
            SnapshotStore::Disabled => 0,
        }
    }
}

impl ActiveStore {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self, key: &str) -> Option<Arc<str>> {
        live_entry(&self.read(), key)
    }
}

fn live_entry(entries: &HashMap<String, CacheEntry>, key: &str) -> Option<Arc<str>> {
    entries
        .get(key)
        .filter(|entry| entry.expires_at > Instant::now())
        .map(|entry| Arc::clone(&entry.json))
}

fn encode<T: Serialize>(value: &T) -> Option<Arc<str>> {
    match serde_json::to_string(value) {
        Ok(json) => Some(Arc::from(json)),
        Err(err) => {
            warn!(error = %err, "failed to serialize published value");
            None
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// One subscriber's view of the snapshot channel.
#[derive(Debug)]
pub struct Subscription {
    initial: Option<Arc<str>>,
    receiver: Option<broadcast::Receiver<Arc<str>>>,
}

impl Subscription {
    fn closed() -> Self {
        Self {
            initial: None,
            receiver: None,
        }
    }

    /// Next snapshot JSON. `None` once the channel is gone (or the store is
    /// disabled). A subscriber that falls behind skips to the oldest value
    /// still buffered.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(json) => return Some(json),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Whether this subscription can still yield values.
    pub fn is_open(&self) -> bool {
        self.initial.is_some() || self.receiver.is_some()
    }
}
