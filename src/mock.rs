//! Mock implementations for testing without a network.
//!
//! This module provides test doubles for the collaborator traits, so the
//! poller, the store and the MQTT mirror can be exercised end to end on a
//! desktop with no upstream API or broker.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockClock`] | [`Clock`] | Controllable wall-clock time |
//! | [`MockFeed`] | [`FeedSource`] | Scripted queue of fetch results |
//! | [`MockMqtt`] | [`MqttPublisher`] | Captures published messages |
//!
//! Every mock is a cheap `Clone` handle over shared state: hand one clone to
//! the component under test and keep another to script or inspect it.
//!
//! [`Clock`]: crate::traits::Clock
//! [`FeedSource`]: crate::traits::FeedSource
//! [`MqttPublisher`]: crate::traits::MqttPublisher

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{FetchError, MqttError};
use crate::feed::FeedResponse;
use crate::traits::{Clock, FeedSource, MqttPublisher};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Clock
// ============================================================================

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use metro_live::mock::MockClock;
/// use metro_live::traits::Clock;
///
/// let clock = MockClock::at_epoch(1_700_000_000);
/// assert_eq!(clock.epoch_secs(), 1_700_000_000);
///
/// clock.advance_ms(1500);
/// assert_eq!(clock.epoch_secs(), 1_700_000_001);
///
/// clock.set_epoch(42);
/// assert_eq!(clock.epoch_secs(), 42);
/// ```
#[derive(Clone, Debug)]
pub struct MockClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Creates a clock fixed at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Creates a clock at the given epoch seconds.
    pub fn at_epoch(secs: i64) -> Self {
        Self::new(epoch(secs))
    }

    /// Sets the current time.
    pub fn set(&self, now: DateTime<Utc>) {
        *lock(&self.now) = now;
    }

    /// Sets the current time in epoch seconds.
    pub fn set_epoch(&self, secs: i64) {
        self.set(epoch(secs));
    }

    /// Advances the clock.
    pub fn advance_ms(&self, ms: u64) {
        let mut now = lock(&self.now);
        *now += chrono::Duration::milliseconds(ms as i64);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::at_epoch(0)
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

fn epoch(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

// ============================================================================
// Feed
// ============================================================================

/// Mock upstream feed for testing.
///
/// Each fetch pops the next scripted result. An empty script yields a
/// transport error.
///
/// # Example
///
/// ```rust
/// use metro_live::error::FetchError;
/// use metro_live::feed::FeedResponse;
/// use metro_live::mock::MockFeed;
///
/// let feed = MockFeed::new();
/// feed.push_ok(FeedResponse::default());
/// feed.push_err(FetchError::Http { status: 503 });
/// assert_eq!(feed.pending(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockFeed {
    script: Arc<Mutex<VecDeque<Result<FeedResponse, FetchError>>>>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl MockFeed {
    /// Creates an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every fetch (for timeout tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response.
    pub fn push_ok(&self, response: FeedResponse) {
        lock(&self.script).push_back(Ok(response));
    }

    /// Queue a failure.
    pub fn push_err(&self, err: FetchError) {
        lock(&self.script).push_back(Err(err));
    }

    /// Scripted results not yet consumed.
    pub fn pending(&self) -> usize {
        lock(&self.script).len()
    }

    /// Number of fetches started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FeedSource for MockFeed {
    async fn fetch(&self) -> Result<FeedResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = lock(&self.script).pop_front();
        next.unwrap_or_else(|| Err(FetchError::Transport("mock feed exhausted".to_string())))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

// ============================================================================
// MQTT
// ============================================================================

/// A message captured by [`MockMqtt`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Topic
    pub topic: String,
    /// Payload bytes
    pub payload: Vec<u8>,
    /// Retain flag
    pub retain: bool,
}

impl PublishedMessage {
    /// Returns the payload as a UTF-8 string, if valid.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Mock MQTT publisher for testing.
///
/// Records all publish operations. Set it disconnected to make publishes
/// fail.
///
/// # Example
///
/// ```rust
/// use metro_live::mock::MockMqtt;
///
/// let mqtt = MockMqtt::new();
/// assert!(mqtt.is_connected());
/// assert!(mqtt.published().is_empty());
///
/// mqtt.set_connected(false);
/// assert!(!mqtt.is_connected());
/// ```
#[derive(Clone, Debug)]
pub struct MockMqtt {
    published: Arc<Mutex<Vec<PublishedMessage>>>,
    connected: Arc<AtomicBool>,
}

impl MockMqtt {
    /// Creates a new mock in connected state.
    pub fn new() -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Connect or disconnect.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Whether publishes currently succeed.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// All messages published so far.
    pub fn published(&self) -> Vec<PublishedMessage> {
        lock(&self.published).clone()
    }

    /// Messages published to one topic.
    pub fn published_to(&self, topic: &str) -> Vec<PublishedMessage> {
        lock(&self.published)
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }
}

impl Default for MockMqtt {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttPublisher for MockMqtt {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), MqttError> {
        if !self.is_connected() {
            return Err(MqttError::Disconnected("mock broker offline".to_string()));
        }
        lock(&self.published).push(PublishedMessage {
            topic: topic.to_string(),
            payload,
            retain,
        });
        Ok(())
    }
}
