//! Network abstraction traits for the upstream feed and the MQTT mirror.
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`FeedSource`] | One poll of the upstream arrival-time feed |
//! | [`MqttPublisher`] | Publish snapshot payloads to a broker |
//!
//! Both use return-position `impl Future + Send` so the poller and the
//! mirror can be spawned onto a multi-threaded runtime. Implementations may
//! simply write `async fn`.

use core::future::Future;

use crate::error::{FetchError, MqttError};
use crate::feed::FeedResponse;

// ============================================================================
// Feed Source
// ============================================================================

/// Source of upstream poll responses.
///
/// A fetch either yields a fully parsed response or a [`FetchError`]; the
/// caller never sees a partial body. Implementations should not retry
/// internally, backoff belongs to the poller.
///
/// # Example
///
/// ```rust
/// use metro_live::feed::{FeedResponse, RawObservation};
/// use metro_live::mock::MockFeed;
/// use metro_live::traits::FeedSource;
///
/// let feed = MockFeed::new();
/// feed.push_ok(FeedResponse::new(vec![
///     RawObservation::new("CS").with_train(1, "12C", "45"),
/// ]));
///
/// let rt = tokio::runtime::Builder::new_current_thread()
///     .enable_all()
///     .build()
///     .unwrap();
/// let response = rt.block_on(feed.fetch()).unwrap();
/// assert_eq!(response.sighting_count(), 1);
/// ```
pub trait FeedSource: Send + Sync {
    /// Fetch and parse one response.
    fn fetch(&self) -> impl Future<Output = Result<FeedResponse, FetchError>> + Send;

    /// Short label for logs (URL or file path).
    fn describe(&self) -> String;
}

// ============================================================================
// MQTT Publisher
// ============================================================================

/// Outbound half of an MQTT client.
///
/// The mirror only publishes, so unlike a full client this has no
/// subscribe or receive side.
pub trait MqttPublisher: Send + Sync {
    /// Publish a payload to a topic.
    ///
    /// - `retain`: broker keeps the message for new subscribers
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> impl Future<Output = Result<(), MqttError>> + Send;
}
