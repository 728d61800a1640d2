//! Mirror of the snapshot channel onto an MQTT topic.
//!
//! Every snapshot that reaches the subscription is published retained, so
//! an MQTT client that connects late still gets the current frame from the
//! broker. The bridge is generic over [`MqttPublisher`]; the rumqttc-backed
//! publisher lives in `services::mqtt` (feature `mqtt`).

use tracing::{debug, info, warn};

use crate::error::MqttError;
use crate::traits::MqttPublisher;

use super::store::Subscription;

/// Forwards snapshot JSON to one topic.
pub struct MqttBridge<P> {
    publisher: P,
    topic: String,
}

impl<P: MqttPublisher> MqttBridge<P> {
    /// Create a bridge publishing to `topic`.
    pub fn new(publisher: P, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }

    /// Target topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish one snapshot, retained.
    pub async fn forward(&self, json: &str) -> Result<(), MqttError> {
        self.publisher
            .publish(&self.topic, json.as_bytes().to_vec(), true)
            .await
    }

    /// Forward until the subscription ends. Publish failures are logged and
    /// skipped. Returns the number of snapshots delivered.
    pub async fn run(self, mut subscription: Subscription) -> usize {
        info!(topic = %self.topic, "MQTT mirror started");
        let mut delivered = 0;
        while let Some(json) = subscription.recv().await {
            match self.forward(&json).await {
                Ok(()) => {
                    delivered += 1;
                    debug!(topic = %self.topic, bytes = json.len(), "mirrored snapshot");
                }
                Err(err) => warn!(topic = %self.topic, error = %err, "MQTT publish failed"),
            }
        }
        info!(topic = %self.topic, delivered, "MQTT mirror stopped");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::mock::MockMqtt;
    use crate::services::store::SnapshotStore;
    use crate::snapshot::Snapshot;

    #[tokio::test]
    async fn test_forward_is_retained() {
        let mqtt = MockMqtt::new();
        let bridge = MqttBridge::new(mqtt.clone(), "metro/events");
        bridge.forward(r#"{"t":1}"#).await.unwrap();

        let sent = mqtt.published_to("metro/events");
        assert_eq!(sent.len(), 1);
        assert!(sent[0].retain);
        assert_eq!(sent[0].payload_str(), Some(r#"{"t":1}"#));
    }

    #[tokio::test]
    async fn test_run_mirrors_until_channel_closes() {
        let store = SnapshotStore::new(&CacheConfig::default());
        store.publish_snapshot(&Snapshot::closed(1));
        let subscription = store.subscribe();
        store.publish_snapshot(&Snapshot::closed(2));
        // Dropping the store closes the channel
        drop(store);

        let mqtt = MockMqtt::new();
        let delivered = MqttBridge::new(mqtt.clone(), "metro/events")
            .run(subscription)
            .await;

        assert_eq!(delivered, 2);
        let payloads: Vec<Snapshot> = mqtt
            .published()
            .iter()
            .map(|m| serde_json::from_slice(&m.payload).unwrap())
            .collect();
        assert_eq!(payloads[0].timestamp, 1);
        assert_eq!(payloads[1].timestamp, 2);
    }

    #[tokio::test]
    async fn test_run_survives_publish_failure() {
        let store = SnapshotStore::new(&CacheConfig::default());
        let subscription = store.subscribe();
        store.publish_snapshot(&Snapshot::closed(1));
        drop(store);

        let mqtt = MockMqtt::new();
        mqtt.set_connected(false);
        let delivered = MqttBridge::new(mqtt.clone(), "t").run(subscription).await;
        assert_eq!(delivered, 0);
        assert!(mqtt.published().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_store_ends_immediately() {
        let store = SnapshotStore::new(&CacheConfig::default().with_enabled(false));
        let delivered = MqttBridge::new(MockMqtt::new(), "t")
            .run(store.subscribe())
            .await;
        assert_eq!(delivered, 0);
    }
}
