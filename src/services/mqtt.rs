//! rumqttc-backed MQTT publisher.
//!
//! [`connect`] returns the publisher handle and a future that drives the
//! rumqttc event loop; both must run for publishes to reach the broker.
//!
//! ```ignore
//! let (publisher, event_loop) = connect(&config.mqtt);
//! tokio::spawn(event_loop);
//! let bridge = MqttBridge::new(publisher, &config.mqtt.topic);
//! tokio::spawn(bridge.run(store.subscribe()));
//! ```

use std::future::Future;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tracing::{debug, info, warn};

use crate::config::MqttConfig;
use crate::error::MqttError;
use crate::traits::MqttPublisher;

/// Delay before polling again after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Publisher handle over a rumqttc client.
#[derive(Clone, Debug)]
pub struct RumqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher for RumqttPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), MqttError> {
        if !is_publish_topic(topic) {
            return Err(MqttError::Publish(format!("invalid topic {topic:?}")));
        }
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await
            .map_err(|e| MqttError::Disconnected(e.to_string()))
    }
}

// Publish topics must be non-empty and free of wildcards.
fn is_publish_topic(topic: &str) -> bool {
    !topic.is_empty() && !topic.contains(['+', '#'])
}

/// MQTT options from configuration.
pub fn options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
    options
}

/// Create the publisher and its event-loop driver.
pub fn connect(config: &MqttConfig) -> (RumqttPublisher, impl Future<Output = ()> + Send) {
    let (client, eventloop) = AsyncClient::new(options(config), 10);
    let target = format!("{}:{}", config.host, config.port);
    (RumqttPublisher { client }, drive(eventloop, target))
}

async fn drive(mut eventloop: EventLoop, target: String) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!(broker = %target, "MQTT connected");
            }
            Ok(event) => debug!(?event, "MQTT event"),
            Err(err) => {
                warn!(broker = %target, error = %err, "MQTT connection error");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
