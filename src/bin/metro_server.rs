//! Metro live-position server.
//!
//! Runs the upstream poller, serves the HTTP/SSE surface and optionally
//! mirrors snapshots to MQTT. Configuration comes from the environment; see
//! [`metro_live::config`] for the variables.
//!
//! # Run
//!
//! ```bash
//! # Against the live API
//! METRO_API_BASE=https://api.metrolisboa.pt:8243/estadoServicoML/1.0.1 \
//! METRO_API_KEY=... cargo run --bin metro_server
//!
//! # Against a local feed file
//! METRO_MOCK_FILE=feed.json cargo run --bin metro_server
//!
//! # With the MQTT mirror
//! MQTT_ENABLED=1 MQTT_HOST=localhost cargo run --bin metro_server --features mqtt
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use metro_live::services::{run_server, AnyFeed, Poller, SnapshotStore, WebServerConfig};
use metro_live::{Config, FeedSource, ServiceHours, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let hours = ServiceHours::from_config(&config.service_hours)
        .context("invalid service hours configuration")?;

    let feed = AnyFeed::from_config(&config.upstream).context("failed to build upstream feed")?;
    if config.upstream.mock_file.is_none() && config.upstream.base_url.is_empty() {
        warn!("METRO_API_BASE is not set; upstream fetches will fail");
    }
    info!(feed = %feed.describe(), "upstream feed configured");

    let store = Arc::new(SnapshotStore::new(&config.cache));
    if let Some(channel) = store.channel() {
        info!(channel, ttl_secs = config.cache.ttl_seconds, "snapshot cache enabled");
    }

    let poller = Poller::new(
        feed,
        SystemClock,
        Arc::clone(&store),
        config.poller.clone(),
        hours,
    )
    .with_fetch_timeout(std::time::Duration::from_millis(
        config.upstream.fetch_timeout_ms,
    ));
    tokio::spawn(poller.run());

    spawn_mqtt_mirror(&config, &store);

    let web_config = WebServerConfig::from_config(&config.web);
    run_server(store, web_config)
        .await
        .context("web server failed")
}

#[cfg(feature = "mqtt")]
fn spawn_mqtt_mirror(config: &Config, store: &Arc<SnapshotStore>) {
    use metro_live::services::{connect, MqttBridge};

    if !config.mqtt.enabled {
        return;
    }
    if !store.is_enabled() {
        warn!("MQTT mirror needs the snapshot cache; not starting");
        return;
    }
    let (publisher, event_loop) = connect(&config.mqtt);
    tokio::spawn(event_loop);
    let bridge = MqttBridge::new(publisher, config.mqtt.topic.clone());
    tokio::spawn(bridge.run(store.subscribe()));
}

#[cfg(not(feature = "mqtt"))]
fn spawn_mqtt_mirror(config: &Config, _store: &Arc<SnapshotStore>) {
    if config.mqtt.enabled {
        warn!("MQTT_ENABLED is set but the mqtt feature is not compiled in");
    }
}
