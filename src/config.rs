//! Application configuration.
//!
//! Every setting has a default, so `Config::default()` runs against a mock
//! feed with the in-process cache. Deployments override values through the
//! environment with [`Config::from_env`].
//!
//! # Example
//!
//! ```rust
//! use metro_live::config::{CacheConfig, Config, PollerConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.poller.poll_interval_ms, 2000);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_poller(PollerConfig::default().with_poll_interval_ms(5000))
//!     .with_cache(CacheConfig::default().with_ttl_seconds(30));
//! assert_eq!(config.cache.ttl_seconds, 30);
//! ```
//!
//! # Environment
//!
//! | Variable | Field |
//! |----------|-------|
//! | `METRO_API_BASE` | `upstream.base_url` |
//! | `METRO_API_KEY` | `upstream.api_key` |
//! | `METRO_CA_FILE` | `upstream.ca_file` |
//! | `METRO_TLS_INSECURE` | `upstream.tls_insecure` |
//! | `METRO_MOCK_FILE` | `upstream.mock_file` |
//! | `METRO_FETCH_TIMEOUT_MS` | `upstream.fetch_timeout_ms` |
//! | `POLL_INTERVAL_MS` | `poller.poll_interval_ms` |
//! | `DWELL_SECONDS` | `poller.dwell_seconds` |
//! | `CACHE_ENABLED` | `cache.enabled` |
//! | `CACHE_TTL_SECONDS` | `cache.ttl_seconds` |
//! | `CACHE_CHANNEL` | `cache.channel` |
//! | `CACHE_SNAPSHOT_KEY` | `cache.snapshot_key` |
//! | `CACHE_STATION_ETA_KEY` | `cache.station_eta_key` |
//! | `SERVICE_TIMEZONE` | `service_hours.timezone` |
//! | `SERVICE_OPEN_MINUTE` | `service_hours.open_minute` |
//! | `SERVICE_CLOSE_MINUTE` | `service_hours.close_minute` |
//! | `PORT` | `web.port` |
//! | `CORS_PERMISSIVE` | `web.cors_permissive` |
//! | `MQTT_ENABLED` | `mqtt.enabled` |
//! | `MQTT_HOST` | `mqtt.host` |
//! | `MQTT_PORT` | `mqtt.port` |
//! | `MQTT_CLIENT_ID` | `mqtt.client_id` |
//! | `MQTT_TOPIC` | `mqtt.topic` |

use std::str::FromStr;

use crate::error::ConfigError;

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Upstream feed access
    pub upstream: UpstreamConfig,
    /// Poll loop timing
    pub poller: PollerConfig,
    /// Snapshot cache and broadcast channel
    pub cache: CacheConfig,
    /// Service hours window
    pub service_hours: ServiceHoursConfig,
    /// HTTP server
    pub web: WebConfig,
    /// MQTT mirror
    pub mqtt: MqttConfig,
}

impl Config {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup. Unset or empty variables keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        let mut config = Config::default();

        let upstream = &mut config.upstream;
        env.string("METRO_API_BASE", &mut upstream.base_url);
        env.string("METRO_API_KEY", &mut upstream.api_key);
        env.optional("METRO_CA_FILE", &mut upstream.ca_file);
        env.optional("METRO_MOCK_FILE", &mut upstream.mock_file);
        env.flag("METRO_TLS_INSECURE", &mut upstream.tls_insecure)?;
        env.parse("METRO_FETCH_TIMEOUT_MS", &mut upstream.fetch_timeout_ms)?;

        let poller = &mut config.poller;
        env.parse("POLL_INTERVAL_MS", &mut poller.poll_interval_ms)?;
        env.parse("DWELL_SECONDS", &mut poller.dwell_seconds)?;

        let cache = &mut config.cache;
        env.flag("CACHE_ENABLED", &mut cache.enabled)?;
        env.parse("CACHE_TTL_SECONDS", &mut cache.ttl_seconds)?;
        env.string("CACHE_CHANNEL", &mut cache.channel);
        env.string("CACHE_SNAPSHOT_KEY", &mut cache.snapshot_key);
        env.string("CACHE_STATION_ETA_KEY", &mut cache.station_eta_key);

        let hours = &mut config.service_hours;
        env.string("SERVICE_TIMEZONE", &mut hours.timezone);
        env.parse("SERVICE_OPEN_MINUTE", &mut hours.open_minute)?;
        env.parse("SERVICE_CLOSE_MINUTE", &mut hours.close_minute)?;

        let web = &mut config.web;
        env.parse("PORT", &mut web.port)?;
        env.flag("CORS_PERMISSIVE", &mut web.cors_permissive)?;

        let mqtt = &mut config.mqtt;
        env.flag("MQTT_ENABLED", &mut mqtt.enabled)?;
        env.string("MQTT_HOST", &mut mqtt.host);
        env.parse("MQTT_PORT", &mut mqtt.port)?;
        env.string("MQTT_CLIENT_ID", &mut mqtt.client_id);
        env.string("MQTT_TOPIC", &mut mqtt.topic);

        Ok(config)
    }

    /// Set upstream configuration
    pub fn with_upstream(mut self, upstream: UpstreamConfig) -> Self {
        self.upstream = upstream;
        self
    }

    /// Set poller configuration
    pub fn with_poller(mut self, poller: PollerConfig) -> Self {
        self.poller = poller;
        self
    }

    /// Set cache configuration
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Set service hours configuration
    pub fn with_service_hours(mut self, service_hours: ServiceHoursConfig) -> Self {
        self.service_hours = service_hours;
        self
    }

    /// Set web configuration
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, name: &str, target: &mut String) {
        if let Some(value) = self.get(name) {
            *target = value;
        }
    }

    fn optional(&self, name: &str, target: &mut Option<String>) {
        if let Some(value) = self.get(name) {
            *target = Some(value);
        }
    }

    fn parse<T: FromStr>(&self, name: &str, target: &mut T) -> Result<(), ConfigError> {
        if let Some(value) = self.get(name) {
            *target = value.parse().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value: value.clone(),
                reason: format!("expected {}", std::any::type_name::<T>()),
            })?;
        }
        Ok(())
    }

    fn flag(&self, name: &str, target: &mut bool) -> Result<(), ConfigError> {
        if let Some(value) = self.get(name) {
            *target = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: name.to_string(),
                        value,
                        reason: "expected a boolean".to_string(),
                    })
                }
            };
        }
        Ok(())
    }
}

// ============================================================================
// Upstream Config
// ============================================================================

/// Path of the all-stations arrival endpoint, relative to the base URL.
pub const FEED_PATH: &str = "tempoEspera/Estacao/todos";

/// Upstream feed access
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    /// Base URL of the metro API
    pub base_url: String,
    /// Bearer token (empty = no Authorization header)
    pub api_key: String,
    /// PEM file with an extra root certificate
    pub ca_file: Option<String>,
    /// Skip TLS certificate verification (development only)
    pub tls_insecure: bool,
    /// Read the feed from this JSON file instead of HTTP
    pub mock_file: Option<String>,
    /// Hard timeout for one fetch in milliseconds
    pub fetch_timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            ca_file: None,
            tls_insecure: false,
            mock_file: None,
            fetch_timeout_ms: 3000,
        }
    }
}

impl UpstreamConfig {
    /// Set the base URL
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Set the bearer token
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = key.to_string();
        self
    }

    /// Read the feed from a local file
    pub fn with_mock_file(mut self, path: &str) -> Self {
        self.mock_file = Some(path.to_string());
        self
    }

    /// Set the fetch timeout
    pub fn with_fetch_timeout_ms(mut self, ms: u64) -> Self {
        self.fetch_timeout_ms = ms;
        self
    }

    /// Full feed URL: base with a trailing slash, then [`FEED_PATH`].
    pub fn feed_url(&self) -> String {
        let base = self.base_url.trim();
        if base.ends_with('/') {
            format!("{base}{FEED_PATH}")
        } else {
            format!("{base}/{FEED_PATH}")
        }
    }

    /// Check if a bearer token is configured
    pub fn has_auth(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ============================================================================
// Poller Config
// ============================================================================

/// Poll loop timing
#[derive(Clone, Debug)]
pub struct PollerConfig {
    /// Nominal delay between ticks
    pub poll_interval_ms: u64,
    /// Seconds a train is assumed to need for a freshly entered segment
    pub dwell_seconds: u32,
    /// Lower bound on any scheduled delay
    pub min_delay_ms: u64,
    /// Jitter amplitude; delays vary uniformly by +/- this much
    pub jitter_ms: u64,
    /// First backoff after an ordinary failure
    pub backoff_base_ms: u64,
    /// First backoff after a 429 or 5xx
    pub backoff_throttled_ms: u64,
    /// Backoff ceiling
    pub backoff_max_ms: u64,
    /// Forget trains unseen for this long (0 = 30 poll intervals)
    pub memory_ttl_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            dwell_seconds: 25,
            min_delay_ms: 200,
            jitter_ms: 100,
            backoff_base_ms: 4000,
            backoff_throttled_ms: 6000,
            backoff_max_ms: 30_000,
            memory_ttl_ms: 0,
        }
    }
}

impl PollerConfig {
    /// Set the poll interval
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the dwell seconds
    pub fn with_dwell_seconds(mut self, secs: u32) -> Self {
        self.dwell_seconds = secs;
        self
    }

    /// Set the jitter amplitude
    pub fn with_jitter_ms(mut self, ms: u64) -> Self {
        self.jitter_ms = ms;
        self
    }

    /// Set the train memory TTL
    pub fn with_memory_ttl_ms(mut self, ms: u64) -> Self {
        self.memory_ttl_ms = ms;
        self
    }

    /// Effective train memory TTL in whole seconds (at least one).
    pub fn memory_ttl_secs(&self) -> i64 {
        let ms = if self.memory_ttl_ms == 0 {
            self.poll_interval_ms.saturating_mul(30)
        } else {
            self.memory_ttl_ms
        };
        (ms / 1000).max(1) as i64
    }
}

// ============================================================================
// Cache Config
// ============================================================================

/// Snapshot cache and broadcast channel
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Whether the cache is active (disabled = publish is a no-op)
    pub enabled: bool,
    /// Lifetime of a cached value in seconds
    pub ttl_seconds: u64,
    /// Broadcast channel name
    pub channel: String,
    /// Cache key of the latest snapshot
    pub snapshot_key: String,
    /// Cache key of the latest station arrival board
    pub station_eta_key: String,
    /// Values buffered per subscriber before it starts skipping
    pub channel_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 15,
            channel: "metro:events".to_string(),
            snapshot_key: "metro:snapshot".to_string(),
            station_eta_key: "metro:station-etas".to_string(),
            channel_capacity: 16,
        }
    }
}

impl CacheConfig {
    /// Enable or disable the cache
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the TTL
    pub fn with_ttl_seconds(mut self, secs: u64) -> Self {
        self.ttl_seconds = secs;
        self
    }

    /// Set the broadcast channel name
    pub fn with_channel(mut self, channel: &str) -> Self {
        self.channel = channel.to_string();
        self
    }
}

// ============================================================================
// Service Hours Config
// ============================================================================

/// Daily service window
#[derive(Clone, Debug)]
pub struct ServiceHoursConfig {
    /// IANA timezone name
    pub timezone: String,
    /// Local minute-of-day service opens
    pub open_minute: u32,
    /// Local minute-of-day service closes
    pub close_minute: u32,
}

impl Default for ServiceHoursConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Lisbon".to_string(),
            open_minute: 6 * 60 + 30,
            close_minute: 30,
        }
    }
}

impl ServiceHoursConfig {
    /// Set the timezone
    pub fn with_timezone(mut self, tz: &str) -> Self {
        self.timezone = tz.to_string();
        self
    }

    /// Set the open/close minutes
    pub fn with_window(mut self, open_minute: u32, close_minute: u32) -> Self {
        self.open_minute = open_minute;
        self.close_minute = close_minute;
        self
    }
}

// ============================================================================
// Web Config
// ============================================================================

/// Web server configuration
#[derive(Clone, Debug)]
pub struct WebConfig {
    /// Port to listen on
    pub port: u16,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
    /// Interval between SSE keep-alive comments in seconds
    pub keep_alive_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_permissive: true,
            keep_alive_secs: 20,
        }
    }
}

impl WebConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set CORS mode
    pub fn with_cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT mirror configuration
#[derive(Clone, Debug)]
pub struct MqttConfig {
    /// Whether the mirror runs
    pub enabled: bool,
    /// Broker hostname or IP
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client ID
    pub client_id: String,
    /// Topic snapshots are published to (retained)
    pub topic: String,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 1883,
            client_id: "metro-live".to_string(),
            topic: "metro/events".to_string(),
            keep_alive_secs: 30,
        }
    }
}

impl MqttConfig {
    /// Enable or disable the mirror
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the topic
    pub fn with_topic(mut self, topic: &str) -> Self {
        self.topic = topic.to_string();
        self
    }
}
