//! Error types for metro-live.

use thiserror::Error;

/// Why one upstream poll produced no usable data.
///
/// Every variant is recoverable: the poller backs off and retries.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {status}")]
    Http {
        /// HTTP status code
        status: u16,
    },

    /// The request did not complete within its time budget.
    #[error("upstream request timed out")]
    Timeout,

    /// Connection, TLS or protocol failure before a status was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The body arrived but failed structural validation.
    #[error("malformed upstream payload: {0}")]
    Malformed(String),

    /// Local I/O failure (mock feed file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// HTTP status, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status } => Some(*status),
            _ => None,
        }
    }

    /// Rate limiting (429) or a server-side failure (5xx).
    ///
    /// These get the larger base backoff.
    pub fn is_throttled_or_server_error(&self) -> bool {
        matches!(self.status(), Some(status) if status == 429 || status >= 500)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable was set but could not be parsed.
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        /// Variable name
        name: String,
        /// Raw value as found
        value: String,
        /// What was expected
        reason: String,
    },

    /// A timezone name not in the tz database.
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// MQTT mirror failure.
#[derive(Debug, Error)]
pub enum MqttError {
    /// The broker connection is down or the client queue is closed.
    #[error("MQTT client disconnected: {0}")]
    Disconnected(String),

    /// The broker or client rejected the publish.
    #[error("MQTT publish failed: {0}")]
    Publish(String),
}
