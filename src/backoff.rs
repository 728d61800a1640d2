//! Retry backoff for upstream failures.
//!
//! The first failure after a success sets the backoff to a base that
//! depends on the failure kind; each further consecutive failure doubles it
//! up to a ceiling. A success resets it to zero.

use crate::config::PollerConfig;
use crate::error::FetchError;

/// Exponential backoff state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backoff {
    current_ms: u64,
    base_ms: u64,
    throttled_ms: u64,
    max_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(4000, 6000, 30_000)
    }
}

impl Backoff {
    /// Create with explicit base, throttled base and ceiling.
    pub fn new(base_ms: u64, throttled_ms: u64, max_ms: u64) -> Self {
        Self {
            current_ms: 0,
            base_ms,
            throttled_ms,
            max_ms,
        }
    }

    /// Create from poller configuration.
    pub fn from_config(config: &PollerConfig) -> Self {
        Self::new(
            config.backoff_base_ms,
            config.backoff_throttled_ms,
            config.backoff_max_ms,
        )
    }

    /// Record a failure and return the new backoff.
    pub fn on_failure(&mut self, err: &FetchError) -> u64 {
        let base = if err.is_throttled_or_server_error() {
            self.throttled_ms
        } else {
            self.base_ms
        };
        let next = if self.current_ms == 0 {
            base
        } else {
            self.current_ms.saturating_mul(2)
        };
        self.current_ms = next.min(self.max_ms);
        self.current_ms
    }

    /// Clear after a success or a service-hours transition.
    pub fn reset(&mut self) {
        self.current_ms = 0;
    }

    /// Current backoff in milliseconds (0 when healthy).
    pub fn current_ms(&self) -> u64 {
        self.current_ms
    }
}
