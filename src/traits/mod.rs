//! Trait definitions for time and network collaborators.
//!
//! These are the seams the poller and the MQTT mirror are generic over, so
//! the whole pipeline runs in tests against the doubles in
//! [`crate::mock`].
//!
//! # Submodules
//!
//! - `clock`: [`Clock`] and the real [`SystemClock`]
//! - `network`: [`FeedSource`] for the upstream feed and [`MqttPublisher`]
//!   for the mirror

pub mod clock;
pub mod network;

pub use clock::*;
pub use network::*;
