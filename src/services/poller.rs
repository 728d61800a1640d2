//! Poll loop: fetch, normalize, publish, back off.
//!
//! The [`Poller`] owns every piece of state that lives across ticks: the
//! per-train memory, the backoff, the last good snapshots and the jitter
//! RNG. Collaborators are injected, so tests drive it tick by tick with a
//! [`MockFeed`](crate::mock::MockFeed) and a [`MockClock`](crate::mock::MockClock).
//!
//! # Tick
//!
//! ```text
//! gate closed ──► (on transition) publish closed snapshot + empty board
//!     │            return time-until-open
//!     ▼
//! fetch (hard timeout)
//!     ├─ ok  ──► normalize + station board, publish, reset backoff, sweep
//!     └─ err ──► grow backoff, republish last snapshot / refreshed board
//!     ▼
//! return max(floor, interval + backoff + jitter)
//! ```

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::config::PollerConfig;
use crate::error::FetchError;
use crate::feed::FeedResponse;
use crate::normalize::{normalize, TrainMemory};
use crate::service_hours::{ServiceHours, ServiceStatus};
use crate::snapshot::{Snapshot, StationEtaSnapshot};
use crate::station_eta::build_station_etas;
use crate::traits::{Clock, FeedSource};

use super::store::SnapshotStore;

/// Default hard timeout for one fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(3000);

/// Sequential poll scheduler.
pub struct Poller<F, C> {
    feed: F,
    clock: C,
    store: Arc<SnapshotStore>,
    config: PollerConfig,
    hours: ServiceHours,
    fetch_timeout: Duration,
    memory: TrainMemory,
    backoff: Backoff,
    rng: StdRng,
    service_open: Option<bool>,
    last_snapshot: Option<Snapshot>,
    last_station_etas: Option<StationEtaSnapshot>,
}

impl<F: FeedSource, C: Clock> Poller<F, C> {
    /// Create a poller with an entropy-seeded jitter RNG.
    pub fn new(
        feed: F,
        clock: C,
        store: Arc<SnapshotStore>,
        config: PollerConfig,
        hours: ServiceHours,
    ) -> Self {
        Self {
            feed,
            clock,
            store,
            backoff: Backoff::from_config(&config),
            config,
            hours,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            memory: TrainMemory::new(),
            rng: StdRng::from_entropy(),
            service_open: None,
            last_snapshot: None,
            last_station_etas: None,
        }
    }

    /// Use a fixed jitter seed (reproducible schedules).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Set the hard fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Current backoff in milliseconds.
    pub fn backoff_ms(&self) -> u64 {
        self.backoff.current_ms()
    }

    /// Service state seen by the last tick (`None` before the first).
    pub fn service_open(&self) -> Option<bool> {
        self.service_open
    }

    /// Last successfully built snapshot.
    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    /// Trains currently remembered across ticks.
    pub fn remembered_trains(&self) -> usize {
        self.memory.len()
    }

    /// Run forever: tick, sleep the returned delay, repeat.
    pub async fn run(mut self) {
        info!(
            feed = %self.feed.describe(),
            interval_ms = self.config.poll_interval_ms,
            "poller started"
        );
        loop {
            let delay = self.tick().await;
            tokio::time::sleep(delay).await;
        }
    }

    /// One scheduler step. Returns the delay before the next step.
    pub async fn tick(&mut self) -> Duration {
        let now = self.clock.now();
        let now_secs = now.timestamp();

        match self.hours.status(now) {
            ServiceStatus::Closed { ms_until_open } => {
                if self.service_open != Some(false) {
                    self.enter_closed(now_secs, ms_until_open);
                }
                return self.delay(i64::try_from(ms_until_open).unwrap_or(i64::MAX));
            }
            ServiceStatus::Open => {
                if self.service_open != Some(true) {
                    info!("service open, polling upstream");
                    self.service_open = Some(true);
                }
            }
        }

        match self.fetch().await {
            Ok(response) => self.on_success(&response, now_secs),
            Err(err) => self.on_failure(&err, now_secs),
        }

        let base = self.config.poll_interval_ms.saturating_add(self.backoff.current_ms());
        self.delay(i64::try_from(base).unwrap_or(i64::MAX))
    }

    async fn fetch(&self) -> Result<FeedResponse, FetchError> {
        match tokio::time::timeout(self.fetch_timeout, self.feed.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    fn enter_closed(&mut self, now_secs: i64, ms_until_open: u64) {
        info!(ms_until_open, "service closed");
        self.service_open = Some(false);
        self.last_snapshot = None;
        self.last_station_etas = None;
        self.memory = TrainMemory::new();
        self.backoff.reset();

        // Keep the closed frame cached until service resumes
        let ttl = self.store.ttl().max(Duration::from_millis(ms_until_open));
        self.store
            .publish_snapshot_for(&Snapshot::closed(now_secs), ttl);
        self.store
            .store_station_etas(&StationEtaSnapshot::empty(now_secs));
    }

    fn on_success(&mut self, response: &FeedResponse, now_secs: i64) {
        let trains = normalize(response, &mut self.memory, self.config.dwell_seconds, now_secs);
        let snapshot = Snapshot::from_trains(now_secs, trains, true);
        let board = build_station_etas(response, now_secs);

        self.store.publish_snapshot(&snapshot);
        self.store.store_station_etas(&board);

        if self.backoff.current_ms() > 0 {
            info!("upstream recovered");
        }
        self.backoff.reset();

        let swept = self.memory.sweep(now_secs, self.config.memory_ttl_secs());
        debug!(
            rows = response.rows.len(),
            trains = snapshot.train_count(),
            swept,
            "tick ok"
        );

        self.last_snapshot = Some(snapshot);
        self.last_station_etas = Some(board);
    }

    fn on_failure(&mut self, err: &FetchError, now_secs: i64) {
        let backoff_ms = self.backoff.on_failure(err);
        warn!(error = %err, backoff_ms, "upstream fetch failed");

        if let Some(last) = self.last_snapshot.as_mut() {
            last.service_open = true;
            self.store.publish_snapshot(last);
        }
        if let Some(board) = &self.last_station_etas {
            self.store.store_station_etas(&board.refreshed(now_secs));
        }
    }

    fn delay(&mut self, base_ms: i64) -> Duration {
        let jitter = self.config.jitter_ms.min(i64::MAX as u64) as i64;
        let offset = self.rng.gen_range(-jitter..=jitter);
        let floor = self.config.min_delay_ms.min(i64::MAX as u64) as i64;
        let ms = base_ms.saturating_add(offset).max(floor).max(0);
        Duration::from_millis(ms as u64)
    }
}
