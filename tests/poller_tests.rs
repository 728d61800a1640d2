//! Integration tests for the poll loop and the snapshot store.
//!
//! The poller is driven tick by tick with a scripted feed and a pinned
//! clock; every assertion is made through the store, the same way the web
//! and MQTT consumers see it.

use std::sync::Arc;
use std::time::Duration;

use metro_live::config::{CacheConfig, PollerConfig};
use metro_live::mock::{MockClock, MockFeed};
use metro_live::services::{Poller, SnapshotStore};
use metro_live::{FeedResponse, FetchError, LineName, RawObservation, ServiceHours, Snapshot};

// Monday 2024-01-15 12:00 in Lisbon (UTC+0 in winter)
const NOON: i64 = 1_705_320_000;
// Tuesday 2024-01-16 00:00 in Lisbon
const MIDNIGHT: i64 = NOON + 12 * 3600;

fn cs_response() -> FeedResponse {
    FeedResponse::new(vec![RawObservation::new("CS").with_train(1, "123C", "45")])
}

fn three_trains() -> FeedResponse {
    FeedResponse::new(vec![
        RawObservation::new("CS").with_train(1, "1C", "45"),
        RawObservation::new("SP").with_train(1, "2A", "30"),
        RawObservation::new("RA").with_train(1, "3B", "60"),
    ])
}

struct Harness {
    poller: Poller<MockFeed, MockClock>,
    store: Arc<SnapshotStore>,
    feed: MockFeed,
    clock: MockClock,
}

fn harness_with(cache: CacheConfig, poller: PollerConfig, start: i64) -> Harness {
    let store = Arc::new(SnapshotStore::new(&cache));
    let feed = MockFeed::new();
    let clock = MockClock::at_epoch(start);
    let poller = Poller::new(
        feed.clone(),
        clock.clone(),
        Arc::clone(&store),
        poller,
        ServiceHours::default(),
    )
    .with_seed(42);
    Harness {
        poller,
        store,
        feed,
        clock,
    }
}

fn harness(start: i64) -> Harness {
    harness_with(CacheConfig::default(), PollerConfig::default(), start)
}

fn decode(json: &str) -> Snapshot {
    serde_json::from_str(json).unwrap()
}

// ============================================================================
// Success path
// ============================================================================

#[tokio::test]
async fn test_tick_publishes_snapshot_and_board() {
    let mut h = harness(NOON);
    h.feed.push_ok(cs_response());

    h.poller.tick().await;

    let snapshot = h.store.latest_snapshot().unwrap();
    assert_eq!(snapshot.timestamp, NOON);
    assert!(snapshot.service_open);
    assert_eq!(snapshot.per_line.len(), 4);
    let train = &snapshot.trains(LineName::Verde)[0];
    assert_eq!(train.id, "123C");
    assert_eq!(train.to, "CS");
    assert_eq!(train.from, "BC");
    assert_eq!(train.eta_next_seconds, 45);

    let board = h.store.latest_station_etas().unwrap();
    assert_eq!(board.timestamp, NOON);
    assert_eq!(board.station(LineName::Verde, "CS").unwrap().arrivals.len(), 1);
}

#[tokio::test]
async fn test_every_subscriber_receives_each_publish() {
    let mut h = harness(NOON);
    let mut a = h.store.subscribe();
    let mut b = h.store.subscribe();
    h.feed.push_ok(cs_response());
    h.feed.push_ok(three_trains());

    h.poller.tick().await;
    h.clock.advance_ms(2000);
    h.poller.tick().await;

    for sub in [&mut a, &mut b] {
        assert_eq!(decode(&sub.recv().await.unwrap()).train_count(), 1);
        assert_eq!(decode(&sub.recv().await.unwrap()).train_count(), 3);
    }
}

#[tokio::test]
async fn test_late_subscriber_gets_cached_snapshot_first() {
    let mut h = harness(NOON);
    h.feed.push_ok(cs_response());
    h.poller.tick().await;

    let mut late = h.store.subscribe();
    let first = decode(&late.recv().await.unwrap());
    assert_eq!(first.timestamp, NOON);
    assert_eq!(first.train_count(), 1);
}

#[tokio::test]
async fn test_memory_swept_after_success() {
    let poller_config = PollerConfig::default().with_memory_ttl_ms(10_000);
    let mut h = harness_with(CacheConfig::default(), poller_config, NOON);
    h.feed.push_ok(three_trains());
    h.feed.push_ok(cs_response());

    h.poller.tick().await;
    assert_eq!(h.poller.remembered_trains(), 3);

    h.clock.advance_ms(20_000);
    h.poller.tick().await;
    assert_eq!(h.poller.remembered_trains(), 1);
}

#[tokio::test]
async fn test_same_seed_same_schedule() {
    let run = || async {
        let mut h = harness(NOON);
        let mut delays = Vec::new();
        let mut snapshots = Vec::new();
        h.feed.push_ok(three_trains());
        h.feed.push_err(FetchError::Timeout);
        h.feed.push_ok(cs_response());
        for _ in 0..3 {
            delays.push(h.poller.tick().await);
            snapshots.push(h.store.latest_snapshot_json().unwrap().to_string());
            h.clock.advance_ms(2000);
        }
        (delays, snapshots)
    };
    assert_eq!(run().await, run().await);
}

// ============================================================================
// Failure path
// ============================================================================

#[tokio::test]
async fn test_three_server_errors_back_off_and_reemit() {
    let mut h = harness(NOON);
    h.feed.push_ok(cs_response());
    for _ in 0..3 {
        h.feed.push_err(FetchError::Http { status: 500 });
    }

    h.poller.tick().await;
    let mut sub = h.store.subscribe();
    // Cached frame from the successful tick
    assert_eq!(decode(&sub.recv().await.unwrap()).timestamp, NOON);

    for (i, expected) in [6000u64, 12_000, 24_000].into_iter().enumerate() {
        h.clock.advance_ms(2000);
        let delay = h.poller.tick().await.as_millis() as u64;

        assert_eq!(h.poller.backoff_ms(), expected);
        let nominal = 2000 + expected;
        assert!((nominal - 100..=nominal + 100).contains(&delay), "delay {delay}");

        let reemitted = decode(&sub.recv().await.unwrap());
        assert!(reemitted.service_open);
        assert_eq!(reemitted.timestamp, NOON, "timestamp kept on re-emit");
        assert_eq!(reemitted.train_count(), 1);

        let board = h.store.latest_station_etas().unwrap();
        assert_eq!(board.timestamp, NOON + 2 * (i as i64 + 1), "board refreshed");
    }
}

#[tokio::test]
async fn test_backoff_caps_at_ceiling() {
    let mut h = harness(NOON);
    for _ in 0..6 {
        h.feed.push_err(FetchError::Http { status: 503 });
    }
    for _ in 0..6 {
        h.poller.tick().await;
    }
    assert_eq!(h.poller.backoff_ms(), 30_000);
}

#[tokio::test]
async fn test_failure_without_history_publishes_nothing() {
    let mut h = harness(NOON);
    h.feed.push_err(FetchError::Malformed("row 0: missing stop_id".into()));
    h.poller.tick().await;

    assert_eq!(h.poller.backoff_ms(), 4000);
    assert!(h.store.latest_snapshot().is_none());
    assert!(h.store.latest_station_etas().is_none());
}

#[tokio::test]
async fn test_recovery_resets_backoff() {
    let mut h = harness(NOON);
    h.feed.push_err(FetchError::Http { status: 429 });
    h.feed.push_ok(cs_response());

    h.poller.tick().await;
    assert_eq!(h.poller.backoff_ms(), 6000);
    let delay = h.poller.tick().await;
    assert_eq!(h.poller.backoff_ms(), 0);
    assert!(delay <= Duration::from_millis(2100));
}

// ============================================================================
// Service hours
// ============================================================================

#[tokio::test]
async fn test_closed_at_night() {
    // 00:59 local
    let mut h = harness(MIDNIGHT + 59 * 60);
    let mut sub = h.store.subscribe();

    let delay = h.poller.tick().await.as_millis() as i64;
    let until_open = (390 - 59) * 60_000;
    assert!((until_open - 100..=until_open + 100).contains(&delay));
    assert_eq!(h.feed.calls(), 0);

    let closed = decode(&sub.recv().await.unwrap());
    assert!(!closed.service_open);
    assert_eq!(closed.train_count(), 0);
    assert_eq!(closed.per_line.len(), 4);

    let board = h.store.latest_station_etas().unwrap();
    for line in LineName::ALL {
        assert_eq!(board.stations(line).len(), line.stations().len());
        assert!(board.stations(line).iter().all(|s| s.arrivals.is_empty()));
    }

    // Staying closed does not republish
    h.clock.advance_ms(60_000);
    h.poller.tick().await;
    let next = tokio::time::timeout(Duration::from_millis(20), sub.recv()).await;
    assert!(next.is_err());
    assert_eq!(h.feed.calls(), 0);
}

#[tokio::test]
async fn test_reopens_at_opening_time() {
    let mut h = harness(MIDNIGHT + 6 * 3600 + 29 * 60 + 59);
    h.poller.tick().await;
    assert_eq!(h.poller.service_open(), Some(false));

    h.clock.advance_ms(1000);
    h.feed.push_ok(cs_response());
    h.poller.tick().await;

    assert_eq!(h.poller.service_open(), Some(true));
    assert_eq!(h.feed.calls(), 1);
    assert!(h.store.latest_snapshot().unwrap().service_open);
}

#[tokio::test]
async fn test_closing_forgets_last_good_snapshot() {
    // 00:20 local, still open
    let mut h = harness(MIDNIGHT + 20 * 60);
    h.feed.push_ok(cs_response());
    h.poller.tick().await;
    assert!(h.poller.last_snapshot().is_some());

    // 00:31 closed
    h.clock.set_epoch(MIDNIGHT + 31 * 60);
    h.poller.tick().await;
    assert!(h.poller.last_snapshot().is_none());
    assert_eq!(h.poller.remembered_trains(), 0);

    // 06:30 open, but upstream is down: nothing stale is re-emitted
    h.clock.set_epoch(MIDNIGHT + 390 * 60);
    h.feed.push_err(FetchError::Http { status: 502 });
    h.poller.tick().await;

    let cached = h.store.latest_snapshot().unwrap();
    assert!(!cached.service_open);
    assert_eq!(h.poller.backoff_ms(), 6000);
}

#[tokio::test(start_paused = true)]
async fn test_closed_frame_outlives_cache_ttl() {
    let mut h = harness(MIDNIGHT + 3600);
    h.poller.tick().await;

    tokio::time::advance(Duration::from_secs(3600)).await;
    let cached = h.store.latest_snapshot().unwrap();
    assert!(!cached.service_open);
}

// ============================================================================
// Cache behaviour
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_open_snapshot_expires_after_ttl() {
    let mut h = harness(NOON);
    h.feed.push_ok(cs_response());
    h.poller.tick().await;

    tokio::time::advance(Duration::from_secs(14)).await;
    assert!(h.store.latest_snapshot().is_some());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(h.store.latest_snapshot().is_none());
    assert!(h.store.latest_station_etas().is_none());
}

#[tokio::test]
async fn test_disabled_store_poller_still_runs() {
    let mut h = harness_with(
        CacheConfig::default().with_enabled(false),
        PollerConfig::default(),
        NOON,
    );
    h.feed.push_ok(cs_response());

    let mut sub = h.store.subscribe();
    h.poller.tick().await;

    assert_eq!(h.feed.calls(), 1);
    assert!(h.poller.last_snapshot().is_some());
    assert!(h.store.latest_snapshot().is_none());
    assert!(sub.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_keeps_polling() {
    let h = harness(NOON);
    for _ in 0..3 {
        h.feed.push_ok(cs_response());
    }
    let feed = h.feed.clone();
    let store = Arc::clone(&h.store);

    let task = tokio::spawn(h.poller.run());
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(feed.calls() >= 3);
    assert!(store.latest_snapshot().is_some());
    task.abort();
}
