//! Edge case and boundary condition tests across the pipeline

use chrono::{TimeZone, Utc};
use metro_live::{
    build_station_etas, normalize, Config, ConfigError, FeedResponse, FetchError, LineName,
    ServiceHours, ServiceStatus, Snapshot, StationEtaSnapshot, TrainMemory,
};

// ============================================================================
// Upstream payloads
// ============================================================================

#[test]
fn feed_without_resposta_is_empty() {
    let response = FeedResponse::from_slice(br#"{"codigo":"500"}"#).unwrap();
    assert!(response.rows.is_empty());
}

#[test]
fn feed_with_non_array_resposta_is_empty() {
    let body = r#"{"resposta":"Circulação normal"}"#;
    let response = FeedResponse::from_slice(body.as_bytes()).unwrap();
    assert!(response.rows.is_empty());
}

#[test]
fn feed_top_level_array_is_malformed() {
    let err = FeedResponse::from_slice(b"[]").unwrap_err();
    assert!(matches!(err, FetchError::Malformed(_)));
}

#[test]
fn feed_row_without_stop_id_is_malformed() {
    let err = FeedResponse::from_slice(br#"{"resposta":[{"comboio":"1C"}]}"#).unwrap_err();
    assert!(matches!(err, FetchError::Malformed(_)));
}

#[test]
fn feed_invalid_json_is_malformed() {
    assert!(matches!(
        FeedResponse::from_slice(b"<html>"),
        Err(FetchError::Malformed(_))
    ));
}

#[test]
fn feed_real_shape_with_blank_slots() {
    let body = br#"{
        "resposta": [
            {"stop_id":"AM","hora":"20240115120000","comboio":"8C","tempoChegada1":"120",
             "comboio2":"","tempoChegada2":"","comboio3":null,"tempoChegada3":"--",
             "destino":"54"},
            {"stop_id":"SS","comboio":"31D","tempoChegada1":"-5","destino":" "}
        ]
    }"#;
    let response = FeedResponse::from_slice(body).unwrap();
    assert_eq!(response.rows.len(), 2);
    assert_eq!(response.sighting_count(), 1);
    assert_eq!(response.rows[1].destination_code(), None);
}

// ============================================================================
// Normalizer boundaries
// ============================================================================

#[test]
fn dwell_zero_with_zero_eta_gives_full_progress() {
    let response = FeedResponse::from_slice(
        br#"{"resposta":[{"stop_id":"CS","comboio":"1C","tempoChegada1":"0"}]}"#,
    )
    .unwrap();
    let mut memory = TrainMemory::new();
    let trains = normalize(&response, &mut memory, 0, 0);
    assert_eq!(trains[0].progress, 1.0);
    assert_eq!(memory.get("1C").unwrap().segment_start_eta, 1);
}

#[test]
fn eta_rising_on_same_segment_clamps_progress() {
    let at = |eta: &str| {
        FeedResponse::from_slice(
            format!(r#"{{"resposta":[{{"stop_id":"RO","comboio":"1C","tempoChegada1":"{eta}"}}]}}"#)
                .as_bytes(),
        )
        .unwrap()
    };
    let mut memory = TrainMemory::new();
    normalize(&at("10"), &mut memory, 5, 0);
    // Delay pushes the ETA above the recorded segment start
    let trains = normalize(&at("500"), &mut memory, 5, 2);
    assert_eq!(trains[0].progress, 0.0);
}

#[test]
fn huge_eta_does_not_overflow() {
    let response = FeedResponse::from_slice(
        br#"{"resposta":[{"stop_id":"CS","comboio":"1C","tempoChegada1":"4294967295"}]}"#,
    )
    .unwrap();
    let trains = normalize(&response, &mut TrainMemory::new(), 25, 0);
    assert_eq!(trains[0].eta_next_seconds, u32::MAX);
    assert!((0.0..=1.0).contains(&trains[0].progress));
}

#[test]
fn station_board_empty_response_matches_empty_board() {
    assert_eq!(
        build_station_etas(&FeedResponse::default(), 9),
        StationEtaSnapshot::empty(9)
    );
}

#[test]
fn snapshot_round_trips_through_wire_json() {
    let response = FeedResponse::from_slice(
        br#"{"resposta":[{"stop_id":"BC","comboio":"5A","tempoChegada1":"20","destino":"42"}]}"#,
    )
    .unwrap();
    let trains = normalize(&response, &mut TrainMemory::new(), 25, 0);
    let snapshot = Snapshot::from_trains(77, trains, true);

    let json = serde_json::to_string(&snapshot).unwrap();
    let back: Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);
    assert_eq!(back.trains(LineName::Azul)[0].destination_name, "Santa Apolónia");
}

// ============================================================================
// Service hours boundaries
// ============================================================================

#[test]
fn service_closes_exactly_at_close_minute() {
    let hours = ServiceHours::default();
    let closing = Utc.with_ymd_and_hms(2024, 1, 16, 0, 30, 0).unwrap();
    assert_eq!(
        hours.status(closing),
        ServiceStatus::Closed {
            ms_until_open: 6 * 3_600_000
        }
    );
}

#[test]
fn service_open_window_spanning_whole_day() {
    // open == close wraps: open all day
    let hours = ServiceHours::new(chrono_tz::UTC, 0, 0);
    let now = Utc.with_ymd_and_hms(2024, 1, 16, 3, 0, 0).unwrap();
    assert!(hours.status(now).is_open());
}

#[test]
fn service_dst_change_day() {
    // 2024-03-31: Lisbon jumps from 01:00 to 02:00; 05:30 UTC is 06:30 local
    let hours = ServiceHours::default();
    let now = Utc.with_ymd_and_hms(2024, 3, 31, 5, 30, 0).unwrap();
    assert!(hours.status(now).is_open());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn config_rejects_negative_port() {
    let err = Config::from_lookup(|name| (name == "PORT").then(|| "-1".to_string())).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
fn config_rejects_unknown_timezone_at_gate_build() {
    let config =
        Config::from_lookup(|name| (name == "SERVICE_TIMEZONE").then(|| "Lisboa".to_string()))
            .unwrap();
    assert!(matches!(
        ServiceHours::from_config(&config.service_hours),
        Err(ConfigError::UnknownTimezone(_))
    ));
}
