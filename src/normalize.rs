//! Train position inference from per-station arrival rows.
//!
//! The upstream feed never says where a train *is*; it only lists, per
//! station, which trains are expected and how soon. The same train usually
//! shows up at two or three stations ahead of it. This module folds those
//! redundant sightings into one [`InferredTrain`] per train id:
//!
//! 1. The soonest sighting is the next stop (`to`).
//! 2. The destination code fixes the line and the terminal the train runs
//!    towards, which gives the direction along the canonical station order.
//! 3. The station one step back against that direction is `from`.
//! 4. Progress along `from -> to` is estimated from how much of the ETA has
//!    elapsed since the train first targeted `to`.
//!
//! Step 4 needs memory across ticks, kept in a [`TrainMemory`] owned by the
//! poller.
//!
//! ```rust
//! use metro_live::feed::{FeedResponse, RawObservation};
//! use metro_live::normalize::{normalize, TrainMemory};
//! use metro_live::topology::LineName;
//!
//! let response = FeedResponse::new(vec![
//!     RawObservation::new("CS").with_train(1, "123C", "45"),
//! ]);
//! let mut memory = TrainMemory::new();
//! let trains = normalize(&response, &mut memory, 25, 1_700_000_000);
//!
//! assert_eq!(trains[0].line, LineName::Verde);
//! assert_eq!(trains[0].to, "CS");
//! assert_eq!(trains[0].from, "BC");
//! ```

use std::collections::HashMap;

use crate::feed::FeedResponse;
use crate::snapshot::InferredTrain;
use crate::topology::{destination, line_from_train_id, LineName};

/// Line assumed when neither the destination nor the train id names one.
pub const FALLBACK_LINE: LineName = LineName::Verde;

// ============================================================================
// Per-train memory
// ============================================================================

/// What the poller remembers about one train between ticks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainSegmentState {
    /// Next stop at the last sighting
    pub to: String,
    /// ETA (seconds) recorded when the train started heading to `to`
    pub segment_start_eta: u32,
    /// Epoch seconds of the last sighting
    pub last_seen_at: i64,
}

/// Per-train segment memory keyed by train id.
///
/// Trains that leave the feed are only removed by [`TrainMemory::sweep`].
#[derive(Clone, Debug, Default)]
pub struct TrainMemory {
    trains: HashMap<String, TrainSegmentState>,
}

impl TrainMemory {
    /// Create an empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// State recorded for a train.
    pub fn get(&self, train_id: &str) -> Option<&TrainSegmentState> {
        self.trains.get(train_id)
    }

    /// Record a train's state, replacing any previous one.
    pub fn insert(&mut self, train_id: impl Into<String>, state: TrainSegmentState) {
        self.trains.insert(train_id.into(), state);
    }

    /// Number of remembered trains.
    pub fn len(&self) -> usize {
        self.trains.len()
    }

    /// Whether no train is remembered.
    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }

    /// Drop trains not seen for more than `max_age_secs`.
    ///
    /// Returns how many entries were removed.
    pub fn sweep(&mut self, now: i64, max_age_secs: i64) -> usize {
        let before = self.trains.len();
        self.trains
            .retain(|_, state| now.saturating_sub(state.last_seen_at) <= max_age_secs);
        before - self.trains.len()
    }
}

// ============================================================================
// Normalization
// ============================================================================

#[derive(Clone, Copy, Debug)]
struct Observation<'a> {
    stop: &'a str,
    eta: u32,
    destination: Option<&'a str>,
}

/// Infer one train per train id from a poll response.
///
/// `memory` is read for segment continuity and then updated for every train
/// in the result. Output order is the order train ids were first seen.
pub fn normalize(
    response: &FeedResponse,
    memory: &mut TrainMemory,
    dwell_seconds: u32,
    now: i64,
) -> Vec<InferredTrain> {
    let grouped = group_by_train(response);
    let mut result = Vec::with_capacity(grouped.len());

    for (train_id, mut observations) in grouped {
        // Stable sort: equal ETAs keep feed order.
        observations.sort_by_key(|o| o.eta);
        let nearest = observations[0];
        let second = observations.get(1).copied();

        let to = nearest.stop;
        let eta_next = nearest.eta;

        let dest = nearest
            .destination
            .and_then(destination)
            .or_else(|| second.and_then(|o| o.destination).and_then(destination));

        let line = dest
            .map(|d| d.line)
            .or_else(|| line_from_train_id(train_id))
            .unwrap_or(FALLBACK_LINE);
        let terminal = dest.map(|d| d.terminal).unwrap_or(to);
        let destination_name = dest.map(|d| d.name).unwrap_or_default();

        let sign = direction_sign(line, to, terminal, second.map(|o| o.stop));
        let from = previous_station(line, to, sign);

        let segment_start_eta = segment_start(memory.get(train_id), to, eta_next, dwell_seconds);
        let progress = segment_progress(eta_next, segment_start_eta);

        result.push(InferredTrain {
            id: train_id.to_string(),
            line,
            from: from.to_string(),
            to: to.to_string(),
            eta_next_seconds: eta_next,
            progress,
            destination_name: destination_name.to_string(),
        });

        memory.insert(
            train_id,
            TrainSegmentState {
                to: to.to_string(),
                segment_start_eta,
                last_seen_at: now,
            },
        );
    }

    result
}

/// Group sightings by train id, keeping first-seen order.
fn group_by_train(response: &FeedResponse) -> Vec<(&str, Vec<Observation<'_>>)> {
    let mut order: Vec<(&str, Vec<Observation<'_>>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for row in &response.rows {
        let destination = row.destination_code();
        for sighting in row.sightings() {
            let slot = *index.entry(sighting.train_id).or_insert_with(|| {
                order.push((sighting.train_id, Vec::new()));
                order.len() - 1
            });
            order[slot].1.push(Observation {
                stop: &row.stop_id,
                eta: sighting.eta_seconds,
                destination,
            });
        }
    }

    order
}

/// +1 when moving towards the end of the canonical order, -1 towards the start.
fn direction_sign(line: LineName, to: &str, terminal: &str, second_stop: Option<&str>) -> isize {
    let to_idx = line.station_index(to);

    if let (Some(to_idx), Some(term_idx)) = (to_idx, line.station_index(terminal)) {
        let sign = (term_idx as isize - to_idx as isize).signum();
        if sign != 0 {
            return sign;
        }
    }

    // Terminal unknown or already reached: use the second-nearest sighting.
    if let (Some(to_idx), Some(idx2)) = (to_idx, second_stop.and_then(|s| line.station_index(s))) {
        let sign = (idx2 as isize - to_idx as isize).signum();
        if sign != 0 {
            return sign;
        }
    }

    1
}

/// Station one step behind `to`, stepping forward instead at a terminal.
fn previous_station(line: LineName, to: &str, sign: isize) -> &str {
    let stations = line.stations();
    let Some(to_idx) = line.station_index(to) else {
        return to;
    };
    let len = stations.len() as isize;
    let to_idx = to_idx as isize;

    [to_idx - sign, to_idx + sign]
        .into_iter()
        .find(|i| (0..len).contains(i))
        .map(|i| stations[i as usize])
        .unwrap_or(to)
}

/// Segment start ETA: carried over while `to` is unchanged, else reseeded.
fn segment_start(
    previous: Option<&TrainSegmentState>,
    to: &str,
    eta_next: u32,
    dwell_seconds: u32,
) -> u32 {
    let start = match previous {
        Some(prev) if prev.to == to => prev.segment_start_eta,
        _ => eta_next.saturating_add(dwell_seconds),
    };
    if start == 0 {
        eta_next.max(1)
    } else {
        start
    }
}

/// Fraction of the segment covered, clamped to `[0, 1]`.
fn segment_progress(eta_next: u32, segment_start_eta: u32) -> f64 {
    if eta_next == 0 {
        return 1.0;
    }
    let p = 1.0 - f64::from(eta_next) / f64::from(segment_start_eta);
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
