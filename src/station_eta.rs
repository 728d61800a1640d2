//! Per-station arrival boards.
//!
//! Unlike [`crate::normalize`], this view does no direction inference. Each
//! sighting is filed under the line named by its train-id suffix, and only
//! if the station is actually on that line; interchange stations would
//! otherwise collect the other line's trains.

use std::collections::HashMap;

use crate::feed::FeedResponse;
use crate::snapshot::{Arrival, LineStations, StationEta, StationEtaSnapshot};
use crate::topology::{destination, line_from_train_id, LineName};

/// Build the arrival board for every line from one poll response.
///
/// Every canonical station appears, in canonical order, with its arrivals
/// sorted soonest first.
pub fn build_station_etas(response: &FeedResponse, now: i64) -> StationEtaSnapshot {
    let mut grouped: HashMap<(LineName, &str), Vec<Arrival>> = HashMap::new();

    for row in &response.rows {
        let code = row.destination_code();
        for sighting in row.sightings() {
            let Some(line) = line_from_train_id(sighting.train_id) else {
                continue;
            };
            if !line.contains(&row.stop_id) {
                continue;
            }
            grouped
                .entry((line, row.stop_id.as_str()))
                .or_default()
                .push(Arrival {
                    train_id: sighting.train_id.to_string(),
                    eta_seconds: sighting.eta_seconds,
                    destination_code: code.map(str::to_string),
                    destination_name: code
                        .and_then(destination)
                        .map(|d| d.name.to_string()),
                });
        }
    }

    let per_line = LineName::ALL
        .into_iter()
        .map(|line| {
            let stations = line
                .stations()
                .iter()
                .map(|station_id| {
                    let mut arrivals = grouped.remove(&(line, *station_id)).unwrap_or_default();
                    arrivals.sort_by_key(|a| a.eta_seconds);
                    StationEta {
                        station_id: (*station_id).to_string(),
                        arrivals,
                    }
                })
                .collect();
            (line, LineStations { stations })
        })
        .collect();

    StationEtaSnapshot {
        timestamp: now,
        per_line,
    }
}
