//! Published snapshot types (serde-based).
//!
//! These are the JSON values consumers see. Field names follow the wire
//! format the frontend already reads (`t`, `lines`, `etaNext`, `progress01`).
//!
//! # Snapshot
//!
//! ```json
//! {
//!   "t": 1700000000,
//!   "lines": {
//!     "verde": { "trains": [ { "id": "12C", "line": "verde", "from": "BC",
//!                "to": "CS", "etaNext": 45, "progress01": 0.35,
//!                "dest": "Cais do Sodré" } ] },
//!     "azul": { "trains": [] },
//!     "amarela": { "trains": [] },
//!     "vermelha": { "trains": [] }
//!   },
//!   "serviceOpen": true
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::topology::LineName;

// ============================================================================
// Train positions
// ============================================================================

/// One train's inferred position for a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InferredTrain {
    /// Upstream train id (e.g. "12C")
    pub id: String,
    /// Line the train runs on
    pub line: LineName,
    /// Station the train is leaving
    pub from: String,
    /// Next station
    pub to: String,
    /// Seconds until arrival at `to`
    #[serde(rename = "etaNext")]
    pub eta_next_seconds: u32,
    /// Fraction of the `from` -> `to` segment covered, in `[0, 1]`
    #[serde(rename = "progress01")]
    pub progress: f64,
    /// Terminal display name (empty when unknown)
    #[serde(rename = "dest")]
    pub destination_name: String,
}

/// Trains on one line.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LineTrains {
    /// Trains in first-seen order
    pub trains: Vec<InferredTrain>,
}

fn service_open_default() -> bool {
    true
}

/// Complete position view across all lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Creation time, epoch seconds
    #[serde(rename = "t")]
    pub timestamp: i64,
    /// Every line, including lines with no trains
    #[serde(rename = "lines")]
    pub per_line: BTreeMap<LineName, LineTrains>,
    /// Whether the network is within service hours (absent means open)
    #[serde(rename = "serviceOpen", default = "service_open_default")]
    pub service_open: bool,
}

impl Snapshot {
    /// Group trains by line. Every line is present.
    pub fn from_trains(timestamp: i64, trains: Vec<InferredTrain>, service_open: bool) -> Self {
        let mut per_line: BTreeMap<LineName, LineTrains> = LineName::ALL
            .into_iter()
            .map(|line| (line, LineTrains::default()))
            .collect();
        for train in trains {
            per_line.entry(train.line).or_default().trains.push(train);
        }
        Self {
            timestamp,
            per_line,
            service_open,
        }
    }

    /// Synthetic snapshot published while the network is closed.
    pub fn closed(timestamp: i64) -> Self {
        Self::from_trains(timestamp, Vec::new(), false)
    }

    /// Trains on one line.
    pub fn trains(&self, line: LineName) -> &[InferredTrain] {
        self.per_line
            .get(&line)
            .map(|l| l.trains.as_slice())
            .unwrap_or(&[])
    }

    /// Total trains across every line.
    pub fn train_count(&self) -> usize {
        self.per_line.values().map(|l| l.trains.len()).sum()
    }

    /// Find a train by id.
    pub fn train(&self, id: &str) -> Option<&InferredTrain> {
        self.per_line
            .values()
            .flat_map(|l| l.trains.iter())
            .find(|t| t.id == id)
    }
}

// ============================================================================
// Station arrivals
// ============================================================================

/// One expected arrival at a station.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    /// Train id
    #[serde(rename = "trainId")]
    pub train_id: String,
    /// Seconds until arrival
    #[serde(rename = "etaSeconds")]
    pub eta_seconds: u32,
    /// Upstream destination code
    #[serde(rename = "destinoId", default, skip_serializing_if = "Option::is_none")]
    pub destination_code: Option<String>,
    /// Terminal display name, when the code is known
    #[serde(rename = "destination", default, skip_serializing_if = "Option::is_none")]
    pub destination_name: Option<String>,
}

/// Arrivals at one station, soonest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationEta {
    /// Station id
    #[serde(rename = "stationId")]
    pub station_id: String,
    /// Arrivals sorted ascending by ETA
    pub arrivals: Vec<Arrival>,
}

/// Stations of one line in canonical order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStations {
    /// One entry per canonical station
    pub stations: Vec<StationEta>,
}

/// Per-station arrival board across all lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationEtaSnapshot {
    /// Creation time, epoch seconds
    #[serde(rename = "t")]
    pub timestamp: i64,
    /// Every line with every canonical station
    #[serde(rename = "lines")]
    pub per_line: BTreeMap<LineName, LineStations>,
}

impl StationEtaSnapshot {
    /// Board with every station present and no arrivals.
    pub fn empty(timestamp: i64) -> Self {
        let per_line = LineName::ALL
            .into_iter()
            .map(|line| {
                let stations = line
                    .stations()
                    .iter()
                    .map(|id| StationEta {
                        station_id: (*id).to_string(),
                        arrivals: Vec::new(),
                    })
                    .collect();
                (line, LineStations { stations })
            })
            .collect();
        Self {
            timestamp,
            per_line,
        }
    }

    /// Stations of one line.
    pub fn stations(&self, line: LineName) -> &[StationEta] {
        self.per_line
            .get(&line)
            .map(|l| l.stations.as_slice())
            .unwrap_or(&[])
    }

    /// One station's arrivals on one line.
    pub fn station(&self, line: LineName, station_id: &str) -> Option<&StationEta> {
        self.stations(line)
            .iter()
            .find(|s| s.station_id == station_id)
    }

    /// Copy with a new timestamp.
    pub fn refreshed(&self, timestamp: i64) -> Self {
        Self {
            timestamp,
            per_line: self.per_line.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train(id: &str, line: LineName) -> InferredTrain {
        InferredTrain {
            id: id.to_string(),
            line,
            from: "A".into(),
            to: "B".into(),
            eta_next_seconds: 30,
            progress: 0.5,
            destination_name: String::new(),
        }
    }

    #[test]
    fn test_from_trains_has_every_line() {
        let snapshot = Snapshot::from_trains(10, vec![train("1A", LineName::Azul)], true);
        assert_eq!(snapshot.per_line.len(), 4);
        assert_eq!(snapshot.trains(LineName::Azul).len(), 1);
        assert!(snapshot.trains(LineName::Verde).is_empty());
        assert_eq!(snapshot.train_count(), 1);
        assert!(snapshot.train("1A").is_some());
    }

    #[test]
    fn test_closed_snapshot() {
        let snapshot = Snapshot::closed(99);
        assert!(!snapshot.service_open);
        assert_eq!(snapshot.train_count(), 0);
        assert_eq!(snapshot.per_line.len(), 4);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let snapshot = Snapshot::from_trains(7, vec![train("2C", LineName::Verde)], true);
        let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["t"], 7);
        assert_eq!(json["serviceOpen"], true);
        let t = &json["lines"]["verde"]["trains"][0];
        assert_eq!(t["etaNext"], 30);
        assert_eq!(t["progress01"], 0.5);
        assert_eq!(t["dest"], "");
        assert!(json["lines"]["vermelha"]["trains"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_lines_serialize_in_canonical_order() {
        let json = serde_json::to_string(&Snapshot::closed(0)).unwrap();
        let verde = json.find("verde").unwrap();
        let azul = json.find("azul").unwrap();
        let amarela = json.find("amarela").unwrap();
        let vermelha = json.find("vermelha").unwrap();
        assert!(verde < azul && azul < amarela && amarela < vermelha);
    }

    #[test]
    fn test_missing_service_open_means_open() {
        let json = r#"{"t":1,"lines":{"verde":{"trains":[]}}}"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.service_open);
    }

    #[test]
    fn test_empty_station_board_is_complete() {
        let board = StationEtaSnapshot::empty(5);
        for line in LineName::ALL {
            let ids: Vec<_> = board.stations(line).iter().map(|s| s.station_id.as_str()).collect();
            assert_eq!(ids, line.stations());
        }
    }

    #[test]
    fn test_arrival_omits_absent_destination() {
        let arrival = Arrival {
            train_id: "1A".into(),
            eta_seconds: 10,
            destination_code: None,
            destination_name: None,
        };
        let json = serde_json::to_string(&arrival).unwrap();
        assert_eq!(json, r#"{"trainId":"1A","etaSeconds":10}"#);
    }

    #[test]
    fn test_refreshed_keeps_board() {
        let board = StationEtaSnapshot::empty(5);
        let refreshed = board.refreshed(9);
        assert_eq!(refreshed.timestamp, 9);
        assert_eq!(refreshed.per_line, board.per_line);
    }
}
