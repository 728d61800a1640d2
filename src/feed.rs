//! Upstream arrival-time feed model.
//!
//! The feed answers one GET with every station's next arrivals:
//!
//! ```text
//! {
//!   "resposta": [
//!     { "stop_id": "CS", "hora": "20240101123000",
//!       "comboio": "12C", "tempoChegada1": "45",
//!       "comboio2": "14C", "tempoChegada2": "300",
//!       "destino": "50" }
//!   ]
//! }
//! ```
//!
//! A missing or non-array `resposta` (the feed reports a suspended service
//! that way) parses as zero rows. Anything that is not a JSON object, or a
//! row without a string `stop_id`, is rejected as malformed.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::FetchError;

/// One upstream station row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RawObservation {
    /// Station id (e.g. "CS")
    pub stop_id: String,
    /// Upstream observation timestamp, passed through untouched
    #[serde(default)]
    pub hora: Option<String>,
    /// First train id
    #[serde(default, deserialize_with = "string_or_number")]
    pub comboio: Option<String>,
    /// First train ETA in seconds (string or number on the wire)
    #[serde(default, rename = "tempoChegada1", deserialize_with = "string_or_number")]
    pub tempo_chegada1: Option<String>,
    /// Second train id
    #[serde(default, deserialize_with = "string_or_number")]
    pub comboio2: Option<String>,
    /// Second train ETA
    #[serde(default, rename = "tempoChegada2", deserialize_with = "string_or_number")]
    pub tempo_chegada2: Option<String>,
    /// Third train id
    #[serde(default, deserialize_with = "string_or_number")]
    pub comboio3: Option<String>,
    /// Third train ETA
    #[serde(default, rename = "tempoChegada3", deserialize_with = "string_or_number")]
    pub tempo_chegada3: Option<String>,
    /// Destination code shared by the row's trains
    #[serde(default)]
    pub destino: Option<String>,
}

// Train ids and ETAs arrive as strings, but numbers are accepted too.
// Anything else (objects, arrays, booleans) reads as absent.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// A usable (train, eta) pair from a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sighting<'a> {
    /// Train id
    pub train_id: &'a str,
    /// Seconds until arrival at the row's station
    pub eta_seconds: u32,
}

impl RawObservation {
    /// Create a row for a station with no trains.
    pub fn new(stop_id: impl Into<String>) -> Self {
        Self {
            stop_id: stop_id.into(),
            ..Default::default()
        }
    }

    /// Set one of the three train slots (1-based). Other slots are ignored.
    pub fn with_train(mut self, slot: u8, train_id: &str, eta: &str) -> Self {
        let (id, eta_field) = match slot {
            1 => (&mut self.comboio, &mut self.tempo_chegada1),
            2 => (&mut self.comboio2, &mut self.tempo_chegada2),
            3 => (&mut self.comboio3, &mut self.tempo_chegada3),
            _ => return self,
        };
        *id = Some(train_id.to_string());
        *eta_field = Some(eta.to_string());
        self
    }

    /// Set the destination code.
    pub fn with_destination(mut self, code: &str) -> Self {
        self.destino = Some(code.to_string());
        self
    }

    /// Destination code, if present and non-blank.
    pub fn destination_code(&self) -> Option<&str> {
        self.destino
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    /// Usable sightings in slot order.
    ///
    /// Slots with a missing or blank train id, or with an ETA that does not
    /// parse, are skipped.
    pub fn sightings(&self) -> impl Iterator<Item = Sighting<'_>> {
        [
            (&self.comboio, &self.tempo_chegada1),
            (&self.comboio2, &self.tempo_chegada2),
            (&self.comboio3, &self.tempo_chegada3),
        ]
        .into_iter()
        .filter_map(|(id, eta)| {
            let train_id = id.as_deref()?.trim();
            if train_id.is_empty() {
                return None;
            }
            let eta_seconds = parse_eta(eta.as_deref()?)?;
            Some(Sighting {
                train_id,
                eta_seconds,
            })
        })
    }
}

/// Lenient ETA parse: leading decimal digits after trimming.
///
/// `"45"` and `"45s"` give 45; `""`, `"--"` and `"-5"` give `None`.
pub fn parse_eta(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let end = raw
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    raw[..end].parse().ok()
}

/// A parsed poll response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedResponse {
    /// Station rows in upstream order
    pub rows: Vec<RawObservation>,
}

impl FeedResponse {
    /// Build a response from rows.
    pub fn new(rows: Vec<RawObservation>) -> Self {
        Self { rows }
    }

    /// Parse a raw body.
    pub fn from_slice(body: &[u8]) -> Result<Self, FetchError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| FetchError::Malformed(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Validate and convert an already-decoded body.
    pub fn from_value(value: Value) -> Result<Self, FetchError> {
        let Value::Object(mut body) = value else {
            return Err(FetchError::Malformed("body is not a JSON object".into()));
        };

        let rows = match body.remove("resposta") {
            Some(Value::Array(rows)) => rows,
            _ => return Ok(Self::default()),
        };

        rows.into_iter()
            .enumerate()
            .map(|(i, row)| {
                serde_json::from_value(row)
                    .map_err(|e| FetchError::Malformed(format!("row {i}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Total usable sightings across every row.
    pub fn sighting_count(&self) -> usize {
        self.rows.iter().map(|row| row.sightings().count()).sum()
    }
}
