//! Static network topology for the Lisbon metro.
//!
//! Four lines, each with a canonical station order running from its first
//! terminal to its last. Upstream destination codes map onto a line and a
//! terminal; train ids carry a one-letter suffix naming their line.
//!
//! ```rust
//! use metro_live::topology::{destination, line_from_train_id, LineName};
//!
//! assert_eq!(LineName::Verde.station_index("CS"), Some(12));
//! assert_eq!(line_from_train_id("123C"), Some(LineName::Verde));
//!
//! let dest = destination("42").unwrap();
//! assert_eq!(dest.line, LineName::Azul);
//! assert_eq!(dest.terminal, "SP");
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Lines
// ============================================================================

/// One of the four metro lines.
///
/// The declaration order is the canonical line order used whenever lines are
/// listed (snapshot keys serialize in this order).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineName {
    /// Green line: Telheiras - Cais do Sodré
    Verde,
    /// Blue line: Reboleira - Santa Apolónia
    Azul,
    /// Yellow line: Odivelas - Rato
    Amarela,
    /// Red line: Aeroporto - São Sebastião
    Vermelha,
}

impl LineName {
    /// All lines in canonical order.
    pub const ALL: [LineName; 4] = [
        LineName::Verde,
        LineName::Azul,
        LineName::Amarela,
        LineName::Vermelha,
    ];

    /// Line name as used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            LineName::Verde => "verde",
            LineName::Azul => "azul",
            LineName::Amarela => "amarela",
            LineName::Vermelha => "vermelha",
        }
    }

    /// Parse a wire line name (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        LineName::ALL
            .into_iter()
            .find(|line| line.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Station ids along this line, first terminal to last.
    pub fn stations(self) -> &'static [&'static str] {
        match self {
            LineName::Verde => VERDE,
            LineName::Azul => AZUL,
            LineName::Amarela => AMARELA,
            LineName::Vermelha => VERMELHA,
        }
    }

    /// Position of `station` in the canonical order, if it is on this line.
    pub fn station_index(self, station: &str) -> Option<usize> {
        self.stations().iter().position(|s| *s == station)
    }

    /// Whether `station` is served by this line.
    pub fn contains(self, station: &str) -> bool {
        self.station_index(station).is_some()
    }

    /// First and last station of the line.
    pub fn terminals(self) -> (&'static str, &'static str) {
        let stations = self.stations();
        (stations[0], stations[stations.len() - 1])
    }
}

impl fmt::Display for LineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Telheiras -> Cais do Sodré
const VERDE: &[&str] = &[
    "TE", "CG", "AL", "RM", "AE", "AM", "AR", "AN", "IN", "MM", "RO", "BC", "CS",
];

// Reboleira -> Santa Apolónia
const AZUL: &[&str] = &[
    "RB", "AS", "AF", "PO", "CA", "CM", "AH", "LA", "JZ", "PE", "SS", "PA", "MP", "AV", "RE",
    "BC", "TP", "SP",
];

// Odivelas -> Rato
const AMARELA: &[&str] = &[
    "OD", "SR", "AX", "LU", "QC", "CG", "CU", "EC", "CP", "SA", "PI", "MP", "RA",
];

// Aeroporto -> São Sebastião
const VERMELHA: &[&str] = &[
    "AP", "EN", "MO", "OR", "CR", "OS", "CH", "BV", "OL", "AM", "SA", "SS",
];

// ============================================================================
// Destinations
// ============================================================================

/// Metadata behind an upstream destination code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Destination {
    /// Upstream code (e.g. "54")
    pub code: &'static str,
    /// Human-readable terminal name
    pub name: &'static str,
    /// Line the destination belongs to
    pub line: LineName,
    /// Terminal station id
    pub terminal: &'static str,
}

const DESTINATIONS: &[Destination] = &[
    Destination { code: "50", name: "Telheiras", line: LineName::Verde, terminal: "TE" },
    Destination { code: "54", name: "Cais do Sodré", line: LineName::Verde, terminal: "CS" },
    Destination { code: "33", name: "Reboleira", line: LineName::Azul, terminal: "RB" },
    Destination { code: "42", name: "Santa Apolónia", line: LineName::Azul, terminal: "SP" },
    Destination { code: "43", name: "Odivelas", line: LineName::Amarela, terminal: "OD" },
    Destination { code: "48", name: "Rato", line: LineName::Amarela, terminal: "RA" },
    Destination { code: "60", name: "Aeroporto", line: LineName::Vermelha, terminal: "AP" },
    Destination { code: "38", name: "São Sebastião", line: LineName::Vermelha, terminal: "SS" },
];

/// Look up a destination code. Surrounding whitespace is ignored.
pub fn destination(code: &str) -> Option<&'static Destination> {
    let code = code.trim();
    DESTINATIONS.iter().find(|d| d.code == code)
}

/// Every known destination.
pub fn destinations() -> &'static [Destination] {
    DESTINATIONS
}

// ============================================================================
// Train ids
// ============================================================================

/// Line encoded in the last character of a train id.
///
/// `A` azul, `B` amarela, `C` verde, `D` vermelha (case-insensitive).
pub fn line_from_train_id(train_id: &str) -> Option<LineName> {
    match train_id.trim().chars().last()?.to_ascii_uppercase() {
        'A' => Some(LineName::Azul),
        'B' => Some(LineName::Amarela),
        'C' => Some(LineName::Verde),
        'D' => Some(LineName::Vermelha),
        _ => None,
    }
}

// ============================================================================
// Station names
// ============================================================================

const STATION_NAMES: &[(&str, &str)] = &[
    ("RB", "Reboleira"),
    ("AS", "Amadora Este"),
    ("AF", "Alfornelos"),
    ("PO", "Pontinha"),
    ("CA", "Carnide"),
    ("CM", "Colégio Militar/Luz"),
    ("AH", "Alto dos Moinhos"),
    ("LA", "Laranjeiras"),
    ("JZ", "Jardim Zoológico"),
    ("PE", "Praça de Espanha"),
    ("SS", "São Sebastião"),
    ("PA", "Parque"),
    ("MP", "Marquês de Pombal"),
    ("AV", "Avenida"),
    ("RE", "Restauradores"),
    ("BC", "Baixa/Chiado"),
    ("TP", "Terreiro do Paço"),
    ("SP", "Santa Apolónia"),
    ("TE", "Telheiras"),
    ("CG", "Campo Grande"),
    ("AL", "Alvalade"),
    ("RM", "Roma"),
    ("AE", "Areeiro"),
    ("AM", "Alameda"),
    ("AR", "Arroios"),
    ("AN", "Anjos"),
    ("IN", "Intendente"),
    ("MM", "Martim Moniz"),
    ("RO", "Rossio"),
    ("CS", "Cais do Sodré"),
    ("OD", "Odivelas"),
    ("SR", "Senhor Roubado"),
    ("AX", "Ameixoeira"),
    ("LU", "Lumiar"),
    ("QC", "Quinta das Conchas"),
    ("CU", "Cidade Universitária"),
    ("EC", "Entre Campos"),
    ("CP", "Campo Pequeno"),
    ("SA", "Saldanha"),
    ("PI", "Picoas"),
    ("RA", "Rato"),
    ("AP", "Aeroporto"),
    ("EN", "Encarnação"),
    ("MO", "Moscavide"),
    ("OR", "Oriente"),
    ("CR", "Cabo Ruivo"),
    ("OS", "Olivais"),
    ("CH", "Chelas"),
    ("BV", "Bela Vista"),
    ("OL", "Olaias"),
];

/// Display name of a station id.
pub fn station_name(id: &str) -> Option<&'static str> {
    STATION_NAMES
        .iter()
        .find(|(sid, _)| *sid == id)
        .map(|(_, name)| *name)
}

/// Lines serving a station (interchanges return more than one).
pub fn lines_at(station: &str) -> impl Iterator<Item = LineName> + '_ {
    LineName::ALL
        .into_iter()
        .filter(move |line| line.contains(station))
}
