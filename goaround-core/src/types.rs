//! Shared types, error enums, and the per-flight data model for goaround-core.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::takeoff::TakeoffSignature;

/// Fatal errors produced by goaround-core (configuration and I/O only).
///
/// Per-flight outcomes such as "takeoff" or "too few samples" are not errors,
/// see [`Rejection`].
#[derive(Debug, Error)]
pub enum GoAroundError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("invalid runway '{name}': {reason}")]
    InvalidRunway { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, GoAroundError>;

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Categorical, non-fatal reasons a flight is not evaluated.
///
/// Returned as the `Err` side of [`crate::engine::Engine::process`]; the
/// caller records it and moves on to the next flight.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum Rejection {
    #[error("excluded aircraft: {0}")]
    Excluded(Exclusion),
    #[error("insufficient data: {samples} samples after cleaning")]
    InsufficientData { samples: usize },
    #[error("unsuitable flight: {0}")]
    Unsuitable(Unsuitability),
    #[error("takeoff: {0}")]
    Takeoff(TakeoffSignature),
    #[error("classifier returned {actual} labels for {expected} samples")]
    MalformedLabels { expected: usize, actual: usize },
    #[error("no flight phase change")]
    NoStateChange,
}

impl Rejection {
    /// Short stable key, used for tallies.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::Excluded(_) => "excluded",
            Rejection::InsufficientData { .. } => "insufficient_data",
            Rejection::Unsuitable(_) => "unsuitable",
            Rejection::Takeoff(_) => "takeoff",
            Rejection::MalformedLabels { .. } => "malformed_labels",
            Rejection::NoStateChange => "no_state_change",
        }
    }
}

/// Why an aircraft was excluded before any processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Exclusion {
    /// Address is on the configured exclusion list.
    Address(String),
    /// Callsign starts with a ground-vehicle prefix.
    Callsign(String),
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::Address(a) => write!(f, "address {a}"),
            Exclusion::Callsign(c) => write!(f, "callsign {c}"),
        }
    }
}

/// Data categories that make a flight unsuitable for the study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unsuitability {
    TooHigh,
    TooLow,
    TooSlow,
    GroundOnly,
}

impl fmt::Display for Unsuitability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unsuitability::TooHigh => write!(f, "too high"),
            Unsuitability::TooLow => write!(f, "too low"),
            Unsuitability::TooSlow => write!(f, "too slow"),
            Unsuitability::GroundOnly => write!(f, "ground only"),
        }
    }
}

// ---------------------------------------------------------------------------
// Flight phase labels
// ---------------------------------------------------------------------------

/// Flight phase of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseLabel {
    #[serde(rename = "GND")]
    Ground,
    #[serde(rename = "CL")]
    Climb,
    #[serde(rename = "CR")]
    Cruise,
    #[serde(rename = "DE")]
    Descent,
    #[serde(rename = "LVL")]
    Level,
    #[serde(rename = "NA")]
    NotAvailable,
}

impl PhaseLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseLabel::Ground => "GND",
            PhaseLabel::Climb => "CL",
            PhaseLabel::Cruise => "CR",
            PhaseLabel::Descent => "DE",
            PhaseLabel::Level => "LVL",
            PhaseLabel::NotAvailable => "NA",
        }
    }
}

impl fmt::Display for PhaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        LatLon { lat, lon }
    }

    /// Planar distance in degrees, treating lat/lon as a flat grid.
    pub fn planar_distance(&self, lat: f64, lon: f64) -> f64 {
        let dlat = lat - self.lat;
        let dlon = lon - self.lon;
        (dlat * dlat + dlon * dlon).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Samples and tracks
// ---------------------------------------------------------------------------

/// One uncleaned surveillance report. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Absolute time, epoch seconds.
    pub timestamp: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub baro_alt_ft: Option<f64>,
    pub geo_alt_ft: Option<f64>,
    pub speed_kts: Option<f64>,
    pub heading_deg: Option<f64>,
    pub vertical_rate_fpm: Option<f64>,
    pub on_ground: Option<bool>,
    /// Time of the last position update, when the feed provides it.
    pub last_position: Option<f64>,
}

/// Uncleaned samples for one flight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrack {
    pub icao24: String,
    pub callsign: String,
    pub samples: Vec<RawSample>,
}

/// One cleaned sample. `time` is seconds since the first sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time: i64,
    pub lat: f64,
    pub lon: f64,
    pub baro_alt_ft: f64,
    pub geo_alt_ft: f64,
    pub speed_kts: f64,
    /// Track angle in [-180, 180).
    pub heading_deg: f64,
    pub vertical_rate_fpm: f64,
    pub on_ground: bool,
}

/// Canonical, cleaned track for one flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub icao24: String,
    pub callsign: String,
    /// Epoch second of the first sample.
    pub start: i64,
    pub samples: Vec<Sample>,
}

impl Track {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Seconds between first and last sample.
    pub fn duration(&self) -> i64 {
        self.samples.last().map(|s| s.time).unwrap_or(0)
    }

    /// Epoch second of the last sample.
    pub fn stop(&self) -> i64 {
        self.start + self.duration()
    }

    /// Epoch second of the sample at `index`.
    pub fn timestamp_at(&self, index: usize) -> Option<i64> {
        self.samples.get(index).map(|s| self.start + s.time)
    }

    pub fn times(&self) -> Vec<i64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn geo_altitudes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.geo_alt_ft).collect()
    }

    pub fn baro_altitudes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.baro_alt_ft).collect()
    }

    pub fn speeds(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.speed_kts).collect()
    }

    pub fn vertical_rates(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.vertical_rate_fpm).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: i64) -> Sample {
        Sample {
            time,
            lat: 19.0,
            lon: 72.8,
            baro_alt_ft: 1000.0,
            geo_alt_ft: 1100.0,
            speed_kts: 140.0,
            heading_deg: 90.0,
            vertical_rate_fpm: -700.0,
            on_ground: false,
        }
    }

    #[test]
    fn test_track_duration_and_stop() {
        let track = Track {
            icao24: "800b7b".into(),
            callsign: "IGO366".into(),
            start: 1_500_000_000,
            samples: vec![sample(0), sample(4), sample(9)],
        };
        assert_eq!(track.duration(), 9);
        assert_eq!(track.stop(), 1_500_000_009);
        assert_eq!(track.timestamp_at(1), Some(1_500_000_004));
        assert_eq!(track.timestamp_at(3), None);
        assert_eq!(track.times(), vec![0, 4, 9]);
    }

    #[test]
    fn test_empty_track_duration() {
        let track = Track {
            icao24: String::new(),
            callsign: String::new(),
            start: 10,
            samples: vec![],
        };
        assert!(track.is_empty());
        assert_eq!(track.duration(), 0);
        assert_eq!(track.stop(), 10);
    }

    #[test]
    fn test_planar_distance() {
        let p = LatLon::new(19.0, 72.0);
        assert!((p.planar_distance(22.0, 76.0) - 5.0).abs() < 1e-12);
        assert_eq!(p.planar_distance(19.0, 72.0), 0.0);
    }

    #[test]
    fn test_phase_label_strings() {
        assert_eq!(PhaseLabel::Descent.to_string(), "DE");
        assert_eq!(PhaseLabel::Level.as_str(), "LVL");
        assert_eq!(PhaseLabel::NotAvailable.as_str(), "NA");
    }

    #[test]
    fn test_rejection_display() {
        let r = Rejection::Unsuitable(Unsuitability::TooSlow);
        assert_eq!(r.to_string(), "unsuitable flight: too slow");
        assert_eq!(r.kind(), "unsuitable");

        let r = Rejection::InsufficientData { samples: 3 };
        assert_eq!(r.to_string(), "insufficient data: 3 samples after cleaning");

        let r = Rejection::Excluded(Exclusion::Callsign("FOLOWME1".into()));
        assert_eq!(r.to_string(), "excluded aircraft: callsign FOLOWME1");
    }
}
