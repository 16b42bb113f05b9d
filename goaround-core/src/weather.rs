//! Weather observations and barometric altitude correction.
//!
//! Pressure altitude assumes the ISA sea-level atmosphere. Given the
//! surface temperature and pressure from the nearest airport observation,
//! each barometric altitude is converted back to pressure and then to a
//! height above the actual pressure datum.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Track;

/// ISA sea-level pressure in hPa.
pub const ISA_PRESSURE_HPA: f64 = 1013.25;
/// ISA sea-level temperature in K.
pub const ISA_TEMPERATURE_K: f64 = 288.15;
/// Tropospheric temperature lapse rate in K/m.
pub const LAPSE_RATE: f64 = 0.0065;
/// Barometric exponent g·M/(R·L).
pub const PRESSURE_EXPONENT: f64 = 5.2561;
pub const FEET_PER_METRE: f64 = 3.28084;

/// One parsed airport weather report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// Epoch seconds.
    pub timestamp: i64,
    pub temperature_c: f64,
    pub dewpoint_c: f64,
    pub wind_speed_kts: f64,
    pub wind_gust_kts: f64,
    pub wind_dir_deg: f64,
    /// Thunderstorm or towering cumulus reported.
    pub convective: bool,
    pub visibility: f64,
    pub pressure_hpa: f64,
    pub cloud_base_ft: f64,
}

/// Observations keyed by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherTable {
    observations: BTreeMap<i64, WeatherObservation>,
}

impl WeatherTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an observation. A later insert at the same timestamp replaces
    /// the earlier one.
    pub fn insert(&mut self, obs: WeatherObservation) {
        self.observations.insert(obs.timestamp, obs);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observation nearest to `time`. When two are equally close the
    /// earlier one wins.
    pub fn closest(&self, time: i64) -> Option<&WeatherObservation> {
        let before = self.observations.range(..=time).next_back().map(|(_, o)| o);
        let after = self.observations.range(time..).next().map(|(_, o)| o);
        match (before, after) {
            (Some(b), Some(a)) => {
                if (a.timestamp - time) < (time - b.timestamp) {
                    Some(a)
                } else {
                    Some(b)
                }
            }
            (b, a) => b.or(a),
        }
    }

    /// Nearest observation, provided it is less than `max_offset_s` away.
    pub fn lookup(&self, time: i64, max_offset_s: i64) -> Option<&WeatherObservation> {
        self.closest(time)
            .filter(|o| (o.timestamp - time).abs() < max_offset_s)
    }
}

impl FromIterator<WeatherObservation> for WeatherTable {
    fn from_iter<I: IntoIterator<Item = WeatherObservation>>(iter: I) -> Self {
        let mut table = WeatherTable::new();
        for obs in iter {
            table.insert(obs);
        }
        table
    }
}

// ---------------------------------------------------------------------------
// ISA conversion
// ---------------------------------------------------------------------------

/// Static pressure at pressure altitude `altitude_ft` in the ISA.
pub fn isa_pressure_hpa(altitude_ft: f64) -> f64 {
    let h = altitude_ft / FEET_PER_METRE;
    ISA_PRESSURE_HPA * (1.0 - LAPSE_RATE * h / ISA_TEMPERATURE_K).powf(PRESSURE_EXPONENT)
}

/// Height in feet at which pressure `pressure_hpa` is found, for surface
/// temperature `temperature_c` and surface pressure `surface_hpa`.
pub fn corrected_altitude_ft(pressure_hpa: f64, temperature_c: f64, surface_hpa: f64) -> f64 {
    let t0 = 273.15 + temperature_c;
    (t0 / LAPSE_RATE)
        * (1.0 - (pressure_hpa / surface_hpa).powf(1.0 / PRESSURE_EXPONENT))
        * FEET_PER_METRE
}

/// Correct barometric altitudes using surface temperature and pressure.
pub fn correct_baro(altitudes: &[f64], temperature_c: f64, surface_hpa: f64) -> Vec<f64> {
    altitudes
        .iter()
        .map(|&h| corrected_altitude_ft(isa_pressure_hpa(h), temperature_c, surface_hpa))
        .collect()
}

/// Corrected altitude channel plus the observation that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AltitudeCorrection {
    pub altitudes: Vec<f64>,
    /// `None` when no observation was close enough; `altitudes` is then the
    /// uncorrected barometric channel.
    pub observation: Option<WeatherObservation>,
}

impl AltitudeCorrection {
    pub fn is_corrected(&self) -> bool {
        self.observation.is_some()
    }
}

/// Correct the track's barometric altitudes with the observation nearest to
/// the middle of the flight.
pub fn correct_track(track: &Track, weather: &WeatherTable, max_offset_s: i64) -> AltitudeCorrection {
    let reference = track.start + track.duration() / 2;
    let baro = track.baro_altitudes();

    match weather.lookup(reference, max_offset_s) {
        Some(obs) => AltitudeCorrection {
            altitudes: correct_baro(&baro, obs.temperature_c, obs.pressure_hpa),
            observation: Some(*obs),
        },
        None => AltitudeCorrection {
            altitudes: baro,
            observation: None,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
