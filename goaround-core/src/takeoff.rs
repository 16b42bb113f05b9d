//! Takeoff filter.
//!
//! A departing flight shows a low, climbing, on-ground or steeply climbing
//! start. Such tracks are rejected before classification so that an
//! initial climb is never mistaken for a missed approach.

use std::fmt;

use serde::Serialize;

use crate::config::TakeoffConfig;
use crate::stats::mean;
use crate::types::Track;

/// Fewest leading samples the climbing-start split can work with.
const MIN_HEAD_SAMPLES: usize = 3;

/// Which takeoff condition matched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TakeoffSignature {
    /// Too few samples to tell.
    TooShort,
    /// Every leading geometric altitude is below the low threshold.
    LowStart,
    /// Low start with barometric altitude increasing.
    ClimbingStart,
    /// Starts on the ground below the ground threshold.
    GroundStart,
    /// Mean leading vertical rate above the climb threshold.
    SteepClimb,
}

impl fmt::Display for TakeoffSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TakeoffSignature::TooShort => "too short",
            TakeoffSignature::LowStart => "low start",
            TakeoffSignature::ClimbingStart => "climbing start",
            TakeoffSignature::GroundStart => "ground start",
            TakeoffSignature::SteepClimb => "steep climb",
        };
        f.write_str(s)
    }
}

/// Check whether `track` looks like a takeoff.
///
/// Returns the first matching signature, or `None` if the flight may be
/// an approach. A head shorter than three samples cannot be judged and
/// counts as too short.
pub fn check_takeoff(track: &Track, cfg: &TakeoffConfig) -> Option<TakeoffSignature> {
    let head_len = cfg.head_samples.max(MIN_HEAD_SAMPLES);
    if track.len() < cfg.min_samples || track.len() < head_len {
        return Some(TakeoffSignature::TooShort);
    }

    let head = &track.samples[..head_len];
    let geo: Vec<f64> = head.iter().map(|s| s.geo_alt_ft).collect();
    let baro: Vec<f64> = head.iter().map(|s| s.baro_alt_ft).collect();
    let rates: Vec<f64> = head.iter().map(|s| s.vertical_rate_fpm).collect();

    if geo.iter().all(|&a| a < cfg.low_altitude_ft) {
        return Some(TakeoffSignature::LowStart);
    }

    let mean_geo = mean(&geo);
    let mean_baro = mean(&baro);

    if mean_geo < cfg.climb_check_altitude_ft && mean(&baro[..2]) < mean(&baro[2..]) {
        return Some(TakeoffSignature::ClimbingStart);
    }

    if head.iter().all(|s| s.on_ground) && mean_baro < cfg.ground_altitude_ft {
        return Some(TakeoffSignature::GroundStart);
    }

    if mean(&rates) > cfg.climb_rate_fpm {
        return Some(TakeoffSignature::SteepClimb);
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
