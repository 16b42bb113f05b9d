//! Small numeric helpers and approach-segment statistics.
//!
//! All reductions skip NaN values. An empty (or all-NaN) input gives NaN
//! from [`mean`] and [`variance`] and `None` from [`argmin`].

use serde::Serialize;

use crate::runway::GateCandidate;
use crate::types::Track;

/// Arithmetic mean ignoring NaN.
pub fn mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Population variance ignoring NaN.
pub fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.is_nan() {
        return f64::NAN;
    }
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + (v - m) * (v - m), n + 1));
    sum / n as f64
}

/// Index of the smallest non-NaN value. The first occurrence wins ties.
pub fn argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

// ---------------------------------------------------------------------------
// Approach statistics
// ---------------------------------------------------------------------------

/// Variability of the approach segment, for report rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApproachStats {
    /// Samples in the approach segment.
    pub samples: usize,
    /// Distance of the gate candidate, when a runway was matched.
    pub gate_distance_deg: Option<f64>,
    pub vertical_rate_var: Option<f64>,
    pub heading_var: Option<f64>,
    pub lat_var: Option<f64>,
    pub lon_var: Option<f64>,
    pub speed_var: Option<f64>,
}

/// Compute statistics over samples `0..=gate sample`, or the whole track
/// when no gate candidate is given.
pub fn approach_stats(track: &Track, gate: Option<&GateCandidate>) -> ApproachStats {
    let end = match gate {
        Some(g) => (g.sample + 1).min(track.len()),
        None => track.len(),
    };
    let segment = &track.samples[..end];

    let var = |f: fn(&crate::types::Sample) -> f64| {
        let values: Vec<f64> = segment.iter().map(f).collect();
        let v = variance(&values);
        (!v.is_nan()).then_some(v)
    };

    ApproachStats {
        samples: segment.len(),
        gate_distance_deg: gate.map(|g| g.distance_deg),
        vertical_rate_var: var(|s| s.vertical_rate_fpm),
        heading_var: var(|s| s.heading_deg),
        lat_var: var(|s| s.lat),
        lon_var: var(|s| s.lon),
        speed_var: var(|s| s.speed_kts),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
