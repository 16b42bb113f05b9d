//! Track preprocessing.
//!
//! Turns a [`RawTrack`] into a canonical [`Track`]: time-sorted, duplicate
//! and incomplete rows removed, headings normalized, elapsed time in whole
//! seconds. Tracks that are too short or outside the study envelope are
//! rejected with a categorical [`Rejection`].

use std::collections::HashSet;

use tracing::debug;

use crate::config::PreprocessConfig;
use crate::types::{RawSample, RawTrack, Rejection, Sample, Track, Unsuitability};

/// Normalize a heading into [-180, 180).
///
/// Values already in range are returned unchanged, so the function is
/// idempotent.
pub fn normalize_heading(heading: f64) -> f64 {
    if (-180.0..180.0).contains(&heading) {
        return heading;
    }
    let wrapped = (heading + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Dedup key for an optional float. NaN counts as missing and both zeros
/// compare equal.
fn key(value: Option<f64>) -> Option<u64> {
    match value {
        Some(v) if v.is_nan() => None,
        Some(v) if v == 0.0 => Some(0.0f64.to_bits()),
        Some(v) => Some(v.to_bits()),
        None => None,
    }
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Convert a raw row into a clean sample, or `None` when any field is
/// missing. `time` is filled in later.
fn complete(raw: &RawSample) -> Option<(f64, Sample)> {
    let timestamp = present(raw.timestamp)?;
    Some((
        timestamp,
        Sample {
            time: 0,
            lat: present(raw.lat)?,
            lon: present(raw.lon)?,
            baro_alt_ft: present(raw.baro_alt_ft)?,
            geo_alt_ft: present(raw.geo_alt_ft)?,
            speed_kts: present(raw.speed_kts)?,
            heading_deg: normalize_heading(present(raw.heading_deg)?),
            vertical_rate_fpm: present(raw.vertical_rate_fpm)?,
            on_ground: raw.on_ground?,
        },
    ))
}

/// Clean `raw` into a canonical track.
pub fn preprocess(raw: &RawTrack, cfg: &PreprocessConfig) -> Result<Track, Rejection> {
    let mut rows: Vec<&RawSample> = raw.samples.iter().collect();
    // Stable: equal timestamps keep input order, so the first occurrence wins.
    rows.sort_by(|a, b| {
        let ta = present(a.timestamp).unwrap_or(f64::INFINITY);
        let tb = present(b.timestamp).unwrap_or(f64::INFINITY);
        ta.total_cmp(&tb)
    });

    let mut seen_time = HashSet::new();
    let mut seen_lon = HashSet::new();
    let mut seen_lat = HashSet::new();
    let mut seen_marker = HashSet::new();
    let mut cleaned: Vec<(f64, Sample)> = Vec::with_capacity(rows.len());

    for row in rows {
        // A missing value is a value of its own for the duplicate checks.
        if !seen_time.insert(key(row.timestamp)) {
            continue;
        }
        if !seen_lon.insert(key(row.lon)) {
            continue;
        }
        if !seen_lat.insert(key(row.lat)) {
            continue;
        }
        let Some((timestamp, sample)) = complete(row) else {
            continue;
        };
        if sample.baro_alt_ft >= cfg.altitude_ceiling_ft {
            continue;
        }
        if let Some(marker) = key(row.last_position) {
            if !seen_marker.insert(marker) {
                continue;
            }
        }
        cleaned.push((timestamp, sample));
    }

    if cleaned.len() < cfg.min_samples {
        debug!(
            icao24 = %raw.icao24,
            samples = cleaned.len(),
            "insufficient data after cleaning"
        );
        return Err(Rejection::InsufficientData {
            samples: cleaned.len(),
        });
    }

    let first = cleaned[0].0.trunc();
    let start = first as i64;
    let samples: Vec<Sample> = cleaned
        .into_iter()
        .map(|(ts, mut s)| {
            s.time = (ts.trunc() - first) as i64;
            s
        })
        .collect();

    if let Some(reason) = unsuitability(&samples, cfg) {
        return Err(Rejection::Unsuitable(reason));
    }

    Ok(Track {
        icao24: raw.icao24.trim().to_lowercase(),
        callsign: raw.callsign.trim().to_string(),
        start,
        samples,
    })
}

fn unsuitability(samples: &[Sample], cfg: &PreprocessConfig) -> Option<Unsuitability> {
    if samples.iter().all(|s| s.geo_alt_ft > cfg.high_altitude_ft)
        || samples.iter().all(|s| s.baro_alt_ft > cfg.high_altitude_ft)
    {
        return Some(Unsuitability::TooHigh);
    }
    if samples.iter().all(|s| s.geo_alt_ft < cfg.low_altitude_ft) {
        return Some(Unsuitability::TooLow);
    }
    if samples.iter().all(|s| s.speed_kts < cfg.slow_speed_kts) {
        return Some(Unsuitability::TooSlow);
    }
    if samples.iter().all(|s| s.on_ground) {
        return Some(Unsuitability::GroundOnly);
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(i: usize) -> RawSample {
        RawSample {
            timestamp: Some(1_600_000_000.0 + i as f64 * 5.0),
            lat: Some(19.0 + i as f64 * 0.001),
            lon: Some(72.7 + i as f64 * 0.001),
            baro_alt_ft: Some(2500.0 - i as f64 * 50.0),
            geo_alt_ft: Some(2600.0 - i as f64 * 50.0),
            speed_kts: Some(150.0),
            heading_deg: Some(90.0),
            vertical_rate_fpm: Some(-600.0),
            on_ground: Some(false),
            last_position: None,
        }
    }

    fn raw_track(samples: Vec<RawSample>) -> RawTrack {
        RawTrack {
            icao24: " 800ABC ".into(),
            callsign: "IGO101  ".into(),
            samples,
        }
    }

    #[test]
    fn test_normalize_heading_range_and_idempotent() {
        for h in [-720.0, -540.0, -180.0, -0.5, 0.0, 90.0, 179.99, 180.0, 270.0, 359.0, 900.5] {
            let n = normalize_heading(h);
            assert!((-180.0..180.0).contains(&n), "{h} -> {n}");
            assert_eq!(normalize_heading(n), n);
        }
        assert_eq!(normalize_heading(270.0), -90.0);
        assert_eq!(normalize_heading(180.0), -180.0);
        assert_eq!(normalize_heading(-90.0), -90.0);
    }

    #[test]
    fn test_clean_track() {
        let track = preprocess(&raw_track((0..8).map(raw).collect()), &PreprocessConfig::default())
            .unwrap();
        assert_eq!(track.len(), 8);
        assert_eq!(track.icao24, "800abc");
        assert_eq!(track.callsign, "IGO101");
        assert_eq!(track.start, 1_600_000_000);
        assert_eq!(track.times(), vec![0, 5, 10, 15, 20, 25, 30, 35]);
    }

    #[test]
    fn test_insufficient_data() {
        let result = preprocess(&raw_track((0..4).map(raw).collect()), &PreprocessConfig::default());
        assert_eq!(result, Err(Rejection::InsufficientData { samples: 4 }));
    }

    #[test]
    fn test_insufficient_before_suitability() {
        // Four samples that are also too high: the sample count wins.
        let samples = (0..4)
            .map(|i| RawSample {
                geo_alt_ft: Some(8000.0),
                baro_alt_ft: Some(8000.0),
                ..raw(i)
            })
            .collect();
        let result = preprocess(&raw_track(samples), &PreprocessConfig::default());
        assert_eq!(result, Err(Rejection::InsufficientData { samples: 4 }));
    }

    #[test]
    fn test_drops_duplicates_and_incomplete_rows() {
        let mut samples: Vec<RawSample> = (0..8).map(raw).collect();
        // duplicate timestamp
        samples.push(RawSample {
            lat: Some(20.0),
            lon: Some(73.0),
            ..raw(3)
        });
        // duplicate longitude
        samples.push(RawSample {
            timestamp: Some(1_600_001_000.0),
            lat: Some(20.5),
            ..raw(1)
        });
        // missing vertical rate
        samples.push(RawSample {
            timestamp: Some(1_600_002_000.0),
            lat: Some(21.0),
            lon: Some(74.0),
            vertical_rate_fpm: None,
            ..raw(0)
        });
        // above the altitude ceiling
        samples.push(RawSample {
            timestamp: Some(1_600_003_000.0),
            lat: Some(21.5),
            lon: Some(74.5),
            baro_alt_ft: Some(10_000.0),
            ..raw(0)
        });

        let track = preprocess(&raw_track(samples), &PreprocessConfig::default()).unwrap();
        assert_eq!(track.len(), 8);
        assert_eq!(track.duration(), 35);
    }

    #[test]
    fn test_sorts_and_truncates_time() {
        let mut samples: Vec<RawSample> = (0..6).map(raw).collect();
        samples.reverse();
        samples[0].timestamp = Some(1_600_000_025.9);
        let track = preprocess(&raw_track(samples), &PreprocessConfig::default()).unwrap();
        assert_eq!(track.times(), vec![0, 5, 10, 15, 20, 25]);
    }

    #[test]
    fn test_duplicate_last_position() {
        let samples = (0..7)
            .map(|i| RawSample {
                last_position: Some(if i < 2 { 1.0 } else { i as f64 }),
                ..raw(i)
            })
            .collect();
        let track = preprocess(&raw_track(samples), &PreprocessConfig::default()).unwrap();
        assert_eq!(track.len(), 6);
    }

    #[test]
    fn test_heading_normalized() {
        let samples = (0..5)
            .map(|i| RawSample {
                heading_deg: Some(270.0),
                ..raw(i)
            })
            .collect();
        let track = preprocess(&raw_track(samples), &PreprocessConfig::default()).unwrap();
        assert!(track.samples.iter().all(|s| s.heading_deg == -90.0));
    }

    #[test]
    fn test_unsuitable_reasons() {
        let cfg = PreprocessConfig::default();
        let with = |f: fn(RawSample) -> RawSample| raw_track((0..6).map(raw).map(f).collect());

        let high = with(|s| RawSample {
            baro_alt_ft: Some(5000.0),
            ..s
        });
        assert_eq!(
            preprocess(&high, &cfg),
            Err(Rejection::Unsuitable(Unsuitability::TooHigh))
        );

        let low = with(|s| RawSample {
            geo_alt_ft: Some(300.0),
            ..s
        });
        assert_eq!(
            preprocess(&low, &cfg),
            Err(Rejection::Unsuitable(Unsuitability::TooLow))
        );

        let slow = with(|s| RawSample {
            speed_kts: Some(20.0),
            ..s
        });
        assert_eq!(
            preprocess(&slow, &cfg),
            Err(Rejection::Unsuitable(Unsuitability::TooSlow))
        );

        let ground = with(|s| RawSample {
            on_ground: Some(true),
            ..s
        });
        assert_eq!(
            preprocess(&ground, &cfg),
            Err(Rejection::Unsuitable(Unsuitability::GroundOnly))
        );
    }
}
