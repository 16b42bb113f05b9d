//! Flight phase classification.
//!
//! [`PhaseClassifier`] is the seam between the engine and whatever labels
//! samples as ground, climb, cruise, descent or level flight. Any closure
//! with the matching signature is a classifier, which keeps tests free to
//! inject exact label sequences. [`FuzzyClassifier`] is the bundled
//! implementation: windowed means fed through fuzzy membership functions.

use crate::stats::mean;
use crate::types::{PhaseLabel, Rejection, Track};

/// Labels every sample of a track with a flight phase.
///
/// Implementations must return exactly one label per input sample.
pub trait PhaseClassifier {
    fn classify(
        &self,
        times: &[i64],
        altitudes: &[f64],
        speeds: &[f64],
        vertical_rates: &[f64],
        window_s: i64,
    ) -> Vec<PhaseLabel>;
}

impl<F> PhaseClassifier for F
where
    F: Fn(&[i64], &[f64], &[f64], &[f64], i64) -> Vec<PhaseLabel>,
{
    fn classify(
        &self,
        times: &[i64],
        altitudes: &[f64],
        speeds: &[f64],
        vertical_rates: &[f64],
        window_s: i64,
    ) -> Vec<PhaseLabel> {
        self(times, altitudes, speeds, vertical_rates, window_s)
    }
}

/// Classify `track` and force `GND` wherever the sample is on the ground.
///
/// Classification runs on geometric altitude.
pub fn label_track<C: PhaseClassifier + ?Sized>(
    classifier: &C,
    track: &Track,
    window_s: i64,
) -> Result<Vec<PhaseLabel>, Rejection> {
    let mut labels = classifier.classify(
        &track.times(),
        &track.geo_altitudes(),
        &track.speeds(),
        &track.vertical_rates(),
        window_s,
    );

    if labels.len() != track.len() {
        return Err(Rejection::MalformedLabels {
            expected: track.len(),
            actual: labels.len(),
        });
    }

    for (label, sample) in labels.iter_mut().zip(&track.samples) {
        if sample.on_ground {
            *label = PhaseLabel::Ground;
        }
    }
    Ok(labels)
}

/// Whether the label sequence changes at least once.
pub fn has_state_change(labels: &[PhaseLabel]) -> bool {
    labels.windows(2).any(|w| w[0] != w[1])
}

// ---------------------------------------------------------------------------
// Membership functions
// ---------------------------------------------------------------------------

fn gauss(x: f64, mean: f64, sigma: f64) -> f64 {
    (-((x - mean) * (x - mean)) / (2.0 * sigma * sigma)).exp()
}

/// S-shaped membership rising from 0 at `a` to 1 at `b`.
fn smf(x: f64, a: f64, b: f64) -> f64 {
    if x <= a {
        0.0
    } else if x >= b {
        1.0
    } else if x <= (a + b) / 2.0 {
        2.0 * ((x - a) / (b - a)).powi(2)
    } else {
        1.0 - 2.0 * ((x - b) / (b - a)).powi(2)
    }
}

/// Z-shaped membership falling from 1 at `a` to 0 at `b`.
fn zmf(x: f64, a: f64, b: f64) -> f64 {
    1.0 - smf(x, a, b)
}

fn min3(a: f64, b: f64, c: f64) -> f64 {
    a.min(b).min(c)
}

// ---------------------------------------------------------------------------
// FuzzyClassifier
// ---------------------------------------------------------------------------

/// Fuzzy-logic flight phase classifier.
///
/// Samples are bucketed by `time / window_s`; each bucket's mean altitude,
/// speed and vertical rate are fuzzified and the strongest of the five
/// phase rules labels every sample in the bucket.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyClassifier;

impl FuzzyClassifier {
    /// Label one set of mean values.
    pub fn label(&self, altitude: f64, speed: f64, vertical_rate: f64) -> PhaseLabel {
        if altitude.is_nan() || speed.is_nan() || vertical_rate.is_nan() {
            return PhaseLabel::NotAvailable;
        }

        let alt_gnd = zmf(altitude, 0.0, 200.0);
        let alt_lo = gauss(altitude, 10_000.0, 10_000.0);
        let alt_hi = gauss(altitude, 35_000.0, 20_000.0);

        let roc_zero = gauss(vertical_rate, 0.0, 100.0);
        let roc_plus = smf(vertical_rate, 10.0, 1000.0);
        let roc_minus = zmf(vertical_rate, -1000.0, -10.0);

        let spd_hi = gauss(speed, 600.0, 100.0);
        let spd_md = gauss(speed, 300.0, 100.0);
        let spd_lo = gauss(speed, 0.0, 50.0);

        let rules = [
            (PhaseLabel::Ground, alt_gnd.min(spd_lo)),
            (PhaseLabel::Climb, min3(alt_lo, roc_plus, spd_md)),
            (PhaseLabel::Descent, min3(alt_lo, roc_minus, spd_md)),
            (PhaseLabel::Cruise, min3(alt_hi, roc_zero, spd_hi)),
            (PhaseLabel::Level, min3(alt_lo, roc_zero, spd_md)),
        ];

        let mut best = (PhaseLabel::NotAvailable, 1e-6);
        for (label, activation) in rules {
            if activation >= best.1 {
                best = (label, activation);
            }
        }
        best.0
    }
}

impl PhaseClassifier for FuzzyClassifier {
    fn classify(
        &self,
        times: &[i64],
        altitudes: &[f64],
        speeds: &[f64],
        vertical_rates: &[f64],
        window_s: i64,
    ) -> Vec<PhaseLabel> {
        let n = times.len();
        let window = window_s.max(1);
        let mut labels = vec![PhaseLabel::NotAvailable; n];

        let mut start = 0;
        while start < n {
            let bucket = times[start].div_euclid(window);
            let mut end = start + 1;
            while end < n && times[end].div_euclid(window) == bucket {
                end += 1;
            }

            let slice = |v: &[f64]| mean(v.get(start..end).unwrap_or(&[]));
            let label = self.label(slice(altitudes), slice(speeds), slice(vertical_rates));
            labels[start..end].fill(label);

            start = end;
        }
        labels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;

    #[test]
    fn test_membership_shapes() {
        assert_eq!(smf(0.0, 10.0, 1000.0), 0.0);
        assert_eq!(smf(2000.0, 10.0, 1000.0), 1.0);
        assert!((smf(505.0, 10.0, 1000.0) - 0.5).abs() < 1e-12);
        assert_eq!(zmf(-2000.0, -1000.0, -10.0), 1.0);
        assert_eq!(gauss(5.0, 5.0, 1.0), 1.0);
    }

    #[test]
    fn test_fuzzy_labels() {
        let fc = FuzzyClassifier;
        assert_eq!(fc.label(0.0, 10.0, 0.0), PhaseLabel::Ground);
        assert_eq!(fc.label(3000.0, 250.0, 1500.0), PhaseLabel::Climb);
        assert_eq!(fc.label(3000.0, 250.0, -1500.0), PhaseLabel::Descent);
        assert_eq!(fc.label(3000.0, 250.0, 0.0), PhaseLabel::Level);
        assert_eq!(fc.label(37_000.0, 480.0, 0.0), PhaseLabel::Cruise);
        assert_eq!(fc.label(f64::NAN, 250.0, 0.0), PhaseLabel::NotAvailable);
    }

    #[test]
    fn test_fuzzy_classify_buckets() {
        let times = [0, 5, 10, 15, 20, 25];
        let alts = [3000.0, 2900.0, 2800.0, 2800.0, 2900.0, 3000.0];
        let speeds = [250.0; 6];
        let rates = [-1200.0, -1200.0, -1200.0, 1200.0, 1200.0, 1200.0];

        let labels = FuzzyClassifier.classify(&times, &alts, &speeds, &rates, 15);
        assert_eq!(labels.len(), 6);
        assert!(labels[..3].iter().all(|&l| l == PhaseLabel::Descent));
        assert!(labels[3..].iter().all(|&l| l == PhaseLabel::Climb));
    }

    #[test]
    fn test_closure_classifier_and_ground_override() {
        let samples = (0..4)
            .map(|i| Sample {
                time: i * 5,
                lat: 0.0,
                lon: 0.0,
                baro_alt_ft: 100.0,
                geo_alt_ft: 100.0,
                speed_kts: 120.0,
                heading_deg: 0.0,
                vertical_rate_fpm: 0.0,
                on_ground: i == 3,
            })
            .collect();
        let track = Track {
            icao24: "a".into(),
            callsign: "b".into(),
            start: 0,
            samples,
        };

        let fixed = |t: &[i64], _: &[f64], _: &[f64], _: &[f64], _: i64| {
            vec![PhaseLabel::Descent; t.len()]
        };
        let labels = label_track(&fixed, &track, 15).unwrap();
        assert_eq!(
            labels,
            vec![
                PhaseLabel::Descent,
                PhaseLabel::Descent,
                PhaseLabel::Descent,
                PhaseLabel::Ground
            ]
        );
        assert!(has_state_change(&labels));
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let track = Track {
            icao24: "a".into(),
            callsign: "b".into(),
            start: 0,
            samples: vec![],
        };
        let bad = |_: &[i64], _: &[f64], _: &[f64], _: &[f64], _: i64| vec![PhaseLabel::Level];
        assert_eq!(
            label_track(&bad, &track, 15),
            Err(Rejection::MalformedLabels {
                expected: 0,
                actual: 1
            })
        );
    }

    #[test]
    fn test_no_state_change() {
        assert!(!has_state_change(&[PhaseLabel::Level; 5]));
        assert!(!has_state_change(&[]));
    }
}
