//! Runway reference data, gate matching, and the distance-to-runway channel.
//!
//! Each runway has an approach gate roughly 2.6 nm before its threshold.
//! A flight is matched to the runway whose gate it passes closest to,
//! provided the passing sample looks like an approach (low, not climbing,
//! heading down the runway).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GateConfig;
use crate::stats::argmin;
use crate::types::{GoAroundError, LatLon, Result, Track};

/// Inclusive heading interval in degrees, [-180, 180) convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadingRange {
    pub min: f64,
    pub max: f64,
}

impl HeadingRange {
    pub fn contains(&self, heading: f64) -> bool {
        heading >= self.min && heading <= self.max
    }
}

/// Degree-6 polynomial, coefficients highest power first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polynomial(pub [f64; 7]);

impl Polynomial {
    /// Evaluate at `x` (Horner).
    pub fn eval(&self, x: f64) -> f64 {
        self.0.iter().fold(0.0, |acc, c| acc * x + c)
    }
}

/// Lower, mean and upper envelope of a reference profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileBand {
    pub lower: Polynomial,
    pub mean: Polynomial,
    pub upper: Polynomial,
}

impl ProfileBand {
    /// `(lower, mean, upper)` at distance `x`.
    pub fn eval(&self, x: f64) -> (f64, f64, f64) {
        (self.lower.eval(x), self.mean.eval(x), self.upper.eval(x))
    }
}

/// Typical approach profiles as a function of distance to the runway in km.
///
/// Carried for downstream plotting; detection does not use them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceProfiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<ProfileBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_rate: Option<ProfileBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<ProfileBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<ProfileBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<ProfileBand>,
}

impl ReferenceProfiles {
    pub fn is_empty(&self) -> bool {
        self.altitude.is_none()
            && self.vertical_rate.is_none()
            && self.heading.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
    }
}

/// A landing direction at the airport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runway {
    pub name: String,
    pub main_heading: f64,
    pub heading_window: [HeadingRange; 2],
    pub near_threshold: LatLon,
    pub far_threshold: LatLon,
    pub gate: LatLon,
    #[serde(default, skip_serializing_if = "ReferenceProfiles::is_empty")]
    pub profiles: ReferenceProfiles,
}

impl Runway {
    pub fn accepts_heading(&self, heading: f64) -> bool {
        self.heading_window.iter().any(|r| r.contains(heading))
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(GoAroundError::InvalidRunway {
                name: self.name.clone(),
                reason: reason.to_string(),
            })
        };

        if self.name.trim().is_empty() {
            return invalid("empty name");
        }
        for range in &self.heading_window {
            if !(range.min <= range.max) {
                return invalid("heading range min exceeds max");
            }
            if range.min < -180.0 || range.max > 180.0 {
                return invalid("heading range outside [-180, 180]");
            }
        }
        for p in [self.near_threshold, self.far_threshold, self.gate] {
            if !(-90.0..=90.0).contains(&p.lat) || !(-180.0..=180.0).contains(&p.lon) {
                return invalid("coordinate out of range");
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Gate matching
// ---------------------------------------------------------------------------

/// The sample that passed closest to a runway gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GateCandidate {
    /// Index into the runway list.
    pub runway: usize,
    /// Index into the track samples.
    pub sample: usize,
    pub distance_deg: f64,
}

/// Outcome of runway matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunwayMatch<'a> {
    pub runway: Option<&'a Runway>,
    /// Best accepted candidate, even when it is too far to count as a match.
    pub candidate: Option<GateCandidate>,
}

impl RunwayMatch<'_> {
    pub fn name(&self) -> Option<&str> {
        self.runway.map(|r| r.name.as_str())
    }
}

fn passes_gate(track: &Track, idx: usize, runway: &Runway, cfg: &GateConfig) -> bool {
    let s = &track.samples[idx];
    if s.geo_alt_ft > cfg.max_altitude_ft {
        debug!(runway = %runway.name, sample = idx, alt = s.geo_alt_ft, "gate: too high");
        return false;
    }
    if s.vertical_rate_fpm > cfg.max_climb_rate_fpm {
        debug!(runway = %runway.name, sample = idx, rate = s.vertical_rate_fpm, "gate: climbing");
        return false;
    }
    if !runway.accepts_heading(s.heading_deg) {
        debug!(runway = %runway.name, sample = idx, heading = s.heading_deg, "gate: wrong heading");
        return false;
    }
    true
}

/// Find the accepted sample closest to any runway gate.
///
/// Pass one looks at each runway's nearest sample, pass two at the next
/// nearest once that sample is excluded. A later candidate replaces the
/// current one only when strictly closer.
pub fn find_gate_candidate(
    track: &Track,
    runways: &[Runway],
    cfg: &GateConfig,
) -> Option<GateCandidate> {
    let distances: Vec<Vec<f64>> = runways
        .iter()
        .map(|r| {
            track
                .samples
                .iter()
                .map(|s| r.gate.planar_distance(s.lat, s.lon))
                .collect()
        })
        .collect();

    let nearest: Vec<Option<usize>> = distances.iter().map(|d| argmin(d)).collect();
    let mut best: Option<GateCandidate> = None;

    for pass in 0..2 {
        for (ri, runway) in runways.iter().enumerate() {
            let idx = if pass == 0 {
                nearest[ri]
            } else {
                let mut masked = distances[ri].clone();
                if let Some(first) = nearest[ri] {
                    masked[first] = f64::NAN;
                }
                argmin(&masked)
            };
            let Some(idx) = idx else { continue };

            if !passes_gate(track, idx, runway, cfg) {
                continue;
            }

            let distance = distances[ri][idx];
            if best.map_or(true, |b| distance < b.distance_deg) {
                best = Some(GateCandidate {
                    runway: ri,
                    sample: idx,
                    distance_deg: distance,
                });
            }
        }
    }

    best
}

/// Match `track` to a runway. No runway is returned when the best
/// candidate is further than the gate distance.
pub fn match_runway<'a>(track: &Track, runways: &'a [Runway], cfg: &GateConfig) -> RunwayMatch<'a> {
    let candidate = find_gate_candidate(track, runways, cfg);
    let runway = candidate
        .filter(|c| c.distance_deg <= cfg.max_distance_deg)
        .and_then(|c| runways.get(c.runway));

    if let (Some(c), None) = (candidate, runway) {
        debug!(
            icao24 = %track.icao24,
            distance_deg = c.distance_deg,
            "closest gate candidate beyond gate distance"
        );
    }

    RunwayMatch { runway, candidate }
}

/// Reference point for the distance channel: the matched runway's near
/// threshold, or the lowest (baro) sample when no runway matched.
pub fn distance_reference(track: &Track, runway: Option<&Runway>) -> Option<LatLon> {
    match runway {
        Some(r) => Some(r.near_threshold),
        None => {
            let idx = argmin(&track.baro_altitudes())?;
            let s = &track.samples[idx];
            Some(LatLon::new(s.lat, s.lon))
        }
    }
}

/// Signed distance to `reference` in km for every sample.
///
/// Samples before the closest approach are negative, the rest non-negative.
pub fn runway_distance_km(track: &Track, reference: LatLon, km_per_degree: f64) -> Vec<f64> {
    let dist: Vec<f64> = track
        .samples
        .iter()
        .map(|s| reference.planar_distance(s.lat, s.lon) * km_per_degree)
        .collect();
    let closest = argmin(&dist).unwrap_or(0);

    dist.into_iter()
        .enumerate()
        .map(|(i, d)| if i < closest { -d } else { d })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;

    fn rwy09() -> Runway {
        Runway {
            name: "09".into(),
            main_heading: 90.0,
            heading_window: [
                HeadingRange { min: 80.0, max: 90.0 },
                HeadingRange { min: 90.0, max: 100.0 },
            ],
            near_threshold: LatLon::new(19.088441, 72.849415),
            far_threshold: LatLon::new(19.088789, 72.875840),
            gate: LatLon::new(19.088200, 72.821867),
            profiles: ReferenceProfiles::default(),
        }
    }

    fn rwy27() -> Runway {
        Runway {
            name: "27".into(),
            main_heading: -90.0,
            heading_window: [
                HeadingRange { min: -100.0, max: -90.0 },
                HeadingRange { min: -90.0, max: -80.0 },
            ],
            near_threshold: LatLon::new(19.088789, 72.875840),
            far_threshold: LatLon::new(19.088441, 72.849415),
            gate: LatLon::new(19.089381, 72.903396),
            profiles: ReferenceProfiles::default(),
        }
    }

    /// Eastbound approach along the runway 09 centreline.
    fn approach(heading: f64, rate: f64) -> Track {
        let samples = (0..20)
            .map(|i| Sample {
                time: i * 5,
                lat: 19.0882,
                lon: 72.78 + i as f64 * 0.005,
                baro_alt_ft: 2500.0 - i as f64 * 100.0,
                geo_alt_ft: 2500.0 - i as f64 * 100.0,
                speed_kts: 140.0,
                heading_deg: heading,
                vertical_rate_fpm: rate,
                on_ground: false,
            })
            .collect();
        Track {
            icao24: "800abc".into(),
            callsign: "AIC101".into(),
            start: 1_600_000_000,
            samples,
        }
    }

    #[test]
    fn test_polynomial_eval() {
        let p = Polynomial([0.0, 0.0, 0.0, 0.0, 1.0, -2.0, 3.0]);
        assert_eq!(p.eval(2.0), 4.0 - 4.0 + 3.0);
        assert_eq!(Polynomial([1.0; 7]).eval(1.0), 7.0);
        assert_eq!(Polynomial([0.0; 7]).eval(5.0), 0.0);
    }

    #[test]
    fn test_heading_window() {
        let r = rwy09();
        assert!(r.accepts_heading(85.0));
        assert!(r.accepts_heading(100.0));
        assert!(!r.accepts_heading(101.0));
        assert!(!rwy27().accepts_heading(90.0));
    }

    #[test]
    fn test_match_runway_09() {
        let runways = vec![rwy09(), rwy27()];
        let track = approach(90.0, -700.0);
        let m = match_runway(&track, &runways, &GateConfig::default());
        assert_eq!(m.name(), Some("09"));
        let c = m.candidate.unwrap();
        assert_eq!(c.runway, 0);
        // 72.78 + 8 * 0.005 = 72.82, the sample nearest the gate
        assert_eq!(c.sample, 8);
        assert!(c.distance_deg <= 1.0 / 112.0);
    }

    #[test]
    fn test_wrong_heading_no_match() {
        let runways = vec![rwy09(), rwy27()];
        let track = approach(-90.0, -700.0);
        let m = match_runway(&track, &runways, &GateConfig::default());
        // Only 27 accepts the heading, and its gate is several km away.
        let c = m.candidate.unwrap();
        assert_eq!(c.runway, 1);
        assert_eq!(c.sample, 19);
        assert!(m.runway.is_none());
    }

    #[test]
    fn test_matcher_respects_gate_constraints() {
        let runways = vec![rwy09(), rwy27()];
        let cfg = GateConfig::default();
        for (heading, rate) in [(90.0, -700.0), (90.0, 500.0), (45.0, -700.0), (-90.0, 0.0)] {
            let track = approach(heading, rate);
            let m = match_runway(&track, &runways, &cfg);
            if let (Some(r), Some(c)) = (m.runway, m.candidate) {
                let s = &track.samples[c.sample];
                assert!(s.geo_alt_ft <= cfg.max_altitude_ft);
                assert!(s.vertical_rate_fpm <= cfg.max_climb_rate_fpm);
                assert!(r.accepts_heading(s.heading_deg));
                assert!(c.distance_deg <= cfg.max_distance_deg);
            }
        }
        // Climbing through the gate is never a match.
        assert!(match_runway(&approach(90.0, 500.0), &runways, &cfg)
            .runway
            .is_none());
    }

    #[test]
    fn test_second_pass_candidate() {
        let runways = vec![rwy09()];
        let mut track = approach(90.0, -700.0);
        // The nearest sample is climbing; its neighbour is acceptable.
        track.samples[8].vertical_rate_fpm = 800.0;
        let m = match_runway(&track, &runways, &GateConfig::default());
        let c = m.candidate.unwrap();
        assert_ne!(c.sample, 8);
        assert!(c.sample == 7 || c.sample == 9);
        assert_eq!(m.name(), Some("09"));
    }

    #[test]
    fn test_no_runways() {
        let track = approach(90.0, -700.0);
        let m = match_runway(&track, &[], &GateConfig::default());
        assert!(m.runway.is_none());
        assert!(m.candidate.is_none());
    }

    #[test]
    fn test_runway_distance_sign() {
        let track = approach(90.0, -700.0);
        let rwy = rwy09();
        let dist = runway_distance_km(&track, rwy.near_threshold, 112.0);
        assert_eq!(dist.len(), track.len());
        // 72.78 + 14 * 0.005 = 72.85, closest to the threshold
        assert!(dist[..14].iter().all(|&d| d < 0.0));
        assert!(dist[14..].iter().all(|&d| d >= 0.0));
    }

    #[test]
    fn test_distance_reference_fallback() {
        let track = approach(90.0, -700.0);
        let reference = distance_reference(&track, None).unwrap();
        let last = track.samples.last().unwrap();
        assert_eq!(reference, LatLon::new(last.lat, last.lon));
        assert_eq!(
            distance_reference(&track, Some(&rwy09())),
            Some(rwy09().near_threshold)
        );
    }

    #[test]
    fn test_validate_runway() {
        assert!(rwy09().validate().is_ok());
        let mut r = rwy09();
        r.heading_window[0] = HeadingRange { min: 100.0, max: 80.0 };
        assert!(r.validate().is_err());
        let mut r = rwy09();
        r.gate = LatLon::new(95.0, 0.0);
        assert!(r.validate().is_err());
    }
}
