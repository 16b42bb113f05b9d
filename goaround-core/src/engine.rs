//! Per-flight detection pipeline.
//!
//! [`Engine::process`] takes one raw track through exclusion, cleaning,
//! takeoff filtering, phase labelling, runway matching, altitude correction
//! and detection. Reference data is borrowed immutably and the engine holds
//! no per-flight state, so one engine can serve any number of flights.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Config, ExcludeConfig};
use crate::detect::{GoAroundDetector, MethodVotes};
use crate::phase::{has_state_change, label_track, PhaseClassifier};
use crate::preprocess::preprocess;
use crate::runway::{distance_reference, match_runway, runway_distance_km, GateCandidate, Runway};
use crate::stats::{approach_stats, ApproachStats};
use crate::takeoff::check_takeoff;
use crate::types::{Exclusion, PhaseLabel, RawTrack, Rejection, Track};
use crate::weather::{correct_track, WeatherObservation, WeatherTable};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Read-only airport data shared by every flight of a run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub runways: Vec<Runway>,
    pub weather: WeatherTable,
}

impl ReferenceData {
    pub fn new(runways: Vec<Runway>, weather: WeatherTable) -> Self {
        ReferenceData { runways, weather }
    }
}

/// Position and attitude at the reported event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventFix {
    pub index: usize,
    /// Epoch seconds.
    pub timestamp: i64,
    /// Track angle in [0, 360).
    pub heading_deg: f64,
    pub altitude_ft: f64,
    pub lat: f64,
    pub lon: f64,
}

/// Outcome of processing one flight that passed every filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub icao24: String,
    pub callsign: String,
    /// Epoch seconds of the first and last sample.
    pub start: i64,
    pub stop: i64,
    /// Primary method verdict.
    pub go_around: bool,
    /// Sample index of the first confirmed primary event.
    pub event_index: Option<usize>,
    pub primary_events: Vec<usize>,
    pub votes: MethodVotes,
    pub minimum_altitude_index: Option<usize>,
    /// Matched runway name.
    pub runway: Option<String>,
    pub gate: Option<GateCandidate>,
    /// Signed distance to the runway in km, one value per sample.
    pub runway_distance_km: Vec<f64>,
    pub labels: Vec<PhaseLabel>,
    pub corrected_altitude_ft: Vec<f64>,
    /// Observation used for the correction; `None` means uncorrected.
    pub weather: Option<WeatherObservation>,
    pub approach: ApproachStats,
    pub event: Option<EventFix>,
    /// Epoch seconds of the lowest point, or the end of the track.
    pub reference_time: i64,
}

impl DetectionResult {
    pub fn runway_name(&self) -> &str {
        self.runway.as_deref().unwrap_or("None")
    }

    pub fn is_corrected(&self) -> bool {
        self.weather.is_some()
    }
}

// ---------------------------------------------------------------------------
// Exclusion
// ---------------------------------------------------------------------------

/// Check the aircraft against the exclusion lists.
pub fn check_exclusion(track: &RawTrack, exclude: &ExcludeConfig) -> Option<Exclusion> {
    let icao = track.icao24.trim();
    if exclude.icao24.iter().any(|a| a.trim().eq_ignore_ascii_case(icao)) {
        return Some(Exclusion::Address(icao.to_lowercase()));
    }

    let callsign = track.callsign.trim().to_uppercase();
    if exclude
        .callsign_prefixes
        .iter()
        .map(|p| p.trim().to_uppercase())
        .any(|p| !p.is_empty() && callsign.starts_with(&p))
    {
        return Some(Exclusion::Callsign(callsign));
    }
    None
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs the full pipeline for one flight at a time.
pub struct Engine<'a, C: ?Sized> {
    config: &'a Config,
    reference: &'a ReferenceData,
    classifier: &'a C,
}

impl<'a, C: PhaseClassifier + ?Sized> Engine<'a, C> {
    pub fn new(config: &'a Config, reference: &'a ReferenceData, classifier: &'a C) -> Self {
        Engine {
            config,
            reference,
            classifier,
        }
    }

    /// Process one flight.
    ///
    /// Every categorical reason to skip the flight comes back as a
    /// [`Rejection`]; nothing here panics on bad input.
    pub fn process(&self, raw: &RawTrack) -> Result<DetectionResult, Rejection> {
        let result = self.run(raw);
        if let Err(rejection) = &result {
            debug!(
                icao24 = %raw.icao24,
                callsign = %raw.callsign.trim(),
                reason = rejection.kind(),
                "flight rejected: {rejection}"
            );
        }
        result
    }

    fn run(&self, raw: &RawTrack) -> Result<DetectionResult, Rejection> {
        let cfg = self.config;

        if let Some(exclusion) = check_exclusion(raw, &cfg.exclude) {
            return Err(Rejection::Excluded(exclusion));
        }

        let track = preprocess(raw, &cfg.preprocess)?;

        if let Some(signature) = check_takeoff(&track, &cfg.takeoff) {
            return Err(Rejection::Takeoff(signature));
        }

        let labels = label_track(self.classifier, &track, cfg.classifier.window_s)?;
        if !has_state_change(&labels) {
            return Err(Rejection::NoStateChange);
        }

        let matched = match_runway(&track, &self.reference.runways, &cfg.gate);
        let runway_distance_km = distance_reference(&track, matched.runway)
            .map(|r| runway_distance_km(&track, r, cfg.gate.km_per_degree))
            .unwrap_or_default();

        let correction = correct_track(&track, &self.reference.weather, cfg.weather.max_offset_s);
        if !correction.is_corrected() {
            debug!(icao24 = %track.icao24, "no weather within tolerance, altitude uncorrected");
        }

        let detector = GoAroundDetector::new(&cfg.detector, &track, &labels, &correction.altitudes)?;
        let detection = detector.detect();

        let gate = matched.runway.and(matched.candidate);
        let approach = approach_stats(&track, gate.as_ref());

        let event = detection
            .primary
            .and_then(|i| event_fix(&track, i, &correction.altitudes));
        let reference_time = detection
            .minimum_altitude
            .and_then(|i| track.timestamp_at(i))
            .unwrap_or_else(|| track.stop());

        if let Some(fix) = &event {
            info!(
                icao24 = %track.icao24,
                callsign = %track.callsign,
                runway = matched.name().unwrap_or("None"),
                timestamp = fix.timestamp,
                altitude_ft = fix.altitude_ft,
                votes = detection.votes.count(),
                "go-around detected"
            );
        }

        Ok(DetectionResult {
            icao24: track.icao24.clone(),
            callsign: track.callsign.clone(),
            start: track.start,
            stop: track.stop(),
            go_around: detection.is_go_around(),
            event_index: detection.primary,
            primary_events: detection.primary_events,
            votes: detection.votes,
            minimum_altitude_index: detection.minimum_altitude,
            runway: matched.name().map(str::to_string),
            gate,
            runway_distance_km,
            labels,
            corrected_altitude_ft: correction.altitudes,
            weather: correction.observation,
            approach,
            event,
            reference_time,
        })
    }
}

fn event_fix(track: &Track, index: usize, altitudes: &[f64]) -> Option<EventFix> {
    let s = track.samples.get(index)?;
    let heading = if s.heading_deg < 0.0 {
        s.heading_deg + 360.0
    } else {
        s.heading_deg
    };
    Some(EventFix {
        index,
        timestamp: track.start + s.time,
        heading_deg: heading,
        altitude_ft: altitudes.get(index).copied().unwrap_or(s.baro_alt_ft),
        lat: s.lat,
        lon: s.lon,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
