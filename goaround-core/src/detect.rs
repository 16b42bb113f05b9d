//! Go-around detection.
//!
//! The primary method looks for a descent that turns into level flight or a
//! climb at low altitude, and confirms it when most of the following two
//! minutes are spent climbing above the approach floor. Four auxiliary
//! heuristics start from the lowest point of the flight instead and vote
//! independently; no single winner is picked.

use serde::Serialize;

use crate::config::DetectorConfig;
use crate::stats::argmin;
use crate::types::{PhaseLabel, Rejection, Track};
use crate::window::{forward_window, WindowSpec};

/// Sample index reported by each method, `None` when it did not confirm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MethodVotes {
    /// Method 1: sustained positive vertical rate.
    pub climb_rate: Option<usize>,
    /// Method 2: sustained non-decreasing altitude.
    pub altitude_gain: Option<usize>,
    /// Method 3: methods 1 and 2 together.
    pub combined: Option<usize>,
    /// Method 4: speed kept above approach speed.
    pub ground_speed: Option<usize>,
    /// Method 5: same as the primary method.
    pub phase_transition: Option<usize>,
}

impl MethodVotes {
    /// Number of methods that confirmed.
    pub fn count(&self) -> usize {
        [
            self.climb_rate,
            self.altitude_gain,
            self.combined,
            self.ground_speed,
            self.phase_transition,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }
}

/// Everything the detector found on one track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// First confirmed primary event.
    pub primary: Option<usize>,
    /// Every confirmed primary event, in track order.
    pub primary_events: Vec<usize>,
    /// Anchor of the auxiliary methods.
    pub minimum_altitude: Option<usize>,
    pub votes: MethodVotes,
}

impl Detection {
    pub fn is_go_around(&self) -> bool {
        self.primary.is_some()
    }
}

/// Runs every detection method over one labelled track.
///
/// `altitudes` is the (possibly weather-corrected) barometric channel.
pub struct GoAroundDetector<'a> {
    config: &'a DetectorConfig,
    track: &'a Track,
    labels: &'a [PhaseLabel],
    altitudes: &'a [f64],
    times: Vec<i64>,
}

impl<'a> GoAroundDetector<'a> {
    pub fn new(
        config: &'a DetectorConfig,
        track: &'a Track,
        labels: &'a [PhaseLabel],
        altitudes: &'a [f64],
    ) -> Result<Self, Rejection> {
        if labels.len() != track.len() {
            return Err(Rejection::MalformedLabels {
                expected: track.len(),
                actual: labels.len(),
            });
        }
        Ok(GoAroundDetector {
            config,
            track,
            labels,
            altitudes,
            times: track.times(),
        })
    }

    /// Altitude at `i`; missing values compare false against everything.
    fn alt(&self, i: usize) -> f64 {
        self.altitudes.get(i).copied().unwrap_or(f64::NAN)
    }

    /// Indices where the label differs from the previous one.
    pub fn transition_points(&self) -> Vec<usize> {
        (1..self.labels.len())
            .filter(|&i| self.labels[i] != self.labels[i - 1])
            .collect()
    }

    /// Run every method.
    pub fn detect(&self) -> Detection {
        let primary_events = self.primary_events();
        let primary = primary_events.first().copied();
        let minimum_altitude = self.minimum_altitude_index();

        let mut votes = MethodVotes {
            phase_transition: primary,
            ..MethodVotes::default()
        };
        if let Some(from) = minimum_altitude {
            votes.climb_rate = self.climb_rate(from);
            votes.altitude_gain = self.altitude_gain(from);
            votes.combined = self.combined(from);
            votes.ground_speed = self.ground_speed(from);
        }

        Detection {
            primary,
            primary_events,
            minimum_altitude,
            votes,
        }
    }

    // -- Primary ----------------------------------------------------------

    /// First confirmed transition at or after `first_pos`.
    pub fn primary(&self, first_pos: usize) -> Option<usize> {
        let cfg = self.config;

        for pt in self.transition_points() {
            if pt < first_pos {
                continue;
            }
            if self.track.samples[pt].geo_alt_ft > cfg.state_change_ceiling_ft {
                continue;
            }
            if self.labels[pt - 1] != PhaseLabel::Descent {
                continue;
            }
            if !matches!(self.labels[pt], PhaseLabel::Level | PhaseLabel::Climb) {
                continue;
            }

            let spec = WindowSpec::Nearest {
                lookahead_s: cfg.lookahead_s,
                tolerance_s: cfg.lookahead_tolerance_s,
            };
            let window = match forward_window(&self.times, pt, spec) {
                Some(w) => w,
                None => {
                    // Track ends too soon; use the rest of it if it is short.
                    let rest = &self.times[pt..];
                    let mean_t = rest.iter().sum::<i64>() as f64 / rest.len() as f64;
                    if mean_t > (self.times[pt] + cfg.rest_of_track_limit_s) as f64 {
                        continue;
                    }
                    pt..self.times.len()
                }
            };

            if self.confirm_window(window) {
                return Some(pt);
            }
        }
        None
    }

    fn confirm_window(&self, window: std::ops::Range<usize>) -> bool {
        let cfg = self.config;
        let n = window.len();
        if n <= cfg.min_window_samples {
            return false;
        }

        let high = window
            .clone()
            .map(|i| self.alt(i))
            .map(|a| if a > cfg.altitude_glitch_ft { cfg.glitch_sentinel_ft } else { a })
            .filter(|&a| a > cfg.altitude_threshold_ft)
            .count();
        let climbing = window
            .filter(|&i| self.track.samples[i].vertical_rate_fpm > cfg.climb_rate_threshold_fpm)
            .count();

        let pct = |k: usize| k as f64 / n as f64 * 100.0;
        pct(high) > cfg.altitude_share_pct && pct(climbing) > cfg.climb_share_pct
    }

    /// Every confirmed primary event, rescanning past each one.
    pub fn primary_events(&self) -> Vec<usize> {
        let mut events = Vec::new();
        let mut from = 0;
        while let Some(pt) = self.primary(from) {
            events.push(pt);
            from = pt + 1;
        }
        events
    }

    // -- Auxiliary --------------------------------------------------------

    /// Lowest altitude, ignoring samples within a few reports of an
    /// on-ground report.
    pub fn minimum_altitude_index(&self) -> Option<usize> {
        let n = self.track.len();
        let mask = self.config.ground_mask_samples;
        let mut alts: Vec<f64> = (0..n).map(|i| self.alt(i)).collect();

        for (i, s) in self.track.samples.iter().enumerate() {
            if s.on_ground {
                let lo = i.saturating_sub(mask);
                let hi = (i + mask + 1).min(n);
                alts[lo..hi].fill(f64::NAN);
            }
        }
        argmin(&alts)
    }

    fn horizon(&self, from: usize, horizon_s: i64) -> std::ops::Range<usize> {
        forward_window(&self.times, from, WindowSpec::Horizon { horizon_s }).unwrap_or(from..from)
    }

    fn airborne(&self, i: usize) -> bool {
        !self.track.samples[i].on_ground
    }

    /// Method 1: positive vertical rate, the final run longer than the
    /// minimum.
    pub fn climb_rate(&self, from: usize) -> Option<usize> {
        let window = self.horizon(from, self.config.lookahead_s);
        let mut run = 0;
        for i in window {
            if self.track.samples[i].vertical_rate_fpm > 0.0 && self.airborne(i) {
                run += 1;
            } else {
                run = 0;
            }
        }
        (run > self.config.min_climb_run).then_some(from)
    }

    /// Method 2: non-decreasing altitude, the final run longer than the
    /// minimum.
    pub fn altitude_gain(&self, from: usize) -> Option<usize> {
        let window = self.horizon(from, self.config.gain_horizon_s);
        let mut run = 0;
        for i in window.start + 1..window.end {
            if self.alt(i) >= self.alt(i - 1) && self.airborne(i) {
                run += 1;
            } else {
                run = 0;
            }
        }
        (run > self.config.min_climb_run).then_some(from)
    }

    /// Method 3.
    pub fn combined(&self, from: usize) -> Option<usize> {
        self.climb_rate(from).and(self.altitude_gain(from))
    }

    /// Method 4: enough fast airborne samples, and the aircraft got back
    /// above the approach floor.
    pub fn ground_speed(&self, from: usize) -> Option<usize> {
        let cfg = self.config;
        let window = self.horizon(from, cfg.lookahead_s);

        let fast = window
            .clone()
            .filter(|&i| self.track.samples[i].speed_kts > cfg.fast_speed_kts && self.airborne(i))
            .count();
        let max_alt = window
            .map(|i| self.alt(i))
            .filter(|a| !a.is_nan())
            .fold(f64::NEG_INFINITY, f64::max);

        (fast > cfg.min_fast_samples && max_alt > cfg.altitude_threshold_ft).then_some(from)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
