//! Configuration file management for goaround.
//!
//! Reads/writes `~/.goaround/config.yaml` with the detection thresholds,
//! the aircraft exclusion lists, and the airport's runway reference data.
//! Every section is optional in the file; missing keys take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::runway::Runway;
use crate::types::{GoAroundError, Result};

/// Full configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preprocess: PreprocessConfig,
    pub takeoff: TakeoffConfig,
    pub gate: GateConfig,
    pub detector: DetectorConfig,
    pub weather: WeatherConfig,
    pub classifier: ClassifierConfig,
    pub exclude: ExcludeConfig,
    pub airport: AirportConfig,
}

/// Track cleaning and suitability thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Samples at or above this barometric altitude are dropped.
    pub altitude_ceiling_ft: f64,
    pub min_samples: usize,
    /// All samples above this: "too high".
    pub high_altitude_ft: f64,
    /// All samples below this geometric altitude: "too low".
    pub low_altitude_ft: f64,
    /// All samples below this ground speed: "too slow".
    pub slow_speed_kts: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            altitude_ceiling_ft: 10_000.0,
            min_samples: 5,
            high_altitude_ft: 3000.0,
            low_altitude_ft: 500.0,
            slow_speed_kts: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeoffConfig {
    pub min_samples: usize,
    /// Number of leading samples examined.
    pub head_samples: usize,
    pub low_altitude_ft: f64,
    pub climb_check_altitude_ft: f64,
    pub ground_altitude_ft: f64,
    pub climb_rate_fpm: f64,
}

impl Default for TakeoffConfig {
    fn default() -> Self {
        TakeoffConfig {
            min_samples: 10,
            head_samples: 5,
            low_altitude_ft: 600.0,
            climb_check_altitude_ft: 3000.0,
            ground_altitude_ft: 3000.0,
            climb_rate_fpm: 1500.0,
        }
    }
}

/// Runway gate acceptance thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub max_altitude_ft: f64,
    pub max_climb_rate_fpm: f64,
    /// Planar degrees; 1/112 deg is roughly 1 km.
    pub max_distance_deg: f64,
    pub km_per_degree: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            max_altitude_ft: 4000.0,
            max_climb_rate_fpm: 150.0,
            max_distance_deg: 1.0 / 112.0,
            km_per_degree: 112.0,
        }
    }
}

/// Go-around detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Phase changes above this geometric altitude are ignored.
    pub state_change_ceiling_ft: f64,
    pub altitude_threshold_ft: f64,
    pub climb_rate_threshold_fpm: f64,
    pub lookahead_s: i64,
    pub lookahead_tolerance_s: i64,
    /// Rest-of-track fallback is allowed while its mean time stays within this.
    pub rest_of_track_limit_s: i64,
    pub altitude_glitch_ft: f64,
    pub glitch_sentinel_ft: f64,
    pub min_window_samples: usize,
    pub altitude_share_pct: f64,
    pub climb_share_pct: f64,
    /// Samples masked either side of an on-ground report when looking for
    /// the minimum altitude.
    pub ground_mask_samples: usize,
    pub min_climb_run: usize,
    pub gain_horizon_s: i64,
    pub fast_speed_kts: f64,
    pub min_fast_samples: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            state_change_ceiling_ft: 2500.0,
            altitude_threshold_ft: 500.0,
            climb_rate_threshold_fpm: 200.0,
            lookahead_s: 120,
            lookahead_tolerance_s: 20,
            rest_of_track_limit_s: 240,
            altitude_glitch_ft: 20_000.0,
            glitch_sentinel_ft: -10_000.0,
            min_window_samples: 10,
            altitude_share_pct: 50.0,
            climb_share_pct: 20.0,
            ground_mask_samples: 3,
            min_climb_run: 2,
            gain_horizon_s: 240,
            fast_speed_kts: 120.0,
            min_fast_samples: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Observations further than this from the reference time are ignored.
    pub max_offset_s: i64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig { max_offset_s: 3600 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub window_s: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig { window_s: 15 }
    }
}

/// Aircraft that are never processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeConfig {
    pub icao24: Vec<String>,
    /// Callsign prefixes used by airport ground vehicles.
    pub callsign_prefixes: Vec<String>,
}

impl Default for ExcludeConfig {
    fn default() -> Self {
        ExcludeConfig {
            icao24: ["800b7b", "800b7c", "800b7d", "800d5f", "800b87"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            callsign_prefixes: ["WILDLIF", "AGM000", "FOLOWME", "RADAR", "FIRETEN", "DUTYOFIR"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirportConfig {
    pub icao: String,
    pub name: String,
    pub runways: Vec<Runway>,
}

impl Config {
    /// Check for values that would make detection meaningless.
    pub fn validate(&self) -> Result<()> {
        fn bad(msg: &str) -> Result<()> {
            Err(GoAroundError::Config(msg.to_string()))
        }

        if self.preprocess.min_samples == 0 {
            return bad("preprocess.min_samples must be at least 1");
        }
        if self.takeoff.head_samples < 3 {
            return bad("takeoff.head_samples must be at least 3");
        }
        if self.takeoff.head_samples > self.takeoff.min_samples {
            return bad("takeoff.head_samples must not exceed takeoff.min_samples");
        }
        if self.gate.max_distance_deg <= 0.0 || self.gate.km_per_degree <= 0.0 {
            return bad("gate distances must be positive");
        }
        if self.detector.lookahead_s <= 0 || self.detector.gain_horizon_s <= 0 {
            return bad("detector windows must be positive");
        }
        if self.detector.lookahead_tolerance_s < 0 {
            return bad("detector.lookahead_tolerance_s must not be negative");
        }
        if self.weather.max_offset_s <= 0 {
            return bad("weather.max_offset_s must be positive");
        }
        if self.classifier.window_s <= 0 {
            return bad("classifier.window_s must be positive");
        }
        for runway in &self.airport.runways {
            runway.validate()?;
        }
        Ok(())
    }
}

/// Get the config directory path (`~/.goaround/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".goaround")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.goaround/config.yaml`.
///
/// Returns default config if the file doesn't exist or can't be used.
pub fn load_config() -> Config {
    let path = config_file();
    if !path.exists() {
        return Config::default();
    }

    match load_config_from(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!("ignoring {}: {e}", path.display());
            Config::default()
        }
    }
}

/// Load and validate config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)?;
    let config = parse_config(&text)?;
    config.validate()?;
    Ok(config)
}

/// Save config to `path`, or `~/.goaround/config.yaml` when `None`.
pub fn save_config(config: &Config, path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file(),
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let text = serialize_config(config)?;
    std::fs::write(&path, text)?;

    Ok(path)
}

/// Parse YAML config text.
pub fn parse_config(text: &str) -> Result<Config> {
    if text.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(text).map_err(|e| GoAroundError::Config(e.to_string()))
}

/// Serialize config to YAML text.
pub fn serialize_config(config: &Config) -> Result<String> {
    let body = serde_yaml::to_string(config).map_err(|e| GoAroundError::Config(e.to_string()))?;
    Ok(format!("# goaround configuration\n{body}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
