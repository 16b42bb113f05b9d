//! CSV loaders for state-vector tracks and parsed weather observations.
//!
//! Track files use the OpenSky/traffic column names (`timestamp`, `icao24`,
//! `callsign`, `latitude`, `longitude`, `altitude`, `geoaltitude`,
//! `groundspeed`, `track`, `vertical_rate`, `onground`, `last_position`).
//! Rows are grouped per aircraft and split into flights wherever the
//! aircraft goes quiet for longer than the gap.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use goaround_core::{RawSample, RawTrack, WeatherObservation, WeatherTable};

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

/// Parse epoch seconds or a UTC date-time string.
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(secs) = text.parse::<f64>() {
        return secs.is_finite().then_some(secs);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp() as f64 + dt.timestamp_subsec_millis() as f64 / 1000.0);
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.timestamp() as f64 + dt.timestamp_subsec_millis() as f64 / 1000.0);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            let dt = dt.and_utc();
            return Some(dt.timestamp() as f64 + dt.timestamp_subsec_millis() as f64 / 1000.0);
        }
    }
    None
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn flexible_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let text: Option<String> = Option::deserialize(deserializer)?;
    Ok(text.as_deref().and_then(parse_bool))
}

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TrackRow {
    timestamp: String,
    icao24: String,
    #[serde(default)]
    callsign: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude: Option<f64>,
    geoaltitude: Option<f64>,
    groundspeed: Option<f64>,
    track: Option<f64>,
    vertical_rate: Option<f64>,
    #[serde(default, deserialize_with = "flexible_bool")]
    onground: Option<bool>,
    #[serde(default)]
    last_position: Option<String>,
}

impl TrackRow {
    fn to_sample(&self, timestamp: f64) -> RawSample {
        RawSample {
            timestamp: Some(timestamp),
            lat: self.latitude,
            lon: self.longitude,
            baro_alt_ft: self.altitude,
            geo_alt_ft: self.geoaltitude,
            speed_kts: self.groundspeed,
            heading_deg: self.track,
            vertical_rate_fpm: self.vertical_rate,
            on_ground: self.onground,
            last_position: self.last_position.as_deref().and_then(parse_timestamp),
        }
    }
}

/// Read state-vector rows and split them into per-flight raw tracks.
///
/// A new flight starts whenever consecutive reports of one aircraft are
/// more than `gap_s` seconds apart. Flights come back ordered by aircraft
/// address, then time.
pub fn read_tracks<R: io::Read>(reader: R, gap_s: f64) -> Result<Vec<RawTrack>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut per_aircraft: BTreeMap<String, Vec<(f64, Option<String>, RawSample)>> = BTreeMap::new();
    let mut skipped = 0usize;

    for (line, res) in csv_reader.deserialize::<TrackRow>().enumerate() {
        let row = res.with_context(|| format!("bad track row {}", line + 2))?;
        let icao = row.icao24.trim().to_lowercase();
        let Some(ts) = parse_timestamp(&row.timestamp).filter(|_| !icao.is_empty()) else {
            skipped += 1;
            continue;
        };
        let sample = row.to_sample(ts);
        per_aircraft
            .entry(icao)
            .or_default()
            .push((ts, row.callsign, sample));
    }

    if skipped > 0 {
        warn!("skipped {skipped} rows without a timestamp or address");
    }

    let mut flights = Vec::new();
    for (icao, mut rows) in per_aircraft {
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut current: Vec<(Option<String>, RawSample)> = Vec::new();
        let mut last_ts: Option<f64> = None;
        for (ts, callsign, sample) in rows {
            if last_ts.is_some_and(|prev| ts - prev > gap_s) {
                flights.push(make_track(&icao, std::mem::take(&mut current)));
            }
            last_ts = Some(ts);
            current.push((callsign, sample));
        }
        if !current.is_empty() {
            flights.push(make_track(&icao, current));
        }
    }

    debug!(flights = flights.len(), "tracks loaded");
    Ok(flights)
}

fn make_track(icao: &str, rows: Vec<(Option<String>, RawSample)>) -> RawTrack {
    let callsign = rows
        .iter()
        .filter_map(|(c, _)| c.as_deref())
        .map(str::trim)
        .find(|c| !c.is_empty())
        .unwrap_or_default()
        .to_string();
    RawTrack {
        icao24: icao.to_string(),
        callsign,
        samples: rows.into_iter().map(|(_, s)| s).collect(),
    }
}

pub fn load_tracks(path: &Path, gap_s: f64) -> Result<Vec<RawTrack>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_tracks(io::BufReader::new(file), gap_s)
        .with_context(|| format!("reading tracks from {}", path.display()))
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WeatherRow {
    timestamp: String,
    temperature_c: f64,
    dewpoint_c: f64,
    #[serde(default)]
    wind_speed_kts: f64,
    #[serde(default)]
    wind_gust_kts: f64,
    #[serde(default)]
    wind_dir_deg: f64,
    #[serde(default, deserialize_with = "flexible_bool")]
    convective: Option<bool>,
    #[serde(default)]
    visibility: f64,
    pressure_hpa: f64,
    #[serde(default)]
    cloud_base_ft: f64,
}

/// Read already-parsed weather observations.
pub fn read_weather<R: io::Read>(reader: R) -> Result<WeatherTable> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut table = WeatherTable::new();

    for (line, res) in csv_reader.deserialize::<WeatherRow>().enumerate() {
        let row = res.with_context(|| format!("bad weather row {}", line + 2))?;
        let timestamp = parse_timestamp(&row.timestamp)
            .with_context(|| format!("bad weather timestamp '{}'", row.timestamp))?;
        table.insert(WeatherObservation {
            timestamp: timestamp as i64,
            temperature_c: row.temperature_c,
            dewpoint_c: row.dewpoint_c,
            wind_speed_kts: row.wind_speed_kts,
            wind_gust_kts: row.wind_gust_kts,
            wind_dir_deg: row.wind_dir_deg,
            convective: row.convective.unwrap_or(false),
            visibility: row.visibility,
            pressure_hpa: row.pressure_hpa,
            cloud_base_ft: row.cloud_base_ft,
        });
    }

    debug!(observations = table.len(), "weather loaded");
    Ok(table)
}

pub fn load_weather(path: &Path) -> Result<WeatherTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_weather(io::BufReader::new(file))
        .with_context(|| format!("reading weather from {}", path.display()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "timestamp,icao24,callsign,latitude,longitude,altitude,geoaltitude,groundspeed,track,vertical_rate,onground,last_position\n";

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("1600000000"), Some(1_600_000_000.0));
        assert_eq!(parse_timestamp(" 1600000000.5 "), Some(1_600_000_000.5));
        assert_eq!(parse_timestamp("2020-09-13 12:26"), Some(1_600_000_000.0 - 40.0));
        assert_eq!(parse_timestamp("2020-09-13 12:26:40"), Some(1_600_000_000.0));
        assert_eq!(parse_timestamp("2020-09-13T12:26:40Z"), Some(1_600_000_000.0));
        assert_eq!(
            parse_timestamp("2020-09-13 12:26:40+00:00"),
            Some(1_600_000_000.0)
        );
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_read_tracks_groups_and_splits() {
        let mut text = String::from(HEADER);
        // Aircraft A: two flights separated by an hour.
        text.push_str("1600000000,800ABC,AIC101 ,19.0,72.7,2000,2100,150,90,-700,False,\n");
        text.push_str("1600000005,800abc,,19.0,72.71,1950,2050,150,90,-700,False,\n");
        text.push_str("1600003605,800abc,AIC102,19.0,72.72,1900,2000,150,90,-700,True,\n");
        // Aircraft B, out of order.
        text.push_str("1600000010,800def,IGO5,19.1,72.9,1500,,140,-90,-500,0,1600000009\n");
        text.push_str("1600000002,800def,IGO5,19.1,72.91,1550,1600,140,-90,-500,0,\n");
        // No timestamp: skipped.
        text.push_str(",800def,IGO5,19.1,72.92,1500,1600,140,-90,-500,0,\n");

        let flights = read_tracks(text.as_bytes(), 1200.0).unwrap();
        assert_eq!(flights.len(), 3);

        assert_eq!(flights[0].icao24, "800abc");
        assert_eq!(flights[0].callsign, "AIC101");
        assert_eq!(flights[0].samples.len(), 2);
        assert_eq!(flights[1].callsign, "AIC102");
        assert_eq!(flights[1].samples[0].on_ground, Some(true));

        let b = &flights[2];
        assert_eq!(b.icao24, "800def");
        assert_eq!(b.samples.len(), 2);
        assert_eq!(b.samples[0].timestamp, Some(1_600_000_002.0));
        assert_eq!(b.samples[1].geo_alt_ft, None);
        assert_eq!(b.samples[1].last_position, Some(1_600_000_009.0));
        assert_eq!(b.samples[1].on_ground, Some(false));
    }

    #[test]
    fn test_load_tracks_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{HEADER}").unwrap();
        for i in 0..6 {
            writeln!(
                file,
                "2020-09-13 12:26:{:02},800abc,AIC101,19.0,{},2000,2100,150,90,-700,false,",
                i * 5,
                72.7 + i as f64 * 0.01
            )
            .unwrap();
        }
        file.flush().unwrap();

        let flights = load_tracks(file.path(), 1200.0).unwrap();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].samples.len(), 6);
        assert_eq!(flights[0].samples[5].timestamp, Some(1_599_999_985.0));
    }

    #[test]
    fn test_load_tracks_missing_file() {
        let err = load_tracks(Path::new("/nonexistent/tracks.csv"), 1200.0).unwrap_err();
        assert!(err.to_string().contains("opening"));
    }

    #[test]
    fn test_read_weather() {
        let text = "timestamp,temperature_c,dewpoint_c,wind_speed_kts,wind_gust_kts,wind_dir_deg,convective,visibility,pressure_hpa,cloud_base_ft\n\
                    2020-09-13 12:00,29,24,8,0,250,0,5000,1008,1800\n\
                    1600001800,28,24,10,18,260,True,4000,1007,1500\n";
        let table = read_weather(text.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);

        let first = table.closest(1_599_998_400).unwrap();
        assert_eq!(first.temperature_c, 29.0);
        assert!(!first.convective);

        let second = table.closest(1_600_001_800).unwrap();
        assert!(second.convective);
        assert_eq!(second.pressure_hpa, 1007.0);
    }

    #[test]
    fn test_read_weather_bad_timestamp() {
        let text = "timestamp,temperature_c,dewpoint_c,pressure_hpa\nsoon,29,24,1008\n";
        assert!(read_weather(text.as_bytes()).is_err());
    }

    #[test]
    fn test_load_weather_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timestamp,temperature_c,dewpoint_c,pressure_hpa").unwrap();
        writeln!(file, "1600000000,15,10,1013.25").unwrap();
        file.flush().unwrap();

        let table = load_weather(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(1_600_000_100, 3600).unwrap().pressure_hpa, 1013.25);
    }
}
