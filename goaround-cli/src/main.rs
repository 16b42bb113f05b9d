//! goaround: CLI for go-around detection over recorded surveillance tracks.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tracing_subscriber::EnvFilter;

use goaround_core::config::{self, Config};
use goaround_core::{
    DetectionResult, Engine, FuzzyClassifier, PhaseClassifier, ReferenceData, WeatherTable,
};

mod load;

#[derive(Parser)]
#[command(name = "goaround", version, about = "Go-around detection for aircraft tracks")]
struct Cli {
    /// Config file (defaults to ~/.goaround/config.yaml)
    #[arg(long, global = true, env = "GOAROUND_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run detection over a state-vector CSV file
    Detect {
        /// Track CSV (OpenSky/traffic column names)
        tracks: PathBuf,

        /// Parsed weather observations CSV
        #[arg(short, long)]
        weather: Option<PathBuf>,

        /// Print one JSON result per line instead of tables
        #[arg(long)]
        json: bool,

        /// Seconds of silence that split one aircraft's reports into flights
        #[arg(long, default_value = "1200")]
        gap: f64,
    },

    /// List the configured runways
    Runways,

    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Detect {
            tracks,
            weather,
            json,
            gap,
        } => cmd_detect(cli.config.as_deref(), &tracks, weather.as_deref(), json, gap),
        Commands::Runways => cmd_runways(cli.config.as_deref()),
        Commands::InitConfig { force } => cmd_init_config(cli.config.as_deref(), force),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => config::load_config_from(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(config::load_config()),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_detect(
    config_path: Option<&Path>,
    tracks_path: &Path,
    weather_path: Option<&Path>,
    json: bool,
    gap: f64,
) -> Result<()> {
    let (summary, flights) = run_detect(
        config_path,
        tracks_path,
        weather_path,
        json,
        gap,
        &FuzzyClassifier,
    )?;
    if !json {
        print_summary(&summary, flights);
    }
    Ok(())
}

/// Load inputs and run every flight through the engine, returning the
/// summary and the number of flights loaded.
fn run_detect<C: PhaseClassifier + ?Sized>(
    config_path: Option<&Path>,
    tracks_path: &Path,
    weather_path: Option<&Path>,
    json: bool,
    gap: f64,
    classifier: &C,
) -> Result<(Summary, usize)> {
    let config = resolve_config(config_path)?;
    if config.airport.runways.is_empty() {
        tracing::warn!("no runways configured, every flight will be unmatched");
    }

    let weather = match weather_path {
        Some(p) => load::load_weather(p)?,
        None => WeatherTable::new(),
    };
    let flights = load::load_tracks(tracks_path, gap)?;

    let reference = ReferenceData::new(config.airport.runways.clone(), weather);
    let engine = Engine::new(&config, &reference, classifier);

    let mut summary = Summary::default();
    for flight in &flights {
        match engine.process(flight) {
            Ok(result) => {
                if json {
                    println!("{}", serde_json::to_string(&result)?);
                }
                summary.record(result);
            }
            Err(rejection) => {
                *summary.rejections.entry(rejection.kind()).or_default() += 1;
            }
        }
    }
    Ok((summary, flights.len()))
}

fn cmd_runways(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let airport = &config.airport;

    println!();
    if airport.icao.is_empty() {
        println!("Airport: (not configured)");
    } else {
        println!("Airport: {} ({})", airport.name, airport.icao);
    }
    println!();

    if airport.runways.is_empty() {
        println!("No runways configured.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Runway", "Heading", "Window", "Threshold", "Gate", "Alt @ -5 km",
    ]);
    for rwy in &airport.runways {
        let window = rwy
            .heading_window
            .iter()
            .map(|r| format!("{:.0}..{:.0}", r.min, r.max))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&rwy.name),
            Cell::new(format!("{:.0}", rwy.main_heading)),
            Cell::new(window),
            Cell::new(format!(
                "{:.5}, {:.5}",
                rwy.near_threshold.lat, rwy.near_threshold.lon
            )),
            Cell::new(format!("{:.5}, {:.5}", rwy.gate.lat, rwy.gate.lon)),
            Cell::new(
                rwy.profiles
                    .altitude
                    .map(|band| format!("{:.0} ft", band.mean.eval(-5.0)))
                    .unwrap_or("-".into()),
            ),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn cmd_init_config(config_path: Option<&Path>, force: bool) -> Result<()> {
    let target = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::config_file);
    if target.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", target.display());
    }

    let written = config::save_config(&Config::default(), Some(&target))
        .with_context(|| format!("writing {}", target.display()))?;
    println!("Wrote {}", written.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Summary {
    processed: usize,
    go_arounds: Vec<DetectionResult>,
    rejections: BTreeMap<&'static str, usize>,
}

impl Summary {
    fn record(&mut self, result: DetectionResult) {
        self.processed += 1;
        if result.go_around {
            self.go_arounds.push(result);
        }
    }
}

fn format_time(epoch: i64) -> String {
    chrono::DateTime::from_timestamp(epoch, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| epoch.to_string())
}

fn format_weather(result: &DetectionResult) -> String {
    match &result.weather {
        Some(wx) => format!(
            "{:.0}C {:.0}hPa wind {:03.0}/{:.0}{}",
            wx.temperature_c,
            wx.pressure_hpa,
            wx.wind_dir_deg,
            wx.wind_speed_kts,
            if wx.convective { " CB" } else { "" }
        ),
        None => "-".into(),
    }
}

fn print_summary(summary: &Summary, flights: usize) {
    println!();
    println!(
        "Flights: {flights} loaded, {} processed, {} go-arounds",
        summary.processed,
        summary.go_arounds.len()
    );
    println!();

    if !summary.go_arounds.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![
            "ICAO", "Callsign", "Time (UTC)", "Runway", "Hdg", "Alt (ft)", "Lat", "Lon",
            "Votes", "Weather",
        ]);

        for r in &summary.go_arounds {
            let fix = r.event.as_ref();
            table.add_row(vec![
                Cell::new(&r.icao24),
                Cell::new(if r.callsign.is_empty() { "-" } else { r.callsign.as_str() }),
                Cell::new(
                    fix.map(|f| format_time(f.timestamp))
                        .unwrap_or("-".into()),
                ),
                Cell::new(r.runway_name()),
                Cell::new(
                    fix.map(|f| format!("{:.1}", f.heading_deg))
                        .unwrap_or("-".into()),
                ),
                Cell::new(
                    fix.map(|f| format!("{:.0}", f.altitude_ft))
                        .unwrap_or("-".into()),
                ),
                Cell::new(fix.map(|f| format!("{:.4}", f.lat)).unwrap_or("-".into())),
                Cell::new(fix.map(|f| format!("{:.4}", f.lon)).unwrap_or("-".into())),
                Cell::new(format!("{}/5", r.votes.count())),
                Cell::new(format_weather(r)),
            ]);
        }
        println!("{table}");
        println!();
    }

    if !summary.rejections.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Rejected", "Flights"]);
        for (kind, count) in &summary.rejections {
            table.add_row(vec![Cell::new(kind), Cell::new(count)]);
        }
        println!("{table}");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
