//! goaround-core: Go-around detection for recorded aircraft surveillance tracks.
//!
//! No async, no network: just algorithms plus the config file helpers. The
//! `goaround` CLI in `goaround-cli` loads tracks and weather from disk and
//! feeds them through [`Engine`].

pub mod config;
pub mod detect;
pub mod engine;
pub mod phase;
pub mod preprocess;
pub mod runway;
pub mod stats;
pub mod takeoff;
pub mod types;
pub mod weather;
pub mod window;

// Re-export commonly used types at crate root
pub use config::Config;
pub use detect::{Detection, GoAroundDetector, MethodVotes};
pub use engine::{DetectionResult, Engine, EventFix, ReferenceData};
pub use phase::{FuzzyClassifier, PhaseClassifier};
pub use runway::{Runway, RunwayMatch};
pub use takeoff::TakeoffSignature;
pub use types::*;
pub use weather::{WeatherObservation, WeatherTable};
