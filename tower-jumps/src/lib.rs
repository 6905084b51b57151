//! # Tower Jumps
//!
//! Classifies carrier location records into fixed time windows and flags the
//! windows where the subscriber appears to hop between regions faster than is
//! physically plausible ("tower jumps"), a symptom of cell-tower triangulation
//! error rather than real travel.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tower_jumps::app::config::AnalysisConfig;
//! use tower_jumps::data::loader::load_csv;
//! use tower_jumps::pipeline;
//!
//! let report = load_csv("carrier_export.csv").expect("Failed to load");
//! let mut run = pipeline::run(report.samples, AnalysisConfig::default());
//!
//! for event in run.by_ref() {
//!     println!("{}: {}", event.kind().as_str(), event.message);
//! }
//!
//! let intervals = run.into_intervals();
//! println!("{} intervals", intervals.len());
//! ```
//!
//! ## Architecture
//!
//! - [`geo`]: great-circle distance and derived speed
//! - [`data`]: sample/interval types, CSV loading, dataset statistics, report output
//! - [`analysis`]: metric derivation, anomaly tagging, windowing, classification, summary
//! - [`pipeline`]: the event-emitting state machine and its async streaming adapter
//! - [`server`]: HTTP front end streaming pipeline events as Server-Sent Events
//! - [`app`]: CLI and configuration management
//!
//! ## Data Flow
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │  CSV rows   │───▶│  Filtering  │───▶│  Distance & │───▶│   Anomaly   │
//! │  (loader)   │    │ (has coords)│    │    speed    │    │   tagging   │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//!                                                                 │
//!                                                                 ▼
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │   Summary   │◀───│ Classified  │◀───│   Window    │◀───│ Time window │
//! │             │    │  intervals  │    │ classifier  │    │   buckets   │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//! ```

pub mod geo;
pub mod data;
pub mod analysis;
pub mod pipeline;
pub mod server;
pub mod app;

// Re-export commonly used types
pub use app::config::AnalysisConfig;
pub use data::types::{ClassifiedInterval, LocationSample, ScoredSample, TimeWindow};
pub use pipeline::events::{AnalysisEvent, EventKind};
pub use pipeline::orchestrator::{run, AnalysisRun, PipelineState};

/// Result type alias for tower jump analysis
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for tower jump analysis
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Data file not found: {}", .0.display())]
    FileNotFound(std::path::PathBuf),

    #[error("Error reading CSV file: {0}")]
    Parse(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Stable tag carried by error events
    pub fn kind(&self) -> &'static str {
        match self {
            Error::FileNotFound(_) => "FILE_NOT_FOUND",
            Error::Parse(_) => "PARSE_ERROR",
            Error::Data(_) => "DATA_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Analysis(_) => "ANALYSIS_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Csv(_) => "CSV_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}
