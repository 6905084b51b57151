//! Data Layer
//!
//! Sample and interval types, plus the I/O collaborators around the
//! analysis core: CSV loading, dataset statistics and report output.

pub mod types;
pub mod loader;
pub mod validation;
pub mod report;

pub use loader::{load_csv, LoadReport};
pub use report::write_report;
pub use types::{ClassifiedInterval, LocationSample, ScoredSample, TimeWindow, UNKNOWN_REGION};
pub use validation::{validate_data, DatasetStats};
