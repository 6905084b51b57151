//! Location analysis
//!
//! Stateless stages applied in order by the pipeline:
//! - Distance and speed derivation between consecutive samples
//! - Anomalous movement tagging
//! - Calendar-aligned time windowing
//! - Per-window region estimate, jump detection and confidence
//! - Run summary

pub mod metrics;
pub mod anomaly;
pub mod windowing;
pub mod classifier;
pub mod summary;

pub use anomaly::tag_anomalies;
pub use classifier::{classify_window, select_window_samples};
pub use metrics::{filter_located, score_samples};
pub use summary::{generate_summary, AnalysisSummary};
pub use windowing::create_windows;
