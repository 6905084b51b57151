//! Analysis pipeline
//!
//! The synchronous, event-emitting orchestrator and the adapter that
//! streams its events across an async boundary.

pub mod events;
pub mod orchestrator;
pub mod stream;

pub use events::{AnalysisEvent, EventData, EventKind};
pub use orchestrator::{run, AnalysisRun, PipelineState};
pub use stream::{spawn_analysis, AnalysisStream};
