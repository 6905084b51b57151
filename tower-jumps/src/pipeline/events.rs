//! Pipeline Events
//!
//! Progress and result notifications produced by an analysis run. Every
//! event serializes as `{type, timestamp, message, data}`, where `data`
//! depends on the kind, and renders as a Server-Sent-Events frame.

use crate::analysis::summary::{jump_percentage, AnalysisSummary};
use crate::data::types::{round1, ClassifiedInterval};
use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;

/// Event category, serialized as its snake_case tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DataLoading,
    Processing,
    WindowCreation,
    AnalysisProgress,
    IntervalCompleted,
    Completion,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DataLoading => "data_loading",
            EventKind::Processing => "processing",
            EventKind::WindowCreation => "window_creation",
            EventKind::AnalysisProgress => "analysis_progress",
            EventKind::IntervalCompleted => "interval_completed",
            EventKind::Completion => "completion",
            EventKind::Error => "error",
        }
    }

    /// Whether this kind ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Completion | EventKind::Error)
    }
}

/// Processing sub-step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStep {
    DistanceCalculation,
    AnomalyDetection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadingData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_with_location: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingData {
    pub step: ProcessingStep,
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowCreationData {
    pub window_count: usize,
    pub window_size_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressData {
    pub current_window: usize,
    pub total_windows: usize,
    pub progress_percentage: f64,
    pub estimated_state: Option<String>,
    pub is_tower_jump: Option<bool>,
}

/// Interval fields with confidence as a percentage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalData {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub estimated_state: String,
    pub is_tower_jump: bool,
    pub confidence: f64,
    pub record_count: usize,
    pub states_observed: BTreeSet<String>,
    pub max_distance_km: Option<f64>,
    pub max_speed_kmh: Option<f64>,
}

impl From<&ClassifiedInterval> for IntervalData {
    fn from(interval: &ClassifiedInterval) -> Self {
        Self {
            start_time: interval.start_time,
            end_time: interval.end_time,
            estimated_state: interval.estimated_region.clone(),
            is_tower_jump: interval.is_tower_jump,
            confidence: interval.confidence_percentage(),
            record_count: interval.sample_count,
            states_observed: interval.regions_observed.clone(),
            max_distance_km: interval.max_distance_km,
            max_speed_kmh: interval.max_speed_kmh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionData {
    /// Serialized as `{}` when there is nothing to summarize
    #[serde(serialize_with = "summary_or_empty")]
    pub summary: Option<AnalysisSummary>,
    pub total_intervals: usize,
    pub tower_jumps_detected: usize,
    pub tower_jump_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorData {
    pub error_type: String,
    pub error_details: Option<String>,
}

/// Kind-specific event payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventData {
    DataLoading(LoadingData),
    Processing(ProcessingData),
    WindowCreation(WindowCreationData),
    AnalysisProgress(ProgressData),
    IntervalCompleted(IntervalData),
    Completion(CompletionData),
    Error(ErrorData),
}

impl EventData {
    pub fn kind(&self) -> EventKind {
        match self {
            EventData::DataLoading(_) => EventKind::DataLoading,
            EventData::Processing(_) => EventKind::Processing,
            EventData::WindowCreation(_) => EventKind::WindowCreation,
            EventData::AnalysisProgress(_) => EventKind::AnalysisProgress,
            EventData::IntervalCompleted(_) => EventKind::IntervalCompleted,
            EventData::Completion(_) => EventKind::Completion,
            EventData::Error(_) => EventKind::Error,
        }
    }
}

fn summary_or_empty<S: Serializer>(summary: &Option<AnalysisSummary>, serializer: S) -> Result<S::Ok, S::Error> {
    match summary {
        Some(summary) => summary.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// One pipeline notification
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub data: EventData,
}

impl Serialize for AnalysisEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AnalysisEvent", 4)?;
        state.serialize_field("type", &self.kind())?;
        state.serialize_field("timestamp", &self.timestamp)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("data", &self.data)?;
        state.end()
    }
}

impl AnalysisEvent {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>, data: EventData) -> Self {
        Self {
            timestamp,
            message: message.into(),
            data,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }

    pub fn data_loading(timestamp: DateTime<Utc>, message: impl Into<String>, counts: LoadingData) -> Self {
        Self::new(timestamp, message, EventData::DataLoading(counts))
    }

    pub fn processing(
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
        step: ProcessingStep,
        progress: Option<f64>,
    ) -> Self {
        Self::new(timestamp, message, EventData::Processing(ProcessingData { step, progress }))
    }

    pub fn window_creation(timestamp: DateTime<Utc>, window_count: usize, window_size_minutes: u32) -> Self {
        Self::new(
            timestamp,
            format!("Created {} time windows", window_count),
            EventData::WindowCreation(WindowCreationData {
                window_count,
                window_size_minutes,
            }),
        )
    }

    /// Per-window progress carrying the window's verdict
    pub fn window_analyzed(
        timestamp: DateTime<Utc>,
        current: usize,
        total: usize,
        interval: &ClassifiedInterval,
    ) -> Self {
        Self::new(
            timestamp,
            format!("Analyzed window {}/{}: {}", current, total, interval.estimated_region),
            EventData::AnalysisProgress(ProgressData {
                current_window: current,
                total_windows: total,
                progress_percentage: progress_percentage(current, total),
                estimated_state: Some(interval.estimated_region.clone()),
                is_tower_jump: Some(interval.is_tower_jump),
            }),
        )
    }

    /// Coarse progress marker without a verdict
    pub fn progress_marker(timestamp: DateTime<Utc>, current: usize, total: usize) -> Self {
        Self::new(
            timestamp,
            format!("Processing progress: {}/{} windows analyzed", current, total),
            EventData::AnalysisProgress(ProgressData {
                current_window: current,
                total_windows: total,
                progress_percentage: progress_percentage(current, total),
                estimated_state: None,
                is_tower_jump: None,
            }),
        )
    }

    pub fn interval_completed(timestamp: DateTime<Utc>, interval: &ClassifiedInterval) -> Self {
        Self::new(
            timestamp,
            format!(
                "Completed interval {} - {}",
                interval.start_time.format("%H:%M"),
                interval.end_time.format("%H:%M")
            ),
            EventData::IntervalCompleted(IntervalData::from(interval)),
        )
    }

    pub fn completion(
        timestamp: DateTime<Utc>,
        summary: Option<AnalysisSummary>,
        total_intervals: usize,
        tower_jumps: usize,
    ) -> Self {
        Self::new(
            timestamp,
            "Analysis completed successfully",
            EventData::Completion(CompletionData {
                summary,
                total_intervals,
                tower_jumps_detected: tower_jumps,
                tower_jump_percentage: jump_percentage(tower_jumps, total_intervals),
            }),
        )
    }

    pub fn error(
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
        error_type: impl Into<String>,
        error_details: Option<String>,
    ) -> Self {
        Self::new(
            timestamp,
            message,
            EventData::Error(ErrorData {
                error_type: error_type.into(),
                error_details,
            }),
        )
    }

    /// Error event for a failed run: `"<prefix><error>"`, tagged with the error kind
    pub fn from_error(timestamp: DateTime<Utc>, prefix: &str, error: &crate::Error) -> Self {
        Self::error(
            timestamp,
            format!("{}{}", prefix, error),
            error.kind(),
            Some(error.to_string()),
        )
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// `event: <type>\ndata: <json>\n\n`
    pub fn to_sse_frame(&self) -> crate::Result<String> {
        Ok(format!("event: {}\ndata: {}\n\n", self.kind().as_str(), self.to_json()?))
    }
}

fn progress_percentage(current: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round1(current as f64 / total as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::TimeWindow;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap()
    }

    fn interval() -> ClassifiedInterval {
        let window = TimeWindow::new(ts(), ts() + chrono::Duration::minutes(15));
        let mut interval = ClassifiedInterval::empty(&window);
        interval.estimated_region = "NY".to_string();
        interval.confidence = 0.8567;
        interval.sample_count = 3;
        interval
    }

    fn to_value(event: &AnalysisEvent) -> Value {
        serde_json::to_value(event).unwrap()
    }

    #[test]
    fn test_kind_tags_match_serialization() {
        for kind in [
            EventKind::DataLoading,
            EventKind::Processing,
            EventKind::WindowCreation,
            EventKind::AnalysisProgress,
            EventKind::IntervalCompleted,
            EventKind::Completion,
            EventKind::Error,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }

    #[test]
    fn test_envelope_shape() {
        let event = AnalysisEvent::data_loading(ts(), "Starting data filtering...", LoadingData::default());
        let value = to_value(&event);
        assert_eq!(value["type"], "data_loading");
        assert_eq!(value["message"], "Starting data filtering...");
        assert_eq!(value["data"], json!({}));
        assert!(value["timestamp"].as_str().unwrap().starts_with("2025-01-15T14:30:00"));
    }

    #[test]
    fn test_processing_progress_is_nullable() {
        let event = AnalysisEvent::processing(ts(), "Detecting...", ProcessingStep::AnomalyDetection, None);
        assert_eq!(to_value(&event)["data"], json!({"step": "anomaly_detection", "progress": null}));
    }

    #[test]
    fn test_window_progress() {
        let event = AnalysisEvent::window_analyzed(ts(), 1, 3, &interval());
        assert_eq!(event.message, "Analyzed window 1/3: NY");
        let data = &to_value(&event)["data"];
        assert_eq!(data["progress_percentage"], 33.3);
        assert_eq!(data["estimated_state"], "NY");
        assert_eq!(data["is_tower_jump"], false);

        let marker = AnalysisEvent::progress_marker(ts(), 3, 3);
        let data = &to_value(&marker)["data"];
        assert_eq!(data["progress_percentage"], 100.0);
        assert!(data["estimated_state"].is_null());
    }

    #[test]
    fn test_interval_completed_confidence_is_percentage() {
        let event = AnalysisEvent::interval_completed(ts(), &interval());
        assert_eq!(event.message, "Completed interval 14:30 - 14:45");
        let data = &to_value(&event)["data"];
        assert_eq!(data["confidence"], 85.7);
        assert_eq!(data["record_count"], 3);
        assert_eq!(data["estimated_state"], "NY");
    }

    #[test]
    fn test_completion_without_summary() {
        let event = AnalysisEvent::completion(ts(), None, 0, 0);
        assert!(event.is_terminal());
        let data = &to_value(&event)["data"];
        assert_eq!(data["summary"], json!({}));
        assert_eq!(data["tower_jump_percentage"], 0.0);
    }

    #[test]
    fn test_error_from_crate_error() {
        let err = crate::Error::Data("no rows".to_string());
        let event = AnalysisEvent::from_error(ts(), "Analysis failed: ", &err);
        assert!(event.is_terminal());
        assert_eq!(event.message, "Analysis failed: Data error: no rows");
        let data = &to_value(&event)["data"];
        assert_eq!(data["error_type"], "DATA_ERROR");
        assert_eq!(data["error_details"], "Data error: no rows");
    }

    #[test]
    fn test_sse_frame() {
        let event = AnalysisEvent::window_creation(ts(), 4, 15);
        let frame = event.to_sse_frame().unwrap();
        assert!(frame.starts_with("event: window_creation\ndata: {"));
        assert!(frame.ends_with("}\n\n"));
        assert!(frame.contains("\"window_count\":4"));
    }
}
