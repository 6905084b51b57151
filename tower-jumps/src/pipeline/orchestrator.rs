//! Pipeline Orchestrator
//!
//! Drives one analysis run as a lazy state machine:
//!
//! ```text
//! Start → Filtering → ComputingMetrics → DetectingAnomalies → Windowing
//!       → ClassifyingWindows(1..=N) → Summarizing → Done
//! ```
//!
//! Any stage may instead move to `Failed`. Each call to [`Iterator::next`]
//! advances at most one stage (one window while classifying), so events can
//! be consumed incrementally. The classified intervals are a separate
//! output, available from [`AnalysisRun::intervals`] once the event stream
//! is exhausted.

use super::events::{AnalysisEvent, LoadingData, ProcessingStep};
use crate::analysis::{
    anomaly::{anomaly_rate, tag_anomalies},
    classifier::{classify_window, select_window_samples},
    metrics::{filter_located, score_samples},
    summary::generate_summary,
    windowing::create_windows,
};
use crate::app::config::AnalysisConfig;
use crate::data::types::{ClassifiedInterval, LocationSample, ScoredSample, TimeWindow};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::{debug, error, info, info_span, Span};
use uuid::Uuid;

/// Source of event timestamps
pub type Clock = fn() -> DateTime<Utc>;

/// Prefix of the terminal error event for a failed stage
pub const FAILURE_PREFIX: &str = "Analysis failed: ";

const NO_LOCATION_DETAILS: &str = "All records are missing latitude/longitude coordinates";

/// Windows between coarse progress markers
pub const PROGRESS_MARKER_INTERVAL: usize = 100;

/// Stage of an analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Filtering,
    ComputingMetrics,
    DetectingAnomalies,
    Windowing,
    /// Next window to classify (0-based)
    ClassifyingWindows { window: usize },
    Summarizing,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_finished(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

/// Start an analysis run over `samples`
pub fn run(samples: Vec<LocationSample>, config: AnalysisConfig) -> AnalysisRun {
    AnalysisRun::new(samples, config)
}

/// A single, non-restartable analysis run
pub struct AnalysisRun {
    config: AnalysisConfig,
    input: Vec<LocationSample>,
    located: Vec<LocationSample>,
    scored: Vec<ScoredSample>,
    windows: Vec<TimeWindow>,
    intervals: Vec<ClassifiedInterval>,
    tower_jumps: usize,
    state: PipelineState,
    pending: VecDeque<AnalysisEvent>,
    clock: Clock,
    run_id: Uuid,
    span: Span,
}

impl AnalysisRun {
    pub fn new(samples: Vec<LocationSample>, config: AnalysisConfig) -> Self {
        let run_id = Uuid::new_v4();
        Self {
            config,
            input: samples,
            located: Vec::new(),
            scored: Vec::new(),
            windows: Vec::new(),
            intervals: Vec::new(),
            tower_jumps: 0,
            state: PipelineState::Start,
            pending: VecDeque::new(),
            clock: Utc::now,
            run_id,
            span: info_span!("analysis", run_id = %run_id),
        }
    }

    /// Use a fixed time source for event timestamps
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Final intervals; `None` until every event has been consumed
    pub fn intervals(&self) -> Option<&[ClassifiedInterval]> {
        if self.state.is_finished() && self.pending.is_empty() {
            Some(&self.intervals)
        } else {
            None
        }
    }

    /// Intervals completed so far (partial if the run was abandoned)
    pub fn into_intervals(self) -> Vec<ClassifiedInterval> {
        self.intervals
    }

    /// Drain every event and return them with the final intervals
    pub fn run_to_completion(mut self) -> (Vec<AnalysisEvent>, Vec<ClassifiedInterval>) {
        let events: Vec<AnalysisEvent> = self.by_ref().collect();
        (events, self.intervals)
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn emit(&mut self, event: AnalysisEvent) {
        self.pending.push_back(event);
    }

    fn advance(&mut self) {
        let span = self.span.clone();
        let _guard = span.enter();

        if let Err(e) = self.step() {
            self.fail(e);
        }
    }

    fn fail(&mut self, e: Error) {
        error!(
            error = %e,
            error_kind = e.kind(),
            intervals_processed = self.intervals.len(),
            total_records = self.input.len(),
            "Analysis failed"
        );
        let event = AnalysisEvent::from_error(self.now(), FAILURE_PREFIX, &e);
        self.emit(event);
        self.intervals.clear();
        self.state = PipelineState::Failed;
    }

    fn step(&mut self) -> Result<()> {
        match self.state {
            PipelineState::Start => self.start(),
            PipelineState::Filtering => self.filter(),
            PipelineState::ComputingMetrics => self.compute_metrics(),
            PipelineState::DetectingAnomalies => self.detect_anomalies(),
            PipelineState::Windowing => self.create_windows(),
            PipelineState::ClassifyingWindows { window } => self.classify(window),
            PipelineState::Summarizing => self.summarize(),
            PipelineState::Done | PipelineState::Failed => Ok(()),
        }
    }

    fn start(&mut self) -> Result<()> {
        info!(
            total_records = self.input.len(),
            window_minutes = self.config.window_minutes,
            max_speed_kmh = self.config.max_speed_kmh,
            confidence_threshold = self.config.min_confidence_threshold,
            "Starting tower jumps analysis"
        );
        self.config.validate()?;

        let event = AnalysisEvent::data_loading(self.now(), "Starting data filtering...", LoadingData::default());
        self.emit(event);
        self.state = PipelineState::Filtering;
        Ok(())
    }

    fn filter(&mut self) -> Result<()> {
        let located = filter_located(&self.input);

        if located.is_empty() {
            error!(total_records = self.input.len(), "No records with location data found");
            let e = Error::Data(NO_LOCATION_DETAILS.to_string());
            let event = AnalysisEvent::error(
                self.now(),
                "No records with location data found",
                e.kind(),
                Some(NO_LOCATION_DETAILS.to_string()),
            );
            self.emit(event);
            self.intervals.clear();
            self.state = PipelineState::Failed;
            return Ok(());
        }

        info!(
            total_records = self.input.len(),
            records_with_location = located.len(),
            "Data filtering completed"
        );
        let event = AnalysisEvent::data_loading(
            self.now(),
            "Data filtering completed",
            LoadingData {
                total_records: Some(self.input.len()),
                records_with_location: Some(located.len()),
            },
        );
        self.emit(event);

        self.located = located;
        self.state = PipelineState::ComputingMetrics;
        Ok(())
    }

    fn compute_metrics(&mut self) -> Result<()> {
        let started = AnalysisEvent::processing(
            self.now(),
            "Calculating distances and speeds...",
            ProcessingStep::DistanceCalculation,
            None,
        );
        self.emit(started);

        self.scored = score_samples(&self.located)?;

        debug!(
            max_speed_kmh = self.scored.iter().map(|s| s.speed_kmh).fold(0.0, f64::max),
            "Distance and speed calculation completed"
        );
        let done = AnalysisEvent::processing(
            self.now(),
            "Distance and speed calculation completed",
            ProcessingStep::DistanceCalculation,
            Some(100.0),
        );
        self.emit(done);
        self.state = PipelineState::DetectingAnomalies;
        Ok(())
    }

    fn detect_anomalies(&mut self) -> Result<()> {
        let started = AnalysisEvent::processing(
            self.now(),
            "Detecting movement anomalies...",
            ProcessingStep::AnomalyDetection,
            None,
        );
        self.emit(started);

        self.scored = tag_anomalies(&self.scored, &self.config);

        info!(
            total_records = self.scored.len(),
            anomaly_rate = anomaly_rate(&self.scored),
            "Anomaly detection completed"
        );
        let done = AnalysisEvent::processing(
            self.now(),
            "Anomaly detection completed",
            ProcessingStep::AnomalyDetection,
            Some(100.0),
        );
        self.emit(done);
        self.state = PipelineState::Windowing;
        Ok(())
    }

    fn create_windows(&mut self) -> Result<()> {
        self.windows = create_windows(&self.scored, self.config.window_minutes)?;

        info!(
            window_count = self.windows.len(),
            window_size_minutes = self.config.window_minutes,
            "Time windows created"
        );
        let event = AnalysisEvent::window_creation(self.now(), self.windows.len(), self.config.window_minutes);
        self.emit(event);

        self.state = if self.windows.is_empty() {
            PipelineState::Summarizing
        } else {
            PipelineState::ClassifyingWindows { window: 0 }
        };
        Ok(())
    }

    fn classify(&mut self, index: usize) -> Result<()> {
        let total = self.windows.len();
        let window = self
            .windows
            .get(index)
            .copied()
            .ok_or_else(|| Error::Analysis(format!("window index {} out of range ({})", index, total)))?;
        let current = index + 1;

        let samples = select_window_samples(&self.scored, &window);
        let interval = classify_window(&window, samples, &self.config);

        if interval.sample_count > 0 {
            if interval.is_tower_jump {
                self.tower_jumps += 1;
                debug!(
                    window_index = current,
                    start_time = %window.start,
                    estimated_region = %interval.estimated_region,
                    "Tower jump detected"
                );
            }

            let analyzed = AnalysisEvent::window_analyzed(self.now(), current, total, &interval);
            self.emit(analyzed);
            let completed = AnalysisEvent::interval_completed(self.now(), &interval);
            self.emit(completed);
            self.intervals.push(interval);
        }

        if is_progress_marker(current, total) {
            let marker = AnalysisEvent::progress_marker(self.now(), current, total);
            self.emit(marker);
        }

        self.state = if current < total {
            PipelineState::ClassifyingWindows { window: current }
        } else {
            PipelineState::Summarizing
        };
        Ok(())
    }

    fn summarize(&mut self) -> Result<()> {
        let summary = generate_summary(&self.intervals);

        info!(
            total_intervals = self.intervals.len(),
            tower_jumps_detected = self.tower_jumps,
            records_with_location = self.located.len(),
            "Tower jumps analysis completed successfully"
        );
        let event = AnalysisEvent::completion(self.now(), summary, self.intervals.len(), self.tower_jumps);
        self.emit(event);
        self.state = PipelineState::Done;
        Ok(())
    }
}

impl Iterator for AnalysisRun {
    type Item = AnalysisEvent;

    fn next(&mut self) -> Option<AnalysisEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.state.is_finished() {
                return None;
            }
            self.advance();
        }
    }
}

impl std::fmt::Debug for AnalysisRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisRun")
            .field("run_id", &self.run_id)
            .field("state", &self.state)
            .field("records", &self.input.len())
            .field("windows", &self.windows.len())
            .field("intervals", &self.intervals.len())
            .field("pending_events", &self.pending.len())
            .finish()
    }
}

/// Coarse marker at every 100th window and at the quarter marks
pub fn is_progress_marker(current: usize, total: usize) -> bool {
    current % PROGRESS_MARKER_INTERVAL == 0
        || [1, total / 4, total / 2, total * 3 / 4, total].contains(&current)
}
