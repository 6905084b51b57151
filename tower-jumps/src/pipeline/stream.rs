//! Async streaming adapter
//!
//! Runs the synchronous [`AnalysisRun`] on a blocking worker and forwards
//! its events, in order, through a bounded channel. A supervisor task
//! awaits the worker and holds the last sender, so the channel closes only
//! after the terminal event has been queued. A worker panic becomes an
//! `error` event. Dropping the receiver stops the worker at its next send;
//! the result handle then yields the intervals completed so far.

use super::events::AnalysisEvent;
use super::orchestrator::{run, AnalysisRun};
use crate::app::config::AnalysisConfig;
use crate::data::types::{ClassifiedInterval, LocationSample};
use crate::{Error, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

/// Prefix of the error event for a worker that died
pub const STREAM_ERROR_PREFIX: &str = "Analysis error: ";

/// Events and final result of a spawned run
pub struct AnalysisStream {
    /// Pipeline events in production order
    pub events: mpsc::Receiver<AnalysisEvent>,
    /// Intervals once the worker stops (partial if cancelled, empty on error)
    pub result: JoinHandle<Vec<ClassifiedInterval>>,
}

impl AnalysisStream {
    /// Split into a `Stream` of events and the result handle
    pub fn into_stream(self) -> (ReceiverStream<AnalysisEvent>, JoinHandle<Vec<ClassifiedInterval>>) {
        (ReceiverStream::new(self.events), self.result)
    }

    /// Drain every event, then wait for the intervals
    pub async fn collect(mut self) -> Result<(Vec<AnalysisEvent>, Vec<ClassifiedInterval>)> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let intervals = self
            .result
            .await
            .map_err(|e| Error::Analysis(format!("analysis supervisor failed: {}", e)))?;
        Ok((events, intervals))
    }
}

/// Start a run over `samples` on the blocking pool
///
/// Must be called from within a Tokio runtime.
pub fn spawn_analysis(samples: Vec<LocationSample>, config: AnalysisConfig, capacity: usize) -> AnalysisStream {
    spawn_run(run(samples, config), capacity)
}

/// Stream an already-configured run
pub fn spawn_run(analysis: AnalysisRun, capacity: usize) -> AnalysisStream {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let run_id = analysis.run_id();

    let worker_tx = tx.clone();
    let worker = tokio::task::spawn_blocking(move || forward_events(analysis, worker_tx));

    let result = tokio::spawn(async move {
        match worker.await {
            Ok(intervals) => {
                info!(%run_id, intervals = intervals.len(), "Streaming analysis completed");
                intervals
            }
            Err(e) => {
                let details = failure_message(e);
                error!(%run_id, error = %details, "Analysis worker failed");
                let event = AnalysisEvent::error(
                    Utc::now(),
                    format!("{}{}", STREAM_ERROR_PREFIX, details),
                    Error::Analysis(details.clone()).kind(),
                    Some(details),
                );
                if tx.send(event).await.is_err() {
                    debug!(%run_id, "Receiver gone before worker failure was reported");
                }
                Vec::new()
            }
        }
    });

    AnalysisStream { events: rx, result }
}

fn forward_events(mut analysis: AnalysisRun, tx: mpsc::Sender<AnalysisEvent>) -> Vec<ClassifiedInterval> {
    let run_id = analysis.run_id();
    let mut sent = 0usize;

    while let Some(event) = analysis.next() {
        if tx.blocking_send(event).is_err() {
            warn!(%run_id, events_sent = sent, state = ?analysis.state(), "Event receiver dropped, stopping analysis");
            break;
        }
        sent += 1;
    }

    debug!(%run_id, events_sent = sent, "Analysis worker finished");
    analysis.into_intervals()
}

fn failure_message(e: JoinError) -> String {
    if !e.is_panic() {
        return "analysis worker was cancelled".to_string();
    }
    let payload = e.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "analysis worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::events::EventKind;
    use chrono::{DateTime, Duration, TimeZone};
    use tokio_stream::StreamExt;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    fn samples(count: i64) -> Vec<LocationSample> {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                LocationSample::new(t0 + Duration::minutes(i * 15))
                    .with_location(40.0 + i as f64 * 0.001, -74.0)
                    .with_region(if i % 2 == 0 { "NY" } else { "NJ" })
            })
            .collect()
    }

    #[tokio::test]
    async fn test_stream_matches_batch() {
        let config = AnalysisConfig::default();
        let (batch_events, batch_intervals) =
            run(samples(12), config.clone()).with_clock(fixed_clock).run_to_completion();

        let stream = spawn_run(run(samples(12), config).with_clock(fixed_clock), 2);
        let (events, intervals) = stream.collect().await.unwrap();

        assert_eq!(events, batch_events);
        assert_eq!(intervals, batch_intervals);
        assert_eq!(events.last().map(AnalysisEvent::kind), Some(EventKind::Completion));
    }

    #[tokio::test]
    async fn test_into_stream() {
        let (mut stream, result) = spawn_analysis(samples(3), AnalysisConfig::default(), 4).into_stream();
        let mut kinds = Vec::new();
        while let Some(event) = stream.next().await {
            kinds.push(event.kind());
        }
        assert_eq!(kinds.first(), Some(&EventKind::DataLoading));
        assert_eq!(kinds.last(), Some(&EventKind::Completion));
        assert_eq!(result.await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_data_error_is_last_event() {
        let no_location = vec![LocationSample::new(fixed_clock())];
        let (events, intervals) = spawn_analysis(no_location, AnalysisConfig::default(), 1)
            .collect()
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind(), EventKind::Error);
        assert!(intervals.is_empty());
    }

    fn panicking_clock() -> DateTime<Utc> {
        panic!("clock unavailable")
    }

    #[tokio::test]
    async fn test_worker_panic_becomes_error_event() {
        let analysis = run(samples(2), AnalysisConfig::default()).with_clock(panicking_clock);
        let AnalysisStream { mut events, result } = spawn_run(analysis, 4);

        let event = events.recv().await.unwrap();
        assert_eq!(event.kind(), EventKind::Error);
        assert_eq!(event.message, "Analysis error: clock unavailable");
        let data = serde_json::to_value(&event).unwrap()["data"].clone();
        assert_eq!(data["error_type"], "ANALYSIS_ERROR");

        assert!(events.recv().await.is_none());
        assert!(result.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_receiver_drop_cancels_run() {
        let AnalysisStream { mut events, result } = spawn_analysis(samples(50), AnalysisConfig::default(), 1);
        let first = events.recv().await.unwrap();
        assert_eq!(first.kind(), EventKind::DataLoading);
        drop(events);

        let intervals = result.await.unwrap();
        assert!(intervals.len() < 50);
    }
}
