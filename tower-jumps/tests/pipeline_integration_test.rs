//! Pipeline Integration Tests
//!
//! End-to-end runs of the analysis state machine:
//! - Cross-country hops flagged as jumps
//! - Rapid region alternation without implausible speed
//! - Failure paths (no coordinates, invalid configuration)

use chrono::{DateTime, Duration, TimeZone, Utc};
use tower_jumps::analysis::{generate_summary, score_samples, tag_anomalies};
use tower_jumps::pipeline::events::EventKind;
use tower_jumps::{run, AnalysisConfig, LocationSample, PipelineState};

// ============================================================================
// Helper Functions
// ============================================================================

const NYC: (f64, f64) = (40.7128, -74.0060);
const LA: (f64, f64) = (34.0522, -118.2437);

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, hour, minute, 0).unwrap()
}

fn sample(time: DateTime<Utc>, (lat, lon): (f64, f64), region: &str) -> LocationSample {
    LocationSample::new(time).with_location(lat, lon).with_region(region)
}

fn cross_country() -> Vec<LocationSample> {
    vec![
        sample(at(14, 30), NYC, "NY"),
        sample(at(14, 35), LA, "CA"),
        sample(at(14, 40), NYC, "NY"),
        sample(at(15, 10), (40.7130, -74.0062), "NY"),
    ]
}

/// Alternating regions a kilometre or so apart, three minutes between samples
fn border_hopping(regions: &[&str]) -> Vec<LocationSample> {
    regions
        .iter()
        .enumerate()
        .map(|(i, region)| {
            let coords = if *region == "NY" { (40.70, -74.02) } else { (40.71, -74.03) };
            sample(at(10, 0) + Duration::minutes(3 * i as i64), coords, region)
        })
        .collect()
}

// ============================================================================
// Scoring
// ============================================================================

#[test]
fn test_cross_country_hop_is_anomalous() {
    let config = AnalysisConfig::default();
    let scored = tag_anomalies(&score_samples(&cross_country()).unwrap(), &config);

    assert_eq!(scored[0].distance_km, 0.0);
    assert!(!scored[0].is_anomalous);

    let hop = &scored[1];
    assert!(hop.distance_km > 3900.0 && hop.distance_km < 4000.0);
    assert!(hop.speed_kmh > 1000.0);
    assert!(hop.is_anomalous);

    assert!(!scored[3].is_anomalous);
}

// ============================================================================
// Full runs
// ============================================================================

#[test]
fn test_cross_country_run() {
    let (events, intervals) = run(cross_country(), AnalysisConfig::default()).run_to_completion();

    assert_eq!(intervals.len(), 2);

    let first = &intervals[0];
    assert_eq!(first.start_time, at(14, 30));
    assert_eq!(first.end_time, at(14, 45));
    assert_eq!(first.estimated_region, "NY");
    assert!(first.is_tower_jump);
    assert_eq!(first.sample_count, 3);
    assert!(first.regions_observed.contains("CA"));
    assert!(first.regions_observed.contains("NY"));
    // 0.4 * 2/3 + 0.3 * 0.3 + 0.3 * 1/3
    assert!((first.confidence - 0.4567).abs() < 1e-3);

    let second = &intervals[1];
    assert_eq!(second.start_time, at(15, 0));
    assert!(!second.is_tower_jump);
    assert_eq!(second.sample_count, 1);
    // 0.4 * 1 + 0.3 * 0.1 + 0.3 * 1
    assert!((second.confidence - 0.73).abs() < 1e-9);

    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds.first(), Some(&EventKind::DataLoading));
    assert_eq!(kinds.last(), Some(&EventKind::Completion));
    assert_eq!(kinds.iter().filter(|k| **k == EventKind::IntervalCompleted).count(), 2);
    assert!(!kinds.contains(&EventKind::Error));

    let completion = serde_json::to_value(events.last().unwrap()).unwrap();
    assert_eq!(completion["type"], "completion");
    assert_eq!(completion["data"]["total_intervals"], 2);
    assert_eq!(completion["data"]["tower_jumps_detected"], 1);
    assert_eq!(completion["data"]["tower_jump_percentage"], 50.0);
    assert_eq!(completion["data"]["summary"]["most_common_state"], "NY");
}

#[test]
fn test_rapid_region_changes_flag_jump() {
    let (_, intervals) = run(border_hopping(&["NY", "NJ", "NY", "NJ"]), AnalysisConfig::default())
        .run_to_completion();

    assert_eq!(intervals.len(), 1);
    assert!(intervals[0].is_tower_jump);
    assert!(intervals[0].max_speed_kmh.unwrap() < 128.0);
}

#[test]
fn test_two_region_changes_are_tolerated() {
    let (_, intervals) = run(border_hopping(&["NY", "NJ", "NY"]), AnalysisConfig::default())
        .run_to_completion();

    assert_eq!(intervals.len(), 1);
    assert!(!intervals[0].is_tower_jump);
    assert_eq!(intervals[0].estimated_region, "NY");
}

#[test]
fn test_wider_window_merges_intervals() {
    let config = AnalysisConfig::default().with_window_minutes(120);
    let (_, intervals) = run(cross_country(), config).run_to_completion();

    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].start_time, at(14, 0));
    assert_eq!(intervals[0].sample_count, 4);
}

#[test]
fn test_summary_over_run() {
    let (_, intervals) = run(cross_country(), AnalysisConfig::default()).run_to_completion();
    let summary = generate_summary(&intervals).unwrap();

    assert_eq!(summary.total_intervals, 2);
    assert_eq!(summary.tower_jump_intervals, 1);
    assert_eq!(summary.tower_jump_percentage, 50.0);
    assert_eq!(summary.most_common_region, "NY");
    assert_eq!(summary.regions_observed, vec!["NY".to_string()]);
}

// ============================================================================
// Failure paths
// ============================================================================

#[test]
fn test_no_location_emits_data_error() {
    let samples = vec![
        LocationSample::new(at(9, 0)).with_region("NY"),
        LocationSample::new(at(9, 5)).with_location(0.0, 0.0).with_region("NY"),
    ];
    let mut analysis = run(samples, AnalysisConfig::default());
    let events: Vec<_> = analysis.by_ref().collect();

    assert_eq!(analysis.state(), PipelineState::Failed);
    assert_eq!(events.len(), 2);

    let error = serde_json::to_value(&events[1]).unwrap();
    assert_eq!(error["type"], "error");
    assert_eq!(error["message"], "No records with location data found");
    assert_eq!(error["data"]["error_type"], "DATA_ERROR");
    assert!(analysis.into_intervals().is_empty());
}

#[test]
fn test_invalid_config_fails_before_filtering() {
    let mut config = AnalysisConfig::default();
    config.window_minutes = 0;

    let (events, intervals) = run(cross_country(), config).run_to_completion();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), EventKind::Error);
    assert!(events[0].message.starts_with("Analysis failed: "));
    assert!(intervals.is_empty());
}

#[test]
fn test_empty_input_is_a_data_error() {
    let (events, intervals) = run(Vec::new(), AnalysisConfig::default()).run_to_completion();

    assert_eq!(events.last().map(|e| e.kind()), Some(EventKind::Error));
    assert!(intervals.is_empty());
}
