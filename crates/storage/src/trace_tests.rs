// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn sample_trace(run_id: &str, quality: f64) -> TrainingTrace {
    TrainingTrace {
        run_id: run_id.to_string(),
        user_intent: "add auth".to_string(),
        workspace_summary: "core/ ui/".to_string(),
        subtasks: vec![],
        assignments: vec![],
        subtask_results: vec![],
        duration_ms: 1200,
        quality,
        timestamp: 0.0,
    }
}

#[test]
fn quality_from_statuses_is_completed_over_total() {
    assert_eq!(TrainingTrace::quality_from_statuses([true, true, false, true]), 0.75);
    assert_eq!(TrainingTrace::quality_from_statuses([]), 0.0);
}

#[test]
fn record_run_stamps_timestamp_and_round_trips() {
    let dir = tempdir().unwrap();
    let collector = TraceCollector::new(dir.path());
    collector.record_run(sample_trace("run-1", 1.0)).unwrap();

    let traces = collector.list_all().unwrap();
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].run_id, "run-1");
    assert!(traces[0].timestamp > 0.0);
}

#[test]
fn list_all_is_empty_when_directory_is_missing() {
    let dir = tempdir().unwrap();
    let collector = TraceCollector::new(dir.path().join("nonexistent"));
    assert!(collector.list_all().unwrap().is_empty());
}

#[test]
fn list_all_sorts_oldest_first_by_timestamp() {
    let dir = tempdir().unwrap();
    let collector = TraceCollector::new(dir.path());
    collector.record_run(sample_trace("run-a", 1.0)).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    collector.record_run(sample_trace("run-b", 0.5)).unwrap();

    let traces = collector.list_all().unwrap();
    assert_eq!(traces.len(), 2);
    assert!(traces[0].timestamp <= traces[1].timestamp);
}
