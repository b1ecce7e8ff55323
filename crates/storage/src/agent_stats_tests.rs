// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn tmp_stats(dir: &TempDir) -> AgentStats {
    AgentStats::load(dir.path().join("agent_stats.json"))
}

#[test]
fn empty_stats() {
    let dir = TempDir::new().unwrap();
    let stats = tmp_stats(&dir);
    assert!(stats.all_stats().is_empty());
    assert!(stats.best_agent_for("ui", "typescript").is_none());
}

#[test]
fn record_outcome() {
    let dir = TempDir::new().unwrap();
    let stats = tmp_stats(&dir);
    stats.record_outcome("claude-code", "ui", "typescript", true, 1000, 0.0).unwrap();

    let all = stats.all_stats();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].agent_type, "claude-code");
    assert_eq!(all[0].success_rate, 1.0);
    assert_eq!(all[0].sample_count, 1);
}

#[test]
fn record_multiple_outcomes() {
    let dir = TempDir::new().unwrap();
    let stats = tmp_stats(&dir);
    stats.record_outcome("claude-code", "ui", "typescript", true, 1000, 0.0).unwrap();
    stats.record_outcome("claude-code", "ui", "typescript", true, 2000, 0.0).unwrap();
    stats.record_outcome("claude-code", "ui", "typescript", false, 500, 0.0).unwrap();

    let perf = stats.get_performance("claude-code", "ui", "typescript").expect("recorded");
    assert_eq!(perf.sample_count, 3);
    assert!((perf.success_rate - 2.0 / 3.0).abs() < 0.01);
    assert_eq!(perf.avg_tokens, (1000 + 2000 + 500) / 3);
}

#[test]
fn best_agent_insufficient_data() {
    let dir = TempDir::new().unwrap();
    let stats = tmp_stats(&dir);
    stats.record_outcome("claude-code", "ui", "typescript", true, 0, 0.0).unwrap();
    stats.record_outcome("claude-code", "ui", "typescript", true, 0, 0.0).unwrap();
    assert!(stats.best_agent_for("ui", "typescript").is_none());
}

#[test]
fn best_agent_sufficient_data() {
    let dir = TempDir::new().unwrap();
    let stats = tmp_stats(&dir);
    for _ in 0..3 {
        stats.record_outcome("claude-code", "ui", "typescript", true, 0, 0.0).unwrap();
    }
    for _ in 0..3 {
        stats.record_outcome("opencode", "ui", "typescript", false, 0, 0.0).unwrap();
    }
    assert_eq!(stats.best_agent_for("ui", "typescript"), Some("claude-code".to_string()));
}

#[test]
fn best_agent_picks_higher_rate() {
    let dir = TempDir::new().unwrap();
    let stats = tmp_stats(&dir);
    stats.record_outcome("claude-code", "backend", "rust", true, 0, 0.0).unwrap();
    stats.record_outcome("claude-code", "backend", "rust", true, 0, 0.0).unwrap();
    stats.record_outcome("claude-code", "backend", "rust", false, 0, 0.0).unwrap();

    stats.record_outcome("codex", "backend", "rust", true, 0, 0.0).unwrap();
    stats.record_outcome("codex", "backend", "rust", true, 0, 0.0).unwrap();
    stats.record_outcome("codex", "backend", "rust", true, 0, 0.0).unwrap();

    assert_eq!(stats.best_agent_for("backend", "rust"), Some("codex".to_string()));
}

#[test]
fn get_stats_summary_empty() {
    let dir = TempDir::new().unwrap();
    let stats = tmp_stats(&dir);
    assert_eq!(stats.get_stats_summary("ui", "typescript"), "");
}

#[test]
fn get_stats_summary() {
    let dir = TempDir::new().unwrap();
    let stats = tmp_stats(&dir);
    stats.record_outcome("claude-code", "ui", "typescript", true, 500, 0.0).unwrap();
    let summary = stats.get_stats_summary("ui", "typescript");
    assert!(summary.contains("claude-code"));
    assert!(summary.contains("100%"));
}

#[test]
fn persistence_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stats.json");

    let stats1 = AgentStats::load(&path);
    stats1.record_outcome("claude-code", "ui", "typescript", true, 1000, 0.0).unwrap();
    stats1.record_outcome("claude-code", "ui", "typescript", false, 500, 0.0).unwrap();

    let stats2 = AgentStats::load(&path);
    let perf = stats2.get_performance("claude-code", "ui", "typescript").expect("loaded from disk");
    assert_eq!(perf.sample_count, 2);
    assert_eq!(perf.success_rate, 0.5);
}

#[test]
fn clear_removes_stats_and_the_backing_file() {
    let dir = TempDir::new().unwrap();
    let stats = tmp_stats(&dir);
    stats.record_outcome("claude-code", "ui", "typescript", true, 0, 0.0).unwrap();
    assert_eq!(stats.all_stats().len(), 1);

    stats.clear().unwrap();
    assert_eq!(stats.all_stats().len(), 0);
    assert!(!dir.path().join("agent_stats.json").exists());
}

#[test]
fn different_task_types_are_independent() {
    let dir = TempDir::new().unwrap();
    let stats = tmp_stats(&dir);
    stats.record_outcome("claude-code", "ui", "typescript", true, 0, 0.0).unwrap();
    stats.record_outcome("claude-code", "backend", "rust", false, 0, 0.0).unwrap();

    assert_eq!(stats.all_stats().len(), 2);
    assert_eq!(stats.get_performance("claude-code", "ui", "typescript").unwrap().success_rate, 1.0);
    assert_eq!(stats.get_performance("claude-code", "backend", "rust").unwrap().success_rate, 0.0);
}
