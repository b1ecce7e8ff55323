// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn single_writer_never_conflicts() {
    let detector = ConflictDetector::new();
    assert!(detector.record_write("agent-0", "package.json", 1, "add dep").await.is_none());
    assert!(detector.record_write("agent-0", "package.json", 2, "add another dep").await.is_none());
}

#[tokio::test]
async fn second_distinct_writer_produces_conflict_with_all_writers() {
    let detector = ConflictDetector::new();
    assert!(detector.record_write("agent-0", "package.json", 1, "first").await.is_none());
    let conflict = detector.record_write("agent-1", "package.json", 2, "second").await.unwrap();
    assert_eq!(conflict.writers, vec!["agent-0".to_string(), "agent-1".to_string()]);
    assert_eq!(conflict.first_writer, "agent-0");
    assert_eq!(conflict.latest_writer, "agent-1");
}

#[tokio::test]
async fn repeated_writes_by_known_writer_keep_same_writer_set() {
    let detector = ConflictDetector::new();
    detector.record_write("agent-0", "f.rs", 1, "a").await;
    detector.record_write("agent-1", "f.rs", 2, "b").await;
    let conflict = detector.record_write("agent-0", "f.rs", 3, "c").await.unwrap();
    assert_eq!(conflict.writers, vec!["agent-0".to_string(), "agent-1".to_string()]);
    assert_eq!(conflict.latest_writer, "agent-0");
}

#[tokio::test]
async fn soft_lock_acquire_is_reentrant_for_same_agent() {
    let lock = SoftLock::new();
    assert!(lock.acquire("f.rs", "agent-0").await);
    assert!(lock.acquire("f.rs", "agent-0").await);
}

#[tokio::test]
async fn soft_lock_acquire_fails_for_other_agent() {
    let lock = SoftLock::new();
    assert!(lock.acquire("f.rs", "agent-0").await);
    assert!(!lock.acquire("f.rs", "agent-1").await);
}

#[tokio::test]
async fn soft_lock_wait_for_release_returns_true_once_released() {
    let lock = Arc::new(SoftLock::new());
    lock.acquire("f.rs", "agent-0").await;

    let waiter_lock = lock.clone();
    let waiter = tokio::spawn(async move { waiter_lock.wait_for_release("f.rs", Duration::from_secs(2)).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    lock.release("f.rs", "agent-0").await;

    assert!(waiter.await.unwrap());
}

#[tokio::test]
async fn soft_lock_wait_for_release_times_out_when_never_released() {
    let lock = SoftLock::new();
    lock.acquire("f.rs", "agent-0").await;
    assert!(!lock.wait_for_release("f.rs", Duration::from_millis(30)).await);
}

#[tokio::test]
async fn soft_lock_wait_for_release_on_unlocked_path_returns_true_immediately() {
    let lock = SoftLock::new();
    assert!(lock.wait_for_release("never-locked.rs", Duration::from_millis(30)).await);
}

fn sample_conflict() -> Conflict {
    Conflict {
        file_path: "package.json".to_string(),
        writers: vec!["agent-0".to_string(), "agent-1".to_string()],
        first_writer: "agent-0".to_string(),
        latest_writer: "agent-1".to_string(),
    }
}

#[tokio::test]
async fn last_write_wins_names_latest_writer() {
    let conflict = sample_conflict();
    let resolution = Resolver::resolve(&conflict, ConflictStrategy::LastWriteWins, None, None).await;
    assert!(resolution.resolved);
    assert!(resolution.text.contains("agent-1"));
}

#[tokio::test]
async fn first_write_wins_names_first_writer() {
    let conflict = sample_conflict();
    let resolution = Resolver::resolve(&conflict, ConflictStrategy::FirstWriteWins, None, None).await;
    assert!(resolution.resolved);
    assert!(resolution.text.contains("agent-0"));
}

#[tokio::test]
async fn user_decides_leaves_conflict_unresolved() {
    let conflict = sample_conflict();
    let resolution = Resolver::resolve(&conflict, ConflictStrategy::UserDecides, None, None).await;
    assert!(!resolution.resolved);
    assert_eq!(resolution.text, "Awaiting user decision");
}

struct AlwaysFailsOracle;

#[async_trait]
impl MergeOracle for AlwaysFailsOracle {
    async fn merge(&self, _file_path: &str, _a: &str, _b: &str, _before: &str) -> Result<(String, String), String> {
        Err("merge model unavailable".to_string())
    }
}

#[tokio::test]
async fn orchestrator_merges_falls_back_to_last_write_wins_on_oracle_failure() {
    let conflict = sample_conflict();
    let oracle = AlwaysFailsOracle;
    let changes = ConflictChanges { a_changes: "a", b_changes: "b", before: "before" };
    let resolution =
        Resolver::resolve(&conflict, ConflictStrategy::OrchestratorMerges, Some(&oracle), Some(changes)).await;
    assert!(resolution.resolved);
    assert!(resolution.text.contains("fell back to last-write-wins"));
    assert!(resolution.text.contains("agent-1"));
}

struct AlwaysMergesOracle;

#[async_trait]
impl MergeOracle for AlwaysMergesOracle {
    async fn merge(&self, _file_path: &str, _a: &str, _b: &str, _before: &str) -> Result<(String, String), String> {
        Ok(("merged content".to_string(), "combined both edits".to_string()))
    }
}

#[tokio::test]
async fn orchestrator_merges_succeeds_when_oracle_succeeds() {
    let conflict = sample_conflict();
    let oracle = AlwaysMergesOracle;
    let changes = ConflictChanges { a_changes: "a", b_changes: "b", before: "before" };
    let resolution =
        Resolver::resolve(&conflict, ConflictStrategy::OrchestratorMerges, Some(&oracle), Some(changes)).await;
    assert!(resolution.resolved);
    assert!(resolution.text.contains("combined both edits"));
}

#[tokio::test]
async fn orchestrator_merges_without_an_oracle_falls_back() {
    let conflict = sample_conflict();
    let resolution = Resolver::resolve(&conflict, ConflictStrategy::OrchestratorMerges, None, None).await;
    assert!(resolution.resolved);
    assert!(resolution.text.contains("unavailable"));
}
