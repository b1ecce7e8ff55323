// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-conflict detection, per-path cooperative soft locking, and the
//! four conflict-resolution strategies.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

#[derive(Debug, Clone)]
pub struct WriteRecord {
    pub agent_id: String,
    pub timestamp_ms: i64,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct Conflict {
    pub file_path: String,
    pub writers: Vec<String>,
    pub first_writer: String,
    pub latest_writer: String,
}

/// Tracks every write to every file under an async mutex. Produces a
/// [`Conflict`] the moment a second distinct agent writes the same path.
#[derive(Default)]
pub struct ConflictDetector {
    writes: Mutex<HashMap<String, Vec<WriteRecord>>>,
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_write(
        &self,
        agent_id: &str,
        path: &str,
        timestamp_ms: i64,
        description: &str,
    ) -> Option<Conflict> {
        let mut writes = self.writes.lock().await;
        let history = writes.entry(path.to_string()).or_default();
        let had_other_writer = history.iter().any(|w| w.agent_id != agent_id);
        history.push(WriteRecord { agent_id: agent_id.to_string(), timestamp_ms, description: description.to_string() });

        if !had_other_writer {
            return None;
        }

        let mut writers = Vec::new();
        for record in history.iter() {
            if !writers.contains(&record.agent_id) {
                writers.push(record.agent_id.clone());
            }
        }
        Some(Conflict {
            file_path: path.to_string(),
            first_writer: history.first().expect("just pushed").agent_id.clone(),
            latest_writer: history.last().expect("just pushed").agent_id.clone(),
            writers,
        })
    }
}

struct LockState {
    holder: String,
    notify: Arc<Notify>,
}

/// Per-path cooperative exclusion with reentrancy for the holding agent.
#[derive(Default)]
pub struct SoftLock {
    locks: Mutex<HashMap<String, LockState>>,
}

impl SoftLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `agent_id` now holds (or already held) the lock on `path`.
    pub async fn acquire(&self, path: &str, agent_id: &str) -> bool {
        let mut locks = self.locks.lock().await;
        match locks.get(path) {
            Some(state) if state.holder != agent_id => false,
            Some(_) => true,
            None => {
                locks.insert(path.to_string(), LockState { holder: agent_id.to_string(), notify: Arc::new(Notify::new()) });
                true
            }
        }
    }

    pub async fn release(&self, path: &str, agent_id: &str) {
        let mut locks = self.locks.lock().await;
        if locks.get(path).is_some_and(|state| state.holder == agent_id) {
            if let Some(state) = locks.remove(path) {
                state.notify.notify_waiters();
            }
        }
    }

    /// Suspends until `path` is released, or `timeout` elapses first.
    pub async fn wait_for_release(&self, path: &str, timeout: Duration) -> bool {
        let notify = {
            let locks = self.locks.lock().await;
            match locks.get(path) {
                None => return true,
                Some(state) => state.notify.clone(),
            }
        };
        tokio::time::timeout(timeout, notify.notified()).await.is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictStrategy {
    LastWriteWins,
    FirstWriteWins,
    OrchestratorMerges,
    UserDecides,
}

pub struct Resolution {
    pub resolved: bool,
    pub text: String,
}

/// The external merge oracle: `(file_path, a_changes, b_changes, before) -> (merged_content, notes)`.
#[async_trait]
pub trait MergeOracle: Send + Sync {
    async fn merge(&self, file_path: &str, a_changes: &str, b_changes: &str, before: &str) -> Result<(String, String), String>;
}

/// Changes from the two sides of a conflict, passed to the merge oracle.
pub struct ConflictChanges<'a> {
    pub a_changes: &'a str,
    pub b_changes: &'a str,
    pub before: &'a str,
}

pub struct Resolver;

impl Resolver {
    pub async fn resolve(
        conflict: &Conflict,
        strategy: ConflictStrategy,
        merge_oracle: Option<&dyn MergeOracle>,
        changes: Option<ConflictChanges<'_>>,
    ) -> Resolution {
        match strategy {
            ConflictStrategy::LastWriteWins => Resolution {
                resolved: true,
                text: format!("Resolved via last-write-wins: kept changes from {}", conflict.latest_writer),
            },
            ConflictStrategy::FirstWriteWins => Resolution {
                resolved: true,
                text: format!("Resolved via first-write-wins: kept changes from {}", conflict.first_writer),
            },
            ConflictStrategy::OrchestratorMerges => Self::resolve_via_merge(conflict, merge_oracle, changes).await,
            ConflictStrategy::UserDecides => {
                Resolution { resolved: false, text: "Awaiting user decision".to_string() }
            }
        }
    }

    async fn resolve_via_merge(
        conflict: &Conflict,
        merge_oracle: Option<&dyn MergeOracle>,
        changes: Option<ConflictChanges<'_>>,
    ) -> Resolution {
        let (Some(oracle), Some(changes)) = (merge_oracle, changes) else {
            return Resolution {
                resolved: true,
                text: format!(
                    "Merge oracle unavailable, fell back to last-write-wins: kept changes from {}",
                    conflict.latest_writer
                ),
            };
        };

        match oracle.merge(&conflict.file_path, changes.a_changes, changes.b_changes, changes.before).await {
            Ok((_merged, notes)) => Resolution { resolved: true, text: format!("Merged by orchestrator: {notes}") },
            Err(reason) => Resolution {
                resolved: true,
                text: format!(
                    "Merge oracle failed ({reason}), fell back to last-write-wins: kept changes from {}",
                    conflict.latest_writer
                ),
            },
        }
    }
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
