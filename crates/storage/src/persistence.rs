// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run persistence: `RunState` snapshots that back `--resume`/`--resume-id`
//! and the orchestrator's own resume-after-interruption path.

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn now_unix_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedSubtask {
    pub index: usize,
    pub description: String,
    pub region: String,
    #[serde(default)]
    pub expected_files: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<usize>,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub agent_output: String,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub suggested_retry: Option<String>,
    #[serde(default)]
    pub cost_tokens: u64,
}

fn default_status() -> String {
    "pending".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub user_intent: String,
    pub workspace: String,
    #[serde(default = "default_effort")]
    pub effort: String,
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default)]
    pub subtasks: Vec<SavedSubtask>,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub orchestrator_tokens: u64,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub created_at: f64,
}

fn default_effort() -> String {
    "medium".to_string()
}
fn default_max_agents() -> usize {
    5
}
fn default_state() -> String {
    "idle".to_string()
}

impl RunState {
    pub fn new(run_id: impl Into<String>, user_intent: impl Into<String>, workspace: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            user_intent: user_intent.into(),
            workspace: workspace.into(),
            effort: default_effort(),
            auto_approve: false,
            max_agents: default_max_agents(),
            state: default_state(),
            subtasks: Vec::new(),
            total_tokens: 0,
            orchestrator_tokens: 0,
            timestamp: 0.0,
            created_at: 0.0,
        }
    }

    pub fn completed_count(&self) -> usize {
        self.subtasks.iter().filter(|s| s.status == "completed").count()
    }

    pub fn failed_count(&self) -> usize {
        self.subtasks.iter().filter(|s| s.status == "failed" || s.status == "partial").count()
    }

    pub fn pending_count(&self) -> usize {
        self.subtasks.iter().filter(|s| s.status == "pending" || s.status == "running").count()
    }

    pub fn is_resumable(&self) -> bool {
        self.pending_count() > 0 || self.failed_count() > 0
    }

    pub fn progress_summary(&self) -> String {
        format!(
            "{}/{} completed, {} failed, {} pending",
            self.completed_count(),
            self.subtasks.len(),
            self.failed_count(),
            self.pending_count()
        )
    }
}

/// Reads/writes `RunState` records at `<runs_dir>/run_<run_id>.json`.
pub struct RunPersistence {
    runs_dir: PathBuf,
}

impl RunPersistence {
    pub fn new(runs_dir: impl Into<PathBuf>) -> Self {
        Self { runs_dir: runs_dir.into() }
    }

    /// `~/.eisen/runs`.
    pub fn with_default_dir() -> Result<Self, StorageError> {
        let home = dirs::home_dir().ok_or(StorageError::NoDataDir)?;
        Ok(Self::new(home.join(".eisen").join("runs")))
    }

    fn path_for(&self, run_id: &str) -> PathBuf {
        self.runs_dir.join(format!("run_{run_id}.json"))
    }

    /// Stamps `timestamp` on every save, and `created_at` only on the first.
    pub fn save(&self, state: &mut RunState) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.runs_dir)?;
        let now = now_unix_secs();
        if state.created_at == 0.0 {
            state.created_at = now;
        }
        state.timestamp = now;

        let path = self.path_for(&state.run_id);
        let json = serde_json::to_string_pretty(state)
            .map_err(|source| StorageError::Decode { path: path.display().to_string(), source })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(&self, run_id: &str) -> Result<RunState, StorageError> {
        let path = self.path_for(run_id);
        load_json(&path)
    }

    pub fn list_resumable(&self) -> Result<Vec<RunState>, StorageError> {
        let mut runs = self.list_all()?;
        runs.retain(RunState::is_resumable);
        Ok(runs)
    }

    /// Most-recent-first by `timestamp`.
    pub fn list_all(&self) -> Result<Vec<RunState>, StorageError> {
        let mut runs = Vec::new();
        if !self.runs_dir.exists() {
            return Ok(runs);
        }
        for entry in std::fs::read_dir(&self.runs_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match load_json::<RunState>(&path) {
                Ok(state) => runs.push(state),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable run state"),
            }
        }
        runs.sort_by(|a, b| b.timestamp.partial_cmp(&a.timestamp).unwrap_or(std::cmp::Ordering::Equal));
        Ok(runs)
    }

    pub fn delete(&self, run_id: &str) -> Result<(), StorageError> {
        let path = self.path_for(run_id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        if self.runs_dir.exists() {
            std::fs::remove_dir_all(&self.runs_dir)?;
        }
        Ok(())
    }
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StorageError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.display().to_string())
        } else {
            StorageError::Io(e)
        }
    })?;
    serde_json::from_str(&contents).map_err(|source| StorageError::Decode { path: path.display().to_string(), source })
}

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;
