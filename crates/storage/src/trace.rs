// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Training traces: one record per completed run, written for offline
//! oracle tuning. Never interpreted by this crate, only collected.

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn now_unix_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingTrace {
    pub run_id: String,
    pub user_intent: String,
    pub workspace_summary: String,
    pub subtasks: Vec<serde_json::Value>,
    pub assignments: Vec<serde_json::Value>,
    pub subtask_results: Vec<serde_json::Value>,
    pub duration_ms: u64,
    /// `completed_subtasks / total_subtasks`, used to gate offline tuning.
    pub quality: f64,
    #[serde(default)]
    pub timestamp: f64,
}

impl TrainingTrace {
    pub fn quality_from_statuses(statuses: impl IntoIterator<Item = bool>) -> f64 {
        let statuses: Vec<bool> = statuses.into_iter().collect();
        if statuses.is_empty() {
            return 0.0;
        }
        statuses.iter().filter(|&&completed| completed).count() as f64 / statuses.len() as f64
    }
}

/// Reads/writes [`TrainingTrace`] records at `<traces_dir>/run_<run_id>.json`.
pub struct TraceCollector {
    traces_dir: PathBuf,
}

impl TraceCollector {
    pub fn new(traces_dir: impl Into<PathBuf>) -> Self {
        Self { traces_dir: traces_dir.into() }
    }

    pub fn with_default_dir() -> Result<Self, StorageError> {
        let home = dirs::home_dir().ok_or(StorageError::NoDataDir)?;
        Ok(Self::new(home.join(".eisen").join("traces")))
    }

    fn path_for(&self, run_id: &str) -> PathBuf {
        self.traces_dir.join(format!("run_{run_id}.json"))
    }

    pub fn record_run(&self, mut trace: TrainingTrace) -> Result<(), StorageError> {
        trace.timestamp = now_unix_secs();
        std::fs::create_dir_all(&self.traces_dir)?;
        let path = self.path_for(&trace.run_id);
        let json = serde_json::to_string_pretty(&trace)
            .map_err(|source| StorageError::Decode { path: path.display().to_string(), source })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn list_all(&self) -> Result<Vec<TrainingTrace>, StorageError> {
        let mut traces = Vec::new();
        if !self.traces_dir.exists() {
            return Ok(traces);
        }
        for entry in std::fs::read_dir(&self.traces_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match load_trace(&path) {
                Ok(trace) => traces.push(trace),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable trace"),
            }
        }
        traces.sort_by(|a, b| a.timestamp.partial_cmp(&b.timestamp).unwrap_or(std::cmp::Ordering::Equal));
        Ok(traces)
    }
}

fn load_trace(path: &Path) -> Result<TrainingTrace, StorageError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|source| StorageError::Decode { path: path.display().to_string(), source })
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
