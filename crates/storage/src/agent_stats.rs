// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent performance statistics, learned across runs, used to inform
//! agent selection for similar future tasks.

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Minimum number of samples before a stat is considered reliable.
pub const MIN_SAMPLES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub agent_type: String,
    pub task_type: String,
    pub language: String,
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub avg_tokens: u64,
    #[serde(default)]
    pub avg_duration_s: f64,
    #[serde(default)]
    pub sample_count: u32,
    #[serde(rename = "_total_successes", default)]
    total_successes: u32,
    #[serde(rename = "_total_tokens", default)]
    total_tokens: u64,
    #[serde(rename = "_total_duration_s", default)]
    total_duration_s: f64,
}

impl AgentPerformance {
    fn new(agent_type: impl Into<String>, task_type: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            task_type: task_type.into(),
            language: language.into(),
            success_rate: 0.0,
            avg_tokens: 0,
            avg_duration_s: 0.0,
            sample_count: 0,
            total_successes: 0,
            total_tokens: 0,
            total_duration_s: 0.0,
        }
    }

    fn record(&mut self, success: bool, tokens: u64, duration_s: f64) {
        self.sample_count += 1;
        self.total_tokens += tokens;
        self.total_duration_s += duration_s;
        if success {
            self.total_successes += 1;
        }
        self.success_rate = self.total_successes as f64 / self.sample_count as f64;
        self.avg_tokens = self.total_tokens / self.sample_count as u64;
        self.avg_duration_s = self.total_duration_s / self.sample_count as f64;
    }
}

fn make_key(agent_type: &str, task_type: &str, language: &str) -> String {
    format!("{agent_type}|{task_type}|{language}")
}

/// Learns agent performance characteristics from historical runs,
/// persisted to a single `agent_stats.json`.
pub struct AgentStats {
    path: PathBuf,
    data: Mutex<HashMap<String, AgentPerformance>>,
}

impl AgentStats {
    pub fn load(stats_path: impl Into<PathBuf>) -> Self {
        let path = stats_path.into();
        let data = Self::read_from_disk(&path).unwrap_or_default();
        Self { path, data: Mutex::new(data) }
    }

    pub fn with_default_path() -> Result<Self, StorageError> {
        let home = dirs::home_dir().ok_or(StorageError::NoDataDir)?;
        Ok(Self::load(home.join(".eisen").join("agent_stats.json")))
    }

    fn read_from_disk(path: &std::path::Path) -> Option<HashMap<String, AgentPerformance>> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load agent stats");
                None
            }
        }
    }

    fn save(&self, data: &HashMap<String, AgentPerformance>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)
            .map_err(|source| StorageError::Decode { path: self.path.display().to_string(), source })?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn record_outcome(&self, agent_type: &str, task_type: &str, language: &str, success: bool, tokens: u64, duration_s: f64) -> Result<(), StorageError> {
        let key = make_key(agent_type, task_type, language);
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        let perf = data.entry(key).or_insert_with(|| AgentPerformance::new(agent_type, task_type, language));
        perf.record(success, tokens, duration_s);
        tracing::debug!(agent_type, task_type, language, success, rate = perf.success_rate, samples = perf.sample_count, "recorded agent outcome");
        self.save(&data)
    }

    /// Highest-success-rate agent for this task/language combo, or
    /// `None` if no combo has accumulated `MIN_SAMPLES` observations.
    pub fn best_agent_for(&self, task_type: &str, language: &str) -> Option<String> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        let mut best: Option<(&str, f64)> = None;
        for perf in data.values() {
            if perf.task_type != task_type || perf.language != language {
                continue;
            }
            if perf.sample_count < MIN_SAMPLES {
                continue;
            }
            let is_better = match best {
                Some((_, rate)) => perf.success_rate > rate,
                None => true,
            };
            if is_better {
                best = Some((perf.agent_type.as_str(), perf.success_rate));
            }
        }
        best.map(|(agent, _)| agent.to_string())
    }

    pub fn get_performance(&self, agent_type: &str, task_type: &str, language: &str) -> Option<AgentPerformance> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.get(&make_key(agent_type, task_type, language)).cloned()
    }

    /// Human-readable summary for injection into an agent-selection prompt.
    pub fn get_stats_summary(&self, task_type: &str, language: &str) -> String {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        let mut lines: Vec<String> = data
            .values()
            .filter(|p| p.task_type == task_type && p.language == language && p.sample_count >= 1)
            .map(|p| format!("{}: {:.0}% success ({} runs, avg {} tokens)", p.agent_type, p.success_rate * 100.0, p.sample_count, p.avg_tokens))
            .collect();
        if lines.is_empty() {
            return String::new();
        }
        lines.sort();
        format!("Historical agent performance:\n{}", lines.join("\n"))
    }

    pub fn all_stats(&self) -> Vec<AgentPerformance> {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).values().cloned().collect()
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "agent_stats_tests.rs"]
mod tests;
