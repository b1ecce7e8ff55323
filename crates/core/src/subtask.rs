// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Subtask/AgentAssignment/SubtaskResult data model.

use crate::lifecycle::SubtaskLifecycle;
use serde::{Deserialize, Serialize};

/// One region-scoped unit of work produced by the decompose oracle.
///
/// `depends_on` entries that are out of range for the sibling subtask
/// vector are silently dropped by [`Subtask::sanitize_depends_on`] —
/// the oracle is untrusted input, not a programming invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub description: String,
    pub region: String,
    #[serde(default)]
    pub expected_files: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<usize>,
}

impl Subtask {
    pub fn new(description: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            region: region.into(),
            expected_files: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    /// Drop any `depends_on` entry that isn't a valid index into `total`.
    pub fn sanitize_depends_on(&mut self, total: usize) {
        self.depends_on.retain(|&d| d < total);
    }
}

/// Couples a [`Subtask`] with its chosen agent and owned lifecycle.
pub struct AgentAssignment {
    pub subtask: Subtask,
    pub subtask_index: usize,
    pub agent_id: String,
    pub lifecycle: SubtaskLifecycle,
}

impl AgentAssignment {
    pub fn new(subtask: Subtask, subtask_index: usize, agent_id: impl Into<String>) -> Self {
        let agent_id = agent_id.into();
        let description = subtask.description.clone();
        Self {
            subtask,
            subtask_index,
            agent_id,
            lifecycle: SubtaskLifecycle::new(subtask_index, description),
        }
    }

    /// The `"<agent_id>-<index>"` identifier used to key sessions and the
    /// active-sessions map.
    pub fn instance_id(&self) -> String {
        format!("{}-{}", self.agent_id, self.subtask_index)
    }
}

/// Outcome of one subtask's execution, produced by the evaluate oracle
/// or synthesised on a worker fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskResult {
    pub index: usize,
    pub description: String,
    pub region: String,
    pub agent_id: String,
    pub status: SubtaskResultStatus,
    pub agent_output: String,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub suggested_retry: Option<String>,
    #[serde(default)]
    pub cost_tokens: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskResultStatus {
    Completed,
    Failed,
    Partial,
}

crate::simple_display! {
    SubtaskResultStatus {
        Completed => "completed",
        Failed => "failed",
        Partial => "partial",
    }
}

impl SubtaskResult {
    /// Build the synthetic failure result a batch boundary produces when
    /// a worker raises an unexpected fault (scheduler §4.1 step 3).
    pub fn synthetic_failure(assignment: &AgentAssignment, failure_reason: impl Into<String>) -> Self {
        Self {
            index: assignment.subtask_index,
            description: assignment.subtask.description.clone(),
            region: assignment.subtask.region.clone(),
            agent_id: assignment.agent_id.clone(),
            status: SubtaskResultStatus::Failed,
            agent_output: String::new(),
            failure_reason: Some(failure_reason.into()),
            suggested_retry: None,
            cost_tokens: 0,
        }
    }
}

#[cfg(test)]
#[path = "subtask_tests.rs"]
mod tests;
