// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The five LLM-backed predicates the orchestrator calls out to: decompose,
//! assign, prompt-build, and evaluate (the fifth, merge, lives on
//! [`crew_engine::conflict::MergeOracle`] since only the conflict resolver
//! calls it). Each is a narrow trait so a live model call, a recorded
//! replay, or a deterministic test stub can stand in interchangeably.

use crate::config::EffortLevel;
use async_trait::async_trait;
use crew_core::Subtask;
use crew_core::SubtaskResultStatus;

#[derive(Debug, Clone)]
pub struct DecomposeRequest {
    pub user_intent: String,
    pub workspace_tree: String,
    pub symbol_index: String,
}

#[derive(Debug, Clone)]
pub struct DecomposeResponse {
    pub subtasks: Vec<Subtask>,
    pub reasoning: String,
}

#[async_trait]
pub trait DecomposeOracle: Send + Sync {
    async fn decompose(&self, request: DecomposeRequest) -> Result<DecomposeResponse, String>;
}

#[derive(Debug, Clone)]
pub struct AssignRequest {
    pub subtask_description: String,
    pub subtask_region: String,
    pub primary_language: String,
    /// JSON array of `{id, name}` candidates, with a human-readable stats
    /// summary and recommendation appended when historical data exists.
    pub available_agents: String,
}

#[async_trait]
pub trait AssignOracle: Send + Sync {
    async fn assign(&self, request: AssignRequest) -> Result<String, String>;
}

#[derive(Debug, Clone)]
pub struct PromptBuildRequest {
    pub subtask_description: String,
    pub region: String,
    pub region_files: Vec<String>,
    pub cross_region_deps: Vec<String>,
    pub effort_level: EffortLevel,
}

#[async_trait]
pub trait PromptBuildOracle: Send + Sync {
    async fn build_prompt(&self, request: PromptBuildRequest) -> Result<String, String>;
}

#[derive(Debug, Clone)]
pub struct EvaluateRequest {
    pub subtask_description: String,
    /// Agent output, already trimmed to the oracle's input budget.
    pub agent_output: String,
    pub expected_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EvaluateResponse {
    pub status: SubtaskResultStatus,
    pub failure_reason: Option<String>,
    pub suggested_retry: Option<String>,
}

#[async_trait]
pub trait EvaluateOracle: Send + Sync {
    async fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluateResponse, String>;
}

/// The orchestrator's full set of oracle dependencies, threaded through
/// construction rather than resolved from a process-wide global.
pub struct Oracles {
    pub decompose: Box<dyn DecomposeOracle>,
    pub assign: Box<dyn AssignOracle>,
    pub prompt_build: Box<dyn PromptBuildOracle>,
    pub evaluate: Box<dyn EvaluateOracle>,
}

#[cfg(test)]
#[path = "oracles_tests.rs"]
mod tests;
