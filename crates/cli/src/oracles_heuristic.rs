// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A deterministic stand-in for the LLM-backed oracle set. The real
//! decompose/assign/prompt-build/evaluate predicates are an opaque
//! external dependency outside this workspace; this gives the binary
//! something to run end to end until a live model backend is wired in
//! behind the same four traits.

use async_trait::async_trait;
use crew_core::registry::{available_agents, AGENTS};
use crew_core::{Subtask, SubtaskResultStatus};
use crew_orchestrator::{
    AssignOracle, AssignRequest, DecomposeOracle, DecomposeRequest, DecomposeResponse, EvaluateOracle,
    EvaluateRequest, EvaluateResponse, PromptBuildOracle, PromptBuildRequest,
};

pub struct HeuristicOracles;

#[async_trait]
impl DecomposeOracle for HeuristicOracles {
    async fn decompose(&self, request: DecomposeRequest) -> Result<DecomposeResponse, String> {
        let regions: Vec<String> = serde_json::from_str(&request.workspace_tree).unwrap_or_default();
        let subtasks = if regions.is_empty() {
            vec![Subtask::new(request.user_intent.clone(), "/")]
        } else {
            regions.into_iter().map(|region| Subtask::new(request.user_intent.clone(), format!("/{region}"))).collect()
        };
        Ok(DecomposeResponse { subtasks, reasoning: "one subtask per top-level workspace directory".to_string() })
    }
}

#[async_trait]
impl AssignOracle for HeuristicOracles {
    async fn assign(&self, _request: AssignRequest) -> Result<String, String> {
        available_agents()
            .into_iter()
            .next()
            .or_else(|| AGENTS.first())
            .map(|agent| agent.id.to_string())
            .ok_or_else(|| "no agents registered".to_string())
    }
}

#[async_trait]
impl PromptBuildOracle for HeuristicOracles {
    async fn build_prompt(&self, request: PromptBuildRequest) -> Result<String, String> {
        let mut prompt = format!("{}\n\nRegion: {}\n", request.subtask_description, request.region);
        if !request.region_files.is_empty() {
            prompt.push_str(&format!("Existing files:\n{}\n", request.region_files.join("\n")));
        }
        if !request.cross_region_deps.is_empty() {
            prompt.push_str(&format!("Cross-region dependencies: {}\n", request.cross_region_deps.join(", ")));
        }
        Ok(prompt)
    }
}

#[async_trait]
impl EvaluateOracle for HeuristicOracles {
    async fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluateResponse, String> {
        let status =
            if request.agent_output.trim().is_empty() { SubtaskResultStatus::Failed } else { SubtaskResultStatus::Completed };
        let failure_reason = matches!(status, SubtaskResultStatus::Failed).then(|| "agent produced no output".to_string());
        Ok(EvaluateResponse { status, failure_reason, suggested_retry: None })
    }
}

#[cfg(test)]
#[path = "oracles_heuristic_tests.rs"]
mod tests;
