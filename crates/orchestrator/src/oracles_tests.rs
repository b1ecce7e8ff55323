// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crew_core::Subtask;

struct FakeDecompose;

#[async_trait]
impl DecomposeOracle for FakeDecompose {
    async fn decompose(&self, request: DecomposeRequest) -> Result<DecomposeResponse, String> {
        Ok(DecomposeResponse {
            subtasks: vec![Subtask {
                description: format!("implement: {}", request.user_intent),
                region: "/core".to_string(),
                expected_files: vec!["/core/lib.rs".to_string()],
                depends_on: vec![],
            }],
            reasoning: "single region touched".to_string(),
        })
    }
}

struct FailingAssign;

#[async_trait]
impl AssignOracle for FailingAssign {
    async fn assign(&self, _request: AssignRequest) -> Result<String, String> {
        Err("no model configured".to_string())
    }
}

struct FakePromptBuild;

#[async_trait]
impl PromptBuildOracle for FakePromptBuild {
    async fn build_prompt(&self, request: PromptBuildRequest) -> Result<String, String> {
        Ok(format!(
            "{} (region={}, files={}, effort={})",
            request.subtask_description,
            request.region,
            request.region_files.len(),
            request.effort_level
        ))
    }
}

struct FakeEvaluate {
    status: SubtaskResultStatus,
}

#[async_trait]
impl EvaluateOracle for FakeEvaluate {
    async fn evaluate(&self, _request: EvaluateRequest) -> Result<EvaluateResponse, String> {
        Ok(EvaluateResponse {
            status: self.status,
            failure_reason: None,
            suggested_retry: None,
        })
    }
}

fn fake_oracles(evaluate_status: SubtaskResultStatus) -> Oracles {
    Oracles {
        decompose: Box::new(FakeDecompose),
        assign: Box::new(FailingAssign),
        prompt_build: Box::new(FakePromptBuild),
        evaluate: Box::new(FakeEvaluate { status: evaluate_status }),
    }
}

#[tokio::test]
async fn decompose_oracle_returns_subtasks() {
    let oracles = fake_oracles(SubtaskResultStatus::Completed);
    let response = oracles
        .decompose
        .decompose(DecomposeRequest {
            user_intent: "add auth".to_string(),
            workspace_tree: "".to_string(),
            symbol_index: "".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(response.subtasks.len(), 1);
    assert_eq!(response.subtasks[0].description, "implement: add auth");
}

#[tokio::test]
async fn assign_oracle_failure_propagates_as_err() {
    let oracles = fake_oracles(SubtaskResultStatus::Completed);
    let err = oracles
        .assign
        .assign(AssignRequest {
            subtask_description: "x".to_string(),
            subtask_region: "/core".to_string(),
            primary_language: "rust".to_string(),
            available_agents: "[]".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err, "no model configured");
}

#[tokio::test]
async fn prompt_build_oracle_renders_region_context() {
    let oracles = fake_oracles(SubtaskResultStatus::Completed);
    let prompt = oracles
        .prompt_build
        .build_prompt(PromptBuildRequest {
            subtask_description: "fix bug".to_string(),
            region: "/core".to_string(),
            region_files: vec!["/core/lib.rs".to_string()],
            cross_region_deps: vec![],
            effort_level: EffortLevel::High,
        })
        .await
        .unwrap();
    assert_eq!(prompt, "fix bug (region=/core, files=1, effort=high)");
}

#[tokio::test]
async fn evaluate_oracle_reports_the_configured_status() {
    let oracles = fake_oracles(SubtaskResultStatus::Partial);
    let response = oracles
        .evaluate
        .evaluate(EvaluateRequest {
            subtask_description: "x".to_string(),
            agent_output: "did something".to_string(),
            expected_files: vec![],
        })
        .await
        .unwrap();
    assert_eq!(response.status, SubtaskResultStatus::Partial);
    assert!(response.failure_reason.is_none());
}
