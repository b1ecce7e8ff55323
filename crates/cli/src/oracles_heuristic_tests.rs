// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crew_orchestrator::config::EffortLevel;

#[tokio::test]
async fn decompose_splits_one_subtask_per_top_level_region() {
    let request = DecomposeRequest {
        user_intent: "add auth".to_string(),
        workspace_tree: r#"["api","web"]"#.to_string(),
        symbol_index: "{}".to_string(),
    };
    let response = HeuristicOracles.decompose(request).await.unwrap();
    assert_eq!(response.subtasks.len(), 2);
    assert_eq!(response.subtasks[0].region, "/api");
    assert_eq!(response.subtasks[1].region, "/web");
}

#[tokio::test]
async fn decompose_falls_back_to_a_single_root_region_when_the_tree_is_empty() {
    let request =
        DecomposeRequest { user_intent: "add auth".to_string(), workspace_tree: "[]".to_string(), symbol_index: "{}".to_string() };
    let response = HeuristicOracles.decompose(request).await.unwrap();
    assert_eq!(response.subtasks.len(), 1);
    assert_eq!(response.subtasks[0].region, "/");
}

#[tokio::test]
async fn assign_falls_back_to_the_first_known_agent_when_none_are_available() {
    let request = AssignRequest {
        subtask_description: "add auth".to_string(),
        subtask_region: "/api".to_string(),
        primary_language: "rust".to_string(),
        available_agents: "[]".to_string(),
    };
    let agent_id = HeuristicOracles.assign(request).await.unwrap();
    assert!(!agent_id.is_empty());
}

#[tokio::test]
async fn build_prompt_includes_region_and_cross_region_deps() {
    let request = PromptBuildRequest {
        subtask_description: "add auth".to_string(),
        region: "/api".to_string(),
        region_files: vec!["api/mod.rs".to_string()],
        cross_region_deps: vec!["web".to_string()],
        effort_level: EffortLevel::Medium,
    };
    let prompt = HeuristicOracles.build_prompt(request).await.unwrap();
    assert!(prompt.contains("/api"));
    assert!(prompt.contains("api/mod.rs"));
    assert!(prompt.contains("web"));
}

#[tokio::test]
async fn evaluate_treats_empty_output_as_a_failure() {
    let request = EvaluateRequest {
        subtask_description: "add auth".to_string(),
        agent_output: "   ".to_string(),
        expected_files: Vec::new(),
    };
    let response = HeuristicOracles.evaluate(request).await.unwrap();
    assert_eq!(response.status, SubtaskResultStatus::Failed);
    assert!(response.failure_reason.is_some());
}

#[tokio::test]
async fn evaluate_treats_nonempty_output_as_completed() {
    let request = EvaluateRequest {
        subtask_description: "add auth".to_string(),
        agent_output: "diff applied".to_string(),
        expected_files: Vec::new(),
    };
    let response = HeuristicOracles.evaluate(request).await.unwrap();
    assert_eq!(response.status, SubtaskResultStatus::Completed);
    assert!(response.failure_reason.is_none());
}
