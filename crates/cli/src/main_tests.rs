// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::cli_args::EffortArg;

fn bare_cli(intent: &str) -> Cli {
    Cli {
        intent: Some(intent.to_string()),
        workspace: None,
        effort: EffortArg::Medium,
        auto_approve: false,
        model: None,
        mode: ModeArg::Interactive,
        verbose: false,
        compile: false,
        resume: false,
        resume_id: None,
        stats: false,
        sessions: false,
    }
}

#[test]
fn build_config_defaults_to_medium_effort_and_no_model() {
    let cli = bare_cli("add a login page");
    let config = build_config(&cli, std::path::Path::new("/tmp/workspace")).unwrap();
    assert_eq!(config.effort, crew_orchestrator::EffortLevel::Medium);
    assert!(config.model.is_none());
}

#[test]
#[serial_test::serial]
fn build_config_rejects_a_model_with_no_credential() {
    let mut cli = bare_cli("add a login page");
    cli.model = Some("anthropic/claude-sonnet-4".to_string());
    std::env::remove_var("ANTHROPIC_API_KEY");
    let result = build_config(&cli, std::path::Path::new("/tmp/workspace"));
    assert!(result.is_err());
}

#[test]
fn run_succeeded_is_true_only_for_completed() {
    let completed = OrchestratorResult {
        status: crew_core::TaskState::Completed,
        subtask_results: Vec::new(),
        total_cost_tokens: 0,
        orchestrator_cost_tokens: 0,
    };
    let done_with_failures = OrchestratorResult { status: crew_core::TaskState::Done, ..completed.clone() };
    assert!(run_succeeded(&completed));
    assert!(!run_succeeded(&done_with_failures));
}
