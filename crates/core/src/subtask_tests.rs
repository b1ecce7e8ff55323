// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn sanitize_depends_on_drops_out_of_range_indices() {
    let mut subtask = Subtask::new("add tests", "/core");
    subtask.depends_on = vec![0, 2, 5];
    subtask.sanitize_depends_on(3);
    assert_eq!(subtask.depends_on, vec![0, 2]);
}

#[test]
fn instance_id_combines_agent_and_index() {
    let assignment = AgentAssignment::new(Subtask::new("x", "/ui"), 4, "claude-code");
    assert_eq!(assignment.instance_id(), "claude-code-4");
}

#[test]
fn synthetic_failure_carries_reason_and_zero_cost() {
    let assignment = AgentAssignment::new(Subtask::new("x", "/ui"), 0, "codex");
    let result = SubtaskResult::synthetic_failure(&assignment, "panicked: index out of bounds");
    assert_eq!(result.status, SubtaskResultStatus::Failed);
    assert_eq!(result.failure_reason.as_deref(), Some("panicked: index out of bounds"));
    assert_eq!(result.cost_tokens, 0);
}

#[test]
fn subtask_round_trips_through_json() {
    let mut subtask = Subtask::new("wire routes", "/server");
    subtask.expected_files = vec!["/server/routes.rs".into()];
    subtask.depends_on = vec![0];
    let json = serde_json::to_string(&subtask).unwrap();
    let back: Subtask = serde_json::from_str(&json).unwrap();
    assert_eq!(back.description, subtask.description);
    assert_eq!(back.depends_on, subtask.depends_on);
}
