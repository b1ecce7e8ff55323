// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crew_core::{AgentAssignment, Subtask, SubtaskLifecycle, SubtaskResult, SubtaskResultStatus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn assignment(index: usize, region: &str, depends_on: Vec<usize>) -> AgentAssignment {
    let mut subtask = Subtask::new(format!("do thing {index}"), region);
    subtask.depends_on = depends_on;
    AgentAssignment {
        subtask,
        subtask_index: index,
        agent_id: "claude-code".to_string(),
        lifecycle: SubtaskLifecycle::new(index, format!("do thing {index}")),
    }
}

#[test]
fn linear_chain_batches_one_per_level() {
    let assignments =
        vec![assignment(0, "/a", vec![]), assignment(1, "/b", vec![0]), assignment(2, "/c", vec![1])];
    assert_eq!(compute_batches(&assignments), vec![vec![0], vec![1], vec![2]]);
}

#[test]
fn diamond_batches_overlap_middle_level() {
    let assignments = vec![
        assignment(0, "/a", vec![]),
        assignment(1, "/b", vec![0]),
        assignment(2, "/c", vec![0]),
        assignment(3, "/d", vec![1, 2]),
    ];
    assert_eq!(compute_batches(&assignments), vec![vec![0], vec![1, 2], vec![3]]);
}

#[test]
fn cycle_breaks_to_batch_zero_without_hanging() {
    let assignments = vec![assignment(0, "/a", vec![1]), assignment(1, "/b", vec![0])];
    assert_eq!(compute_batches(&assignments), vec![vec![0, 1]]);
}

#[tokio::test]
async fn run_respects_concurrency_bound_within_a_batch() {
    let assignments: Vec<_> = (0..8).map(|i| assignment(i, "/r", vec![])).collect();
    let scheduler = Scheduler::new(3);
    let active = Arc::new(AtomicUsize::new(0));
    let max_observed = Arc::new(AtomicUsize::new(0));

    let active_for_worker = active.clone();
    let max_for_worker = max_observed.clone();
    let results = scheduler
        .run(&assignments, move |index| {
            let active = active_for_worker.clone();
            let max_observed = max_for_worker.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_observed.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                SubtaskResult {
                    index,
                    description: String::new(),
                    region: String::new(),
                    agent_id: "claude-code".to_string(),
                    status: SubtaskResultStatus::Completed,
                    agent_output: String::new(),
                    failure_reason: None,
                    suggested_retry: None,
                    cost_tokens: 0,
                }
            }
        })
        .await;

    assert_eq!(results.len(), 8);
    assert!(max_observed.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn run_synthesizes_failed_result_when_worker_panics() {
    let assignments = vec![assignment(0, "/a", vec![])];
    let scheduler = Scheduler::new(5);
    let results = scheduler
        .run(&assignments, |index| async move {
            if index == 0 {
                panic!("boom");
            }
            unreachable!()
        })
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, SubtaskResultStatus::Failed);
    assert!(results[0].failure_reason.as_deref().unwrap_or("").contains("boom"));
}
