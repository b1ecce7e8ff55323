// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-batched scheduler: groups assignments into levels by
//! `depends_on`, then runs each level to completion before the next.

use crew_core::{AgentAssignment, SubtaskResult};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub const DEFAULT_MAX_AGENTS: usize = 5;

/// Batch level of assignment `i` is `0` if it has no in-range dependencies,
/// otherwise `1 + max(level(d) for d in deps)`. Assignments whose dependency
/// graph never resolves (a cycle) are placed in batch `0` with a warning.
pub fn compute_batches(assignments: &[AgentAssignment]) -> Vec<Vec<usize>> {
    let n = assignments.len();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut remaining_deps = vec![0usize; n];

    for (i, a) in assignments.iter().enumerate() {
        remaining_deps[i] = a.subtask.depends_on.len();
        for &d in &a.subtask.depends_on {
            dependents[d].push(i);
        }
    }

    let mut level = vec![0usize; n];
    let mut resolved = vec![false; n];
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| remaining_deps[i] == 0).collect();

    while let Some(u) = queue.pop_front() {
        resolved[u] = true;
        for &v in &dependents[u] {
            if resolved[v] {
                continue;
            }
            level[v] = level[v].max(level[u] + 1);
            remaining_deps[v] -= 1;
            if remaining_deps[v] == 0 {
                queue.push_back(v);
            }
        }
    }

    for (i, done) in resolved.iter().enumerate() {
        if !done {
            tracing::warn!(index = i, "dependency cycle detected, breaking at batch 0");
            level[i] = 0;
        }
    }

    let max_level = level.iter().copied().max().unwrap_or(0);
    let mut batches = vec![Vec::new(); max_level + 1];
    for (i, l) in level.into_iter().enumerate() {
        batches[l].push(i);
    }
    batches
}

/// Runs assignments batch-by-batch, `max_agents` at a time within a batch,
/// awaiting every worker in a batch before starting the next.
pub struct Scheduler {
    max_agents: usize,
}

impl Scheduler {
    pub fn new(max_agents: usize) -> Self {
        Self { max_agents: max_agents.max(1) }
    }

    pub async fn run<F, Fut>(&self, assignments: &[AgentAssignment], worker: F) -> Vec<SubtaskResult>
    where
        F: Fn(usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SubtaskResult> + Send + 'static,
    {
        let batches = compute_batches(assignments);
        let worker = Arc::new(worker);
        let semaphore = Arc::new(Semaphore::new(self.max_agents));
        let mut results: Vec<Option<SubtaskResult>> = (0..assignments.len()).map(|_| None).collect();

        for batch in batches {
            let mut handles = Vec::with_capacity(batch.len());
            for &index in &batch {
                let worker = worker.clone();
                let semaphore = semaphore.clone();
                let handle = tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                    worker(index).await
                });
                handles.push((index, handle));
            }

            for (index, handle) in handles {
                match handle.await {
                    Ok(result) => results[index] = Some(result),
                    Err(join_error) => {
                        tracing::error!(index, error = %join_error, "subtask worker task faulted unexpectedly");
                        results[index] =
                            Some(SubtaskResult::synthetic_failure(&assignments[index], join_error.to_string()));
                    }
                }
            }
        }

        results.into_iter().flatten().collect()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
