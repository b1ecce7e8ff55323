// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-level and subtask-level lifecycle state machines.
//!
//! Both machines enforce a fixed transition table and refuse any move not
//! in it; a terminal state is never mutated. Observers registered via
//! [`TaskLifecycle::on_change`] / [`SubtaskLifecycle::on_change`] are
//! notified on every successful transition; a panicking observer would
//! break the state machine, so callbacks are invoked behind `catch_unwind`
//! and a failure is logged, not propagated.

use crate::error::CoreError;
use std::panic::AssertUnwindSafe;

/// Run-level lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Idle,
    Decomposing,
    Confirming,
    Spawning,
    Running,
    /// All subtasks finished but at least one did not succeed.
    Done,
    /// All subtasks succeeded.
    Completed,
    Cancelled,
    Retrying,
}

crate::simple_display! {
    TaskState {
        Idle => "idle",
        Decomposing => "decomposing",
        Confirming => "confirming",
        Spawning => "spawning",
        Running => "running",
        Done => "done",
        Completed => "completed",
        Cancelled => "cancelled",
        Retrying => "retrying",
    }
}

impl TaskState {
    fn valid_transitions(self) -> &'static [TaskState] {
        use TaskState::*;
        match self {
            Idle => &[Decomposing],
            Decomposing => &[Confirming],
            Confirming => &[Cancelled, Spawning],
            Spawning => &[Running],
            Running => &[Done, Completed],
            Done => &[Retrying],
            Retrying => &[Running],
            Completed => &[],
            Cancelled => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Cancelled)
    }
}

/// Subtask-level lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskState {
    Pending,
    Running,
    Completed,
    Failed,
    Partial,
    Retrying,
}

crate::simple_display! {
    SubtaskState {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Partial => "partial",
        Retrying => "retrying",
    }
}

impl SubtaskState {
    fn valid_transitions(self) -> &'static [SubtaskState] {
        use SubtaskState::*;
        match self {
            Pending => &[Running],
            Running => &[Completed, Failed, Partial],
            Failed => &[Retrying],
            Partial => &[Retrying],
            Retrying => &[Running],
            Completed => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SubtaskState::Completed)
    }

    pub fn can_retry(self) -> bool {
        matches!(self, SubtaskState::Failed | SubtaskState::Partial)
    }
}

type TaskObserver = Box<dyn Fn(TaskState, TaskState) + Send + Sync>;
type SubtaskObserver = Box<dyn Fn(SubtaskState, SubtaskState) + Send + Sync>;

/// Run-level state machine with validated transitions and observers.
pub struct TaskLifecycle {
    state: TaskState,
    observers: Vec<TaskObserver>,
}

impl TaskLifecycle {
    pub fn new() -> Self {
        Self { state: TaskState::Idle, observers: Vec::new() }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn on_change(&mut self, observer: impl Fn(TaskState, TaskState) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Attempt `self.state -> next`. Fails loudly (typed error) on an
    /// unpublished transition; never mutates a terminal state.
    pub fn transition(&mut self, next: TaskState) -> Result<(), CoreError> {
        if self.state.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        if !self.state.valid_transitions().contains(&next) {
            return Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        let prev = self.state;
        self.state = next;
        for observer in &self.observers {
            // Observer exceptions are swallowed — never break the state machine.
            let _ = std::panic::catch_unwind(AssertUnwindSafe(|| observer(prev, next)));
        }
        Ok(())
    }
}

impl Default for TaskLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-subtask state machine. Carries its own retry counter, incremented
/// once per `retrying -> running` cycle.
pub struct SubtaskLifecycle {
    pub subtask_index: usize,
    pub description: String,
    state: SubtaskState,
    retry_count: u32,
    observers: Vec<SubtaskObserver>,
}

impl SubtaskLifecycle {
    pub fn new(subtask_index: usize, description: impl Into<String>) -> Self {
        Self {
            subtask_index,
            description: description.into(),
            state: SubtaskState::Pending,
            retry_count: 0,
            observers: Vec::new(),
        }
    }

    pub fn state(&self) -> SubtaskState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn on_change(
        &mut self,
        observer: impl Fn(SubtaskState, SubtaskState) + Send + Sync + 'static,
    ) {
        self.observers.push(Box::new(observer));
    }

    pub fn transition(&mut self, next: SubtaskState) -> Result<(), CoreError> {
        if self.state.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        if !self.state.valid_transitions().contains(&next) {
            return Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        let prev = self.state;
        self.state = next;
        if prev == SubtaskState::Retrying && next == SubtaskState::Running {
            self.retry_count += 1;
        }
        for observer in &self.observers {
            let _ = std::panic::catch_unwind(AssertUnwindSafe(|| observer(prev, next)));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
