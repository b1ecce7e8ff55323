// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestration layer: decomposes a user intent into region-scoped
//! subtasks, assigns a sub-agent to each, runs them dependency-batched
//! and concurrently, and records the outcome for future runs to build on.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod ext_protocol;
pub mod oracles;
pub mod orchestrator;
pub mod subtask_worker;
pub mod workspace_context;

pub use config::{check_model_credentials, default_model_from_env, EffortLevel, OrchestratorConfig};
pub use error::OrchestratorError;
pub use ext_protocol::ExtensionProtocol;
pub use oracles::{
    AssignOracle, AssignRequest, DecomposeOracle, DecomposeRequest, DecomposeResponse, EvaluateOracle,
    EvaluateRequest, EvaluateResponse, Oracles, PromptBuildOracle, PromptBuildRequest,
};
pub use orchestrator::{
    parse_user_overrides, ConfirmationGate, Orchestrator, OrchestratorResult, Paths, StdinConfirmation,
};
pub use subtask_worker::{FsRegionContext, NoopProgressSink, ProgressSink, RegionContext, WorkerContext};
pub use workspace_context::{DefaultWorkspaceContext, WorkspaceContext};
