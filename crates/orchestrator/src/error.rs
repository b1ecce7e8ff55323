// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level error enum for the orchestrator crate: wraps the lower-layer
//! errors from `crew-core`/`crew-adapters`/`crew-storage` and adds the
//! orchestration-level kinds (configuration, oracle failure, not-retryable).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Core(#[from] crew_core::CoreError),

    #[error(transparent)]
    Adapter(#[from] crew_adapters::AdapterError),

    #[error(transparent)]
    Storage(#[from] crew_storage::StorageError),

    #[error("oracle '{oracle}' failed: {reason}")]
    Oracle { oracle: &'static str, reason: String },

    #[error("cannot retry from state {0}; retry_failed() is only valid when state is 'done'")]
    NotRetryable(String),

    #[error("run '{0}' not found or not resumable")]
    RunNotResumable(String),
}
