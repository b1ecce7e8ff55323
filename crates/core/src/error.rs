// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every crate downstream of `crew-core`.
//!
//! Each variant corresponds to one of the error kinds named in the
//! orchestration design: configuration failures abort before any child is
//! spawned, transitions are a programming-error kind, and so on. Downstream
//! crates wrap this enum into their own `thiserror` type via `#[from]`
//! rather than stringly-matching on `Display` output.

use thiserror::Error;

/// Errors that can occur at the lifecycle/data-model layer.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("agent '{0}' not found in registry")]
    AgentNotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}
