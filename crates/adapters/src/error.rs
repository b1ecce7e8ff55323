// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::rpc::RpcError;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("{binary} not found on PATH")]
    BinaryNotFound { binary: String },

    #[error("agent '{agent_name}' requires authentication: {methods_display}")]
    AuthenticationRequired { agent_name: String, methods_display: String, auth_methods: Vec<Value> },

    #[error("agent did not respond to session/new within {timeout_secs}s")]
    SessionNewTimeout { timeout_secs: u64 },

    #[error("prompt sent before a session was established; call new_session() first")]
    NoActiveSession,

    #[error("agent process exited unexpectedly with code {0:?}")]
    ProcessExited(Option<i32>),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdapterError {
    pub fn authentication_required(agent_name: impl Into<String>, auth_methods: Vec<Value>) -> Self {
        let methods_display = auth_methods
            .iter()
            .map(|m| {
                let name = m.get("name").and_then(Value::as_str).unwrap_or("unknown");
                match m.get("description").and_then(Value::as_str) {
                    Some(desc) if !desc.is_empty() => format!("{name} ({desc})"),
                    _ => name.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        Self::AuthenticationRequired { agent_name: agent_name.into(), methods_display, auth_methods }
    }
}
