// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reads the file-access proxy's side-channel TCP stream and turns
//! `blocked` events into router lookups queued for injection into the
//! blocked agent's next prompt.

use crate::router::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct BlockedAccessEvent {
    pub agent_id: String,
    pub session_id: String,
    pub path: String,
    pub action: String,
    pub timestamp_ms: i64,
}

fn symbol_hint(path: &str) -> String {
    Path::new(path).file_stem().and_then(|s| s.to_str()).unwrap_or("").to_string()
}

#[derive(Default)]
pub struct BlockedAccessListener {
    events: Mutex<Vec<BlockedAccessEvent>>,
    pending_resolutions: Mutex<HashMap<String, String>>,
}

impl BlockedAccessListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connects to the proxy's announced port and processes its event
    /// stream until the connection closes. Connection failures are logged,
    /// not propagated — a session with no `tcp_port` simply has no listener.
    pub fn spawn_for_port(self: &Arc<Self>, port: u16, session_id: String, router: Arc<Router>) -> JoinHandle<()> {
        let listener = self.clone();
        tokio::spawn(async move { listener.read_loop(port, session_id, router).await })
    }

    async fn read_loop(&self, port: u16, session_id: String, router: Arc<Router>) {
        let stream = match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(port, error = %e, "failed to connect to blocked-access proxy port");
                return;
            }
        };
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.handle_line(&line, &session_id, &router).await;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "error reading blocked-access stream");
                    break;
                }
            }
        }
    }

    async fn handle_line(&self, line: &str, session_id: &str, router: &Router) {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "malformed blocked-access event");
                return;
            }
        };
        if value.get("type").and_then(Value::as_str) != Some("blocked") {
            return;
        }

        let agent_id = value.get("agent_id").and_then(Value::as_str).unwrap_or_default().to_string();
        let path = value.get("path").and_then(Value::as_str).unwrap_or_default().to_string();
        let action = value.get("action").and_then(Value::as_str).unwrap_or_default().to_string();
        let timestamp_ms = value.get("timestamp_ms").and_then(Value::as_i64).unwrap_or(0);

        self.events.lock().await.push(BlockedAccessEvent {
            agent_id: agent_id.clone(),
            session_id: session_id.to_string(),
            path: path.clone(),
            action: action.clone(),
            timestamp_ms,
        });

        let hint = symbol_hint(&path);
        let context = format!("Blocked {action} access to {path}");
        let resolution = router.resolve(&agent_id, &hint, &context).await;

        let mut pending = self.pending_resolutions.lock().await;
        let entry = pending.entry(agent_id).or_default();
        entry.push_str(&format!("\n[Cross-region info for {path}]:\n{resolution}"));
    }

    pub async fn events(&self) -> Vec<BlockedAccessEvent> {
        self.events.lock().await.clone()
    }

    /// Destructive read: returns and clears the buffered resolution text
    /// for `agent_id`, or `None` if nothing is pending.
    pub async fn take_resolution(&self, agent_id: &str) -> Option<String> {
        self.pending_resolutions.lock().await.remove(agent_id)
    }
}

#[cfg(test)]
#[path = "blocked_listener_tests.rs"]
mod tests;
