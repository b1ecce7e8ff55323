// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-delimited JSON-RPC 2.0 framing over a child process's stdio.
//!
//! A [`RpcConnection`] multiplexes three directions on one pair of pipes:
//! requests *we* send to the agent (and await a response for), requests
//! *the agent* sends back to us (which we must answer), and fire-and-forget
//! notifications in either direction. One reader task owns stdout; writes
//! go straight to stdin under a mutex, since JSON-RPC over a pipe has no
//! inherent backpressure-aware multiplexing beyond "one line at a time".

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::{mpsc, oneshot, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("child process stdio closed")]
    Closed,
    #[error("malformed JSON-RPC message: {0}")]
    Decode(String),
    #[error("agent returned error {code}: {message}")]
    Remote { code: i64, message: String },
    #[error("request timed out")]
    Timeout,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// An inbound message the agent sent to us, after classification.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// A response correlated to one of our outstanding requests.
    Response { id: i64, result: Result<Value, (i64, String)> },
    /// A method call from the agent that expects a response.
    Request { id: Value, method: String, params: Value },
    /// A fire-and-forget notification from the agent.
    Notification { method: String, params: Value },
}

fn classify(raw: &Value) -> Option<Incoming> {
    let obj = raw.as_object()?;
    if let Some(method) = obj.get("method").and_then(Value::as_str) {
        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        return Some(match obj.get("id") {
            Some(id) => Incoming::Request { id: id.clone(), method: method.to_string(), params },
            None => Incoming::Notification { method: method.to_string(), params },
        });
    }
    let id = obj.get("id")?.as_i64()?;
    if let Some(err) = obj.get("error") {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or(-1);
        let message = err.get("message").and_then(Value::as_str).unwrap_or("").to_string();
        return Some(Incoming::Response { id, result: Err((code, message)) });
    }
    let result = obj.get("result").cloned().unwrap_or(Value::Null);
    Some(Incoming::Response { id, result: Ok(result) })
}

struct Pending {
    next_id: AtomicI64,
    waiters: Mutex<HashMap<i64, oneshot::Sender<Result<Value, (i64, String)>>>>,
}

/// Owns the wire-level plumbing for one child process's JSON-RPC link.
///
/// `requests_rx` yields [`Incoming::Request`]/[`Incoming::Notification`]
/// items for the caller (the [`crate::session::Session`]) to dispatch;
/// `call` sends a request of our own and awaits its correlated response.
pub struct RpcConnection {
    stdin: Arc<Mutex<ChildStdin>>,
    pending: Arc<Pending>,
    pub requests_rx: Mutex<mpsc::UnboundedReceiver<Incoming>>,
}

impl RpcConnection {
    pub fn spawn(stdin: ChildStdin, stdout: ChildStdout) -> Arc<Self> {
        let pending = Arc::new(Pending { next_id: AtomicI64::new(1), waiters: Mutex::new(HashMap::new()) });
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Arc::new(Self {
            stdin: Arc::new(Mutex::new(stdin)),
            pending: pending.clone(),
            requests_rx: Mutex::new(rx),
        });
        tokio::spawn(Self::read_loop(stdout, pending, tx));
        conn
    }

    async fn read_loop(stdout: ChildStdout, pending: Arc<Pending>, tx: mpsc::UnboundedSender<Incoming>) {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let parsed: Value = match serde_json::from_str(&line) {
                        Ok(v) => v,
                        Err(e) => {
                            tracing::warn!(error = %e, "malformed JSON-RPC line from child");
                            continue;
                        }
                    };
                    match classify(&parsed) {
                        Some(Incoming::Response { id, result }) => {
                            if let Some(waiter) = pending.waiters.lock().await.remove(&id) {
                                let _ = waiter.send(result);
                            }
                        }
                        Some(other) => {
                            if tx.send(other).is_err() {
                                break;
                            }
                        }
                        None => tracing::warn!(line = %line, "unrecognised JSON-RPC message shape"),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "error reading child stdout");
                    break;
                }
            }
        }
    }

    /// Send a request to the child and await its response.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.pending.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.waiters.lock().await.insert(id, tx);

        let envelope = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        self.write_line(&envelope).await?;

        match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err((code, message))) => Err(RpcError::Remote { code, message }),
            Err(_) => Err(RpcError::Closed),
        }
    }

    /// Reply to a [`Incoming::Request`] the agent sent us.
    pub async fn respond(&self, id: Value, result: Value) -> Result<(), RpcError> {
        let envelope = serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": result });
        self.write_line(&envelope).await
    }

    async fn write_line(&self, envelope: &Value) -> Result<(), RpcError> {
        let mut line = serde_json::to_string(envelope).map_err(|e| RpcError::Decode(e.to_string()))?;
        line.push('\n');
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
