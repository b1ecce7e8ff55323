// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-delimited JSON on the core's own stdio, for when the
//! orchestrator is driven by a host editor rather than a terminal. Mirrors
//! the framing discipline of [`crew_adapters::rpc`] one level up: one JSON
//! value per line, malformed input or EOF ends the read loop without a
//! panic.

use crate::orchestrator::{ConfirmationGate, OrchestratorResult};
use crate::subtask_worker::ProgressSink;
use async_trait::async_trait;
use crew_core::TaskState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Run {
        intent: String,
        #[serde(default)]
        effort: Option<String>,
    },
    Approve {
        approved: bool,
    },
    Retry {
        #[serde(default)]
        subtask_indices: Vec<usize>,
    },
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    State { state: String },
    Plan { subtasks: Value, assignments: Value, estimated_cost: u64 },
    Progress { subtask_index: usize, agent_id: String, status: String },
    AgentTcp { agent_id: String, tcp_port: u16, agent_type: String },
    Result { status: String, subtask_results: Value, cost: u64 },
    Error { message: String },
}

pub fn parse_inbound(line: &str) -> Result<Inbound, serde_json::Error> {
    serde_json::from_str(line.trim())
}

pub fn encode_outbound(message: &Outbound) -> String {
    let mut line = serde_json::to_string(message)
        .unwrap_or_else(|_| r#"{"type":"error","message":"failed to encode outbound message"}"#.to_string());
    line.push('\n');
    line
}

pub fn state_message(state: TaskState) -> Outbound {
    Outbound::State { state: state.to_string() }
}

pub fn result_message(result: &OrchestratorResult) -> Outbound {
    Outbound::Result {
        status: result.status.to_string(),
        subtask_results: serde_json::to_value(&result.subtask_results).unwrap_or(Value::Null),
        cost: result.total_cost_tokens,
    }
}

/// Serializes outbound messages onto a shared sink, one JSON object per
/// line. Held behind an `Arc` so the confirmation gate and progress sink
/// can each write without owning the core's stdout.
pub struct OutboundChannel<W> {
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> OutboundChannel<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    pub async fn send(&self, message: &Outbound) {
        let line = encode_outbound(message);
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tracing::warn!(error = %e, "failed to write outbound protocol message");
            return;
        }
        let _ = writer.flush().await;
    }
}

/// [`ConfirmationGate`] backed by the extension protocol: sends a `plan`
/// message and blocks on the approvals channel the read loop feeds until
/// an `approve` message arrives. A closed channel (the read loop ended)
/// resolves as a decline, the same as EOF does for [`crate::orchestrator::StdinConfirmation`].
pub struct ExtensionConfirmationGate<W> {
    outbound: Arc<OutboundChannel<W>>,
    approvals: Mutex<mpsc::UnboundedReceiver<bool>>,
}

impl<W: AsyncWrite + Unpin + Send> ExtensionConfirmationGate<W> {
    pub fn new(outbound: Arc<OutboundChannel<W>>, approvals: mpsc::UnboundedReceiver<bool>) -> Self {
        Self { outbound, approvals: Mutex::new(approvals) }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ConfirmationGate for ExtensionConfirmationGate<W> {
    async fn confirm(&self, plan: &str) -> bool {
        self.outbound
            .send(&Outbound::Plan {
                subtasks: Value::String(plan.to_string()),
                assignments: Value::Array(Vec::new()),
                estimated_cost: 0,
            })
            .await;
        self.approvals.lock().await.recv().await.unwrap_or(false)
    }
}

/// [`ProgressSink`] backed by the extension protocol: every agent text
/// chunk, completion, or error becomes a `progress`/`error` outbound message.
pub struct ExtensionProgressSink<W> {
    outbound: Arc<OutboundChannel<W>>,
}

impl<W: AsyncWrite + Unpin + Send> ExtensionProgressSink<W> {
    pub fn new(outbound: Arc<OutboundChannel<W>>) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ProgressSink for ExtensionProgressSink<W> {
    async fn on_text(&self, instance_id: &str, _text: &str) {
        self.outbound
            .send(&Outbound::Progress {
                subtask_index: 0,
                agent_id: instance_id.to_string(),
                status: "streaming".to_string(),
            })
            .await;
    }

    async fn on_done(&self, instance_id: &str, stop_reason: &str) {
        self.outbound
            .send(&Outbound::Progress {
                subtask_index: 0,
                agent_id: instance_id.to_string(),
                status: stop_reason.to_string(),
            })
            .await;
    }

    async fn on_error(&self, instance_id: &str, message: &str) {
        self.outbound.send(&Outbound::Error { message: format!("{instance_id}: {message}") }).await;
    }
}

/// One command the read loop yields to the driver. `Approve` is not among
/// these: it answers an in-flight `confirm()` call and is routed straight
/// to the approvals channel instead of surfacing here.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run { intent: String, effort: Option<String> },
    Retry { subtask_indices: Vec<usize> },
    Cancel,
}

/// Reads inbound protocol lines one at a time.
pub struct ExtensionProtocol<R> {
    reader: R,
}

impl<R: AsyncBufRead + Unpin> ExtensionProtocol<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads until the next `run`/`retry`/`cancel` command, EOF, or a read
    /// error. A malformed line is reported via an outbound `error` message
    /// and skipped rather than ending the loop; EOF and read errors end it.
    pub async fn next_command<W: AsyncWrite + Unpin + Send>(
        &mut self,
        approvals: &mpsc::UnboundedSender<bool>,
        outbound: &OutboundChannel<W>,
    ) -> Option<Command> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line).await {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "error reading extension protocol stdin");
                    return None;
                }
            }
            if line.trim().is_empty() {
                continue;
            }
            match parse_inbound(&line) {
                Ok(Inbound::Run { intent, effort }) => return Some(Command::Run { intent, effort }),
                Ok(Inbound::Retry { subtask_indices }) => return Some(Command::Retry { subtask_indices }),
                Ok(Inbound::Cancel) => return Some(Command::Cancel),
                Ok(Inbound::Approve { approved }) => {
                    let _ = approvals.send(approved);
                }
                Err(e) => {
                    outbound.send(&Outbound::Error { message: format!("malformed inbound message: {e}") }).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "ext_protocol_tests.rs"]
mod tests;
