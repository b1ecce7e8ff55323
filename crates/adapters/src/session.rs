// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawns a sub-agent wrapped by the file-access proxy and drives its
//! JSON-RPC session: `initialize`, `session/new`, and streaming `session/prompt`.

use crate::error::AdapterError;
use crate::rpc::{Incoming, RpcConnection};
use crew_core::AgentConfig;
use regex::Regex;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};

const PROTOCOL_VERSION: u32 = 1;
const SESSION_NEW_TIMEOUT: Duration = Duration::from_secs(30);
const UPDATE_POLL_INTERVAL: Duration = Duration::from_millis(500);

fn tcp_port_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"eisen-core tcp port:\s*(\d+)").expect("valid regex"))
}

/// A single update received while a prompt is in flight.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Text(String),
    Thought(String),
    ToolCall { title: String, raw: Value },
    Usage { raw: Value },
    Done { stop_reason: String, raw: Value },
    Error { message: String, raw: Value },
    Other { raw: Value },
}

fn classify_update(method: &str, params: Value) -> SessionUpdate {
    if method != "session/update" {
        return SessionUpdate::Other { raw: params };
    }
    let update_type = params
        .get("type")
        .or_else(|| params.get("kind"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match update_type.as_str() {
        "agentMessage" | "AgentMessageChunk" => {
            let text = params.get("content").and_then(Value::as_str).unwrap_or_default().to_string();
            SessionUpdate::Text(text)
        }
        "agentThought" | "AgentThoughtChunk" => {
            let text = params.get("content").and_then(Value::as_str).unwrap_or_default().to_string();
            SessionUpdate::Thought(text)
        }
        "toolCallStart" | "ToolCallStart" => {
            let title = params.get("title").and_then(Value::as_str).unwrap_or_default().to_string();
            SessionUpdate::ToolCall { title, raw: params }
        }
        "usageUpdate" | "UsageUpdate" => SessionUpdate::Usage { raw: params },
        _ => classify_nested(params),
    }
}

fn classify_nested(params: Value) -> SessionUpdate {
    let nested = params.get("update").cloned().unwrap_or_else(|| params.clone());
    let Some(obj) = nested.as_object() else {
        return SessionUpdate::Other { raw: params };
    };
    let kind = obj.get("type").and_then(Value::as_str).unwrap_or("other").to_lowercase();
    let content = obj
        .get("content")
        .or_else(|| obj.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if kind.contains("message") || kind.contains("text") {
        SessionUpdate::Text(content)
    } else if kind.contains("thought") {
        SessionUpdate::Thought(content)
    } else if kind.contains("usage") {
        SessionUpdate::Usage { raw: nested.clone() }
    } else if kind.contains("tool") {
        let title = obj.get("title").and_then(Value::as_str).unwrap_or_default().to_string();
        SessionUpdate::ToolCall { title, raw: nested.clone() }
    } else {
        SessionUpdate::Other { raw: nested.clone() }
    }
}

fn approve_permission(params: &Value) -> Value {
    let options = params.get("options").and_then(Value::as_array).cloned().unwrap_or_default();
    let chosen = options
        .iter()
        .find(|opt| matches!(opt.get("kind").and_then(Value::as_str), Some("allow_once") | Some("allow_always")))
        .or_else(|| options.first());

    let option_id = chosen.and_then(|opt| opt.get("optionId")).and_then(Value::as_str).unwrap_or("");
    json!({ "outcome": { "optionId": option_id, "outcome": "selected" } })
}

fn read_text_file(params: &Value) -> Value {
    let path = params.get("path").and_then(Value::as_str).unwrap_or_default();
    match std::fs::read_to_string(path) {
        Ok(content) => json!({ "content": content }),
        Err(e) => {
            tracing::warn!(path, error = %e, "failed to read file requested by agent");
            json!({ "content": "" })
        }
    }
}

/// Drives one sub-agent's JSON-RPC session, wrapped by the file-access proxy.
pub struct Session {
    instance_id: String,
    workspace: PathBuf,
    agent: &'static AgentConfig,
    child: Mutex<Child>,
    rpc: Arc<RpcConnection>,
    tcp_port: Arc<AtomicU32>,
    updates_rx: Mutex<mpsc::UnboundedReceiver<SessionUpdate>>,
    session_id: Mutex<Option<String>>,
}

impl Session {
    /// `[proxy, "observe", "--port", "0", "--agent-id", <instance-id>,
    ///   ("--zone", pattern)*, ("--deny", pattern)*, "--", <agent-command>, <agent-args>...]`
    pub fn build_spawn_command(
        proxy: &str,
        instance_id: &str,
        zone_patterns: &[String],
        deny_patterns: &[String],
        agent: &AgentConfig,
    ) -> Vec<String> {
        let mut cmd = vec![
            proxy.to_string(),
            "observe".to_string(),
            "--port".to_string(),
            "0".to_string(),
            "--agent-id".to_string(),
            instance_id.to_string(),
        ];
        for pattern in zone_patterns {
            cmd.push("--zone".to_string());
            cmd.push(pattern.clone());
        }
        for pattern in deny_patterns {
            cmd.push("--deny".to_string());
            cmd.push(pattern.clone());
        }
        cmd.push("--".to_string());
        cmd.push(agent.command.to_string());
        cmd.extend(agent.args.iter().map(|a| a.to_string()));
        cmd
    }

    /// Spawn the proxy+agent process and set up the JSON-RPC link.
    pub fn start(
        proxy: &str,
        workspace: PathBuf,
        instance_id: impl Into<String>,
        agent: &'static AgentConfig,
        zone_patterns: &[String],
        deny_patterns: &[String],
    ) -> Result<Arc<Self>, AdapterError> {
        let instance_id = instance_id.into();
        let cmd = Self::build_spawn_command(proxy, &instance_id, zone_patterns, deny_patterns, agent);
        tracing::info!(command = %cmd.join(" "), "spawning agent session");

        let mut child = Command::new(&cmd[0])
            .args(&cmd[1..])
            .current_dir(&workspace)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        let rpc = RpcConnection::spawn(stdin, stdout);
        let tcp_port = Arc::new(AtomicU32::new(0));
        tokio::spawn(Self::read_stderr(stderr, tcp_port.clone()));

        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let session = Arc::new(Self {
            instance_id,
            workspace,
            agent,
            child: Mutex::new(child),
            rpc: rpc.clone(),
            tcp_port,
            updates_rx: Mutex::new(updates_rx),
            session_id: Mutex::new(None),
        });
        tokio::spawn(Self::dispatch_loop(rpc, updates_tx));
        Ok(session)
    }

    async fn read_stderr(stderr: tokio::process::ChildStderr, tcp_port: Arc<AtomicU32>) {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    tracing::debug!(line = %line, "[agent stderr]");
                    if let Some(captures) = tcp_port_pattern().captures(&line) {
                        if let Ok(port) = captures[1].parse::<u32>() {
                            tcp_port.store(port, Ordering::Relaxed);
                            tracing::info!(port, "eisen-core tcp port");
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "error reading agent stderr");
                    break;
                }
            }
        }
    }

    /// Answers server-initiated requests/notifications from the agent:
    /// `session/update`, `requestPermission`, `readTextFile`, and the
    /// terminal/writeTextFile methods, which are all accepted as no-ops.
    async fn dispatch_loop(rpc: Arc<RpcConnection>, updates_tx: mpsc::UnboundedSender<SessionUpdate>) {
        loop {
            let incoming = rpc.requests_rx.lock().await.recv().await;
            let Some(incoming) = incoming else { break };
            match incoming {
                Incoming::Notification { method, params } => {
                    if method == "session/update" {
                        let _ = updates_tx.send(classify_update(&method, params));
                    } else {
                        tracing::debug!(method = %method, "unhandled notification");
                    }
                }
                Incoming::Request { id, method, params } => {
                    let result = match method.as_str() {
                        "requestPermission" => approve_permission(&params),
                        "readTextFile" => read_text_file(&params),
                        "writeTextFile" | "createTerminal" | "terminalOutput" | "releaseTerminal"
                        | "waitForTerminalExit" | "killTerminal" => Value::Null,
                        other => {
                            tracing::debug!(method = %other, "unhandled agent method");
                            Value::Null
                        }
                    };
                    if let Err(e) = rpc.respond(id, result).await {
                        tracing::warn!(error = %e, "failed to respond to agent request");
                    }
                }
                Incoming::Response { .. } => unreachable!("responses are consumed by RpcConnection::call"),
            }
        }
    }

    pub fn tcp_port(&self) -> Option<u16> {
        match self.tcp_port.load(Ordering::Relaxed) {
            0 => None,
            port => Some(port as u16),
        }
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.try_lock().ok().and_then(|g| g.clone())
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Send `initialize`, rejecting agents that demand authentication.
    pub async fn initialize(&self) -> Result<Value, AdapterError> {
        let response = self
            .rpc
            .call(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "clientInfo": { "name": "eisen-agent", "version": env!("CARGO_PKG_VERSION") },
                }),
            )
            .await?;

        let auth_methods = response.get("authMethods").and_then(Value::as_array).cloned().unwrap_or_default();
        if !auth_methods.is_empty() {
            let agent_name = response
                .get("agentInfo")
                .and_then(|i| i.get("name"))
                .and_then(Value::as_str)
                .unwrap_or(self.agent.id)
                .to_string();
            return Err(AdapterError::authentication_required(agent_name, auth_methods));
        }
        Ok(response)
    }

    pub async fn new_session(&self) -> Result<String, AdapterError> {
        let params = json!({ "cwd": self.workspace.to_string_lossy(), "mcpServers": [] });
        let response = tokio::time::timeout(SESSION_NEW_TIMEOUT, self.rpc.call("session/new", params))
            .await
            .map_err(|_| AdapterError::SessionNewTimeout { timeout_secs: SESSION_NEW_TIMEOUT.as_secs() })??;

        let session_id = response.get("sessionId").and_then(Value::as_str).unwrap_or_default().to_string();
        *self.session_id.lock().await = Some(session_id.clone());
        Ok(session_id)
    }

    /// Send `session/prompt` and collect streamed updates until the agent's
    /// response arrives or the child process dies. Returns in arrival order,
    /// terminated by exactly one `Done` or `Error` update.
    ///
    /// Polls at `UPDATE_POLL_INTERVAL` granularity with no overall timeout —
    /// a session that stalls without emitting updates or dying blocks this
    /// call indefinitely.
    pub async fn prompt(&self, content: &str) -> Result<Vec<SessionUpdate>, AdapterError> {
        let session_id = self.session_id().ok_or(AdapterError::NoActiveSession)?;
        let rpc = self.rpc.clone();
        let params = json!({
            "sessionId": session_id,
            "prompt": [{ "type": "text", "text": content }],
        });
        let mut call_future = Box::pin(async move { rpc.call("session/prompt", params).await });

        let mut updates = Vec::new();
        loop {
            if let Ok(mut child) = self.child.try_lock() {
                if let Ok(Some(status)) = child.try_wait() {
                    updates.push(SessionUpdate::Error {
                        message: format!("agent process exited unexpectedly (code {:?})", status.code()),
                        raw: json!({ "exitCode": status.code() }),
                    });
                    return Ok(updates);
                }
            }

            let mut rx = self.updates_rx.lock().await;
            tokio::select! {
                biased;
                result = &mut call_future => {
                    drop(rx);
                    while let Ok(update) = self.updates_rx.lock().await.try_recv() {
                        updates.push(update);
                    }
                    match result {
                        Ok(response) => {
                            let stop_reason = response.get("stopReason").and_then(Value::as_str).unwrap_or("unknown").to_string();
                            updates.push(SessionUpdate::Done { stop_reason, raw: response });
                        }
                        Err(e) => updates.push(SessionUpdate::Error { message: e.to_string(), raw: Value::Null }),
                    }
                    return Ok(updates);
                }
                update = tokio::time::timeout(UPDATE_POLL_INTERVAL, rx.recv()) => {
                    match update {
                        Ok(Some(update)) => updates.push(update),
                        Ok(None) => {}
                        Err(_elapsed) => {}
                    }
                }
            }
        }
    }

    /// Idempotent: safe to call more than once.
    pub async fn kill(&self) {
        if let Ok(mut child) = self.child.try_lock() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
