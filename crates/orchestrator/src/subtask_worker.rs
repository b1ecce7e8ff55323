// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executes one [`AgentAssignment`]: spawns a sub-agent session confined
//! to its region, streams its output, evaluates the result, and tears the
//! session down regardless of outcome.

use crate::config::{EffortLevel, OrchestratorConfig};
use crate::oracles::{EvaluateRequest, Oracles, PromptBuildRequest};
use async_trait::async_trait;
use crew_adapters::session::{Session, SessionUpdate};
use crew_adapters::zones::SharedZoneConfig;
use crew_core::registry::get_agent;
use crew_core::{AgentAssignment, SubtaskLifecycle, SubtaskResult, SubtaskResultStatus, SubtaskState};
use crew_engine::blocked_listener::BlockedAccessListener;
use crew_engine::cost::{CostEntry, CostTracker};
use crew_engine::router::Router;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Region file listing and cross-region dependency signatures, depth gated
/// by [`EffortLevel`]. No DSPy-era equivalent exists to ground this against
/// directly — the Python original delegated to a `ContextBuilder` never
/// checked into this pack — so this walks the region directory the way
/// [`crew_storage::symbol_cache`]'s tracked-file walk does.
#[async_trait]
pub trait RegionContext: Send + Sync {
    async fn region_files(&self, region: &str, effort: EffortLevel) -> Vec<String>;
    async fn cross_region_deps(&self, region: &str, effort: EffortLevel) -> Vec<String>;
}

const SKIPPED_DIRS: &[&str] = &["node_modules", "target", ".venv", "__pycache__", ".git"];

fn file_cap(effort: EffortLevel) -> usize {
    match effort {
        EffortLevel::Low => 10,
        EffortLevel::Medium => 30,
        EffortLevel::High => 100,
    }
}

fn dep_cap(effort: EffortLevel) -> usize {
    match effort {
        EffortLevel::Low => 0,
        EffortLevel::Medium => 5,
        EffortLevel::High => 15,
    }
}

fn walk_region(root: &Path, base: &Path, cap: usize, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(root) else { return };
    for entry in entries.flatten() {
        if out.len() >= cap {
            return;
        }
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else { continue };
        if file_type.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name.starts_with('.') || SKIPPED_DIRS.contains(&name) {
                continue;
            }
            walk_region(&path, base, cap, out);
        } else if let Ok(rel) = path.strip_prefix(base) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}

/// Filesystem-backed [`RegionContext`]: lists files under `<workspace><region>`
/// and scans them for `use`/`import`/`require` paths pointing outside the region.
pub struct FsRegionContext {
    pub workspace: std::path::PathBuf,
}

#[async_trait]
impl RegionContext for FsRegionContext {
    async fn region_files(&self, region: &str, effort: EffortLevel) -> Vec<String> {
        let root = self.workspace.join(region.trim_start_matches('/'));
        let cap = file_cap(effort);
        let mut files = Vec::new();
        walk_region(&root, &root, cap, &mut files);
        files.sort();
        files
    }

    async fn cross_region_deps(&self, region: &str, effort: EffortLevel) -> Vec<String> {
        let cap = dep_cap(effort);
        if cap == 0 {
            return Vec::new();
        }
        let root = self.workspace.join(region.trim_start_matches('/'));
        let mut files = Vec::new();
        walk_region(&root, &root, file_cap(effort), &mut files);

        let pattern = regex::Regex::new(r#"(?:use|import|require)\s*\(?\s*['"]?([./][\w./-]+)"#)
            .expect("valid regex");
        let mut deps = Vec::new();
        for rel in &files {
            let Ok(contents) = std::fs::read_to_string(root.join(rel)) else { continue };
            for line in contents.lines() {
                if let Some(captures) = pattern.captures(line) {
                    let dep = captures[1].to_string();
                    if !dep.starts_with(region.trim_start_matches('/')) && !deps.contains(&dep) {
                        deps.push(dep);
                        if deps.len() >= cap {
                            return deps;
                        }
                    }
                }
            }
        }
        deps
    }
}

/// Sink for the orchestrator's streamed progress: the library never writes
/// to stdout directly, so a CLI or extension-protocol layer decides how to
/// surface it.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn on_text(&self, instance_id: &str, text: &str);
    async fn on_done(&self, instance_id: &str, stop_reason: &str);
    async fn on_error(&self, instance_id: &str, message: &str);
}

pub struct NoopProgressSink;

#[async_trait]
impl ProgressSink for NoopProgressSink {
    async fn on_text(&self, _instance_id: &str, _text: &str) {}
    async fn on_done(&self, _instance_id: &str, _stop_reason: &str) {}
    async fn on_error(&self, _instance_id: &str, _message: &str) {}
}

/// Shared dependencies every subtask worker needs, threaded through
/// construction rather than pulled from a global.
pub struct WorkerContext {
    pub config: Arc<OrchestratorConfig>,
    pub oracles: Arc<Oracles>,
    pub router: Arc<Router>,
    pub cost: Arc<CostTracker>,
    pub blocked_listener: Arc<BlockedAccessListener>,
    pub region_context: Arc<dyn RegionContext>,
    pub progress: Arc<dyn ProgressSink>,
    pub shared_zones: SharedZoneConfig,
    /// Shared with the [`Router`]'s peer-query implementation, so both sides
    /// see the same live sessions without holding each other by `Arc` —
    /// only this map is shared, not the whole context.
    pub active_sessions: Arc<Mutex<HashMap<String, Arc<Session>>>>,
}

impl WorkerContext {
    pub async fn active_session_count(&self) -> usize {
        self.active_sessions.lock().await.len()
    }
}

/// Runs one subtask end to end. `prior_result`, when present, is the same
/// subtask's result from an earlier attempt (retry context).
pub async fn execute_subtask(
    ctx: &WorkerContext,
    assignment: &Mutex<AgentAssignment>,
    prior_result: Option<&SubtaskResult>,
) -> SubtaskResult {
    let (index, description, region, expected_files, agent_id) = {
        let mut guard = assignment.lock().await;
        if let Err(e) = guard.lifecycle.transition(SubtaskState::Running) {
            tracing::warn!(error = %e, "subtask lifecycle transition to running failed");
        }
        (
            guard.subtask_index,
            guard.subtask.description.clone(),
            guard.subtask.region.clone(),
            guard.subtask.expected_files.clone(),
            guard.agent_id.clone(),
        )
    };

    let Some(agent_config) = get_agent(&agent_id) else {
        let failure = format!("Agent '{agent_id}' not found in registry");
        transition_failed(assignment).await;
        return SubtaskResult {
            index,
            description,
            region,
            agent_id,
            status: SubtaskResultStatus::Failed,
            agent_output: String::new(),
            failure_reason: Some(failure),
            suggested_retry: None,
            cost_tokens: 0,
        };
    };

    let region_files = ctx.region_context.region_files(&region, ctx.config.effort).await;
    let cross_region_deps = ctx.region_context.cross_region_deps(&region, ctx.config.effort).await;

    let prompt_result = ctx
        .oracles
        .prompt_build
        .build_prompt(PromptBuildRequest {
            subtask_description: description.clone(),
            region: region.clone(),
            region_files,
            cross_region_deps,
            effort_level: ctx.config.effort,
        })
        .await;

    let mut prompt_text = match prompt_result {
        Ok(text) => text,
        Err(reason) => {
            transition_failed(assignment).await;
            return SubtaskResult {
                index,
                description,
                region,
                agent_id,
                status: SubtaskResultStatus::Failed,
                agent_output: String::new(),
                failure_reason: Some(format!("prompt-build oracle failed: {reason}")),
                suggested_retry: None,
                cost_tokens: 0,
            };
        }
    };
    prompt_text.push_str(&format!(
        "\n\nIMPORTANT: You are working within the region '{region}'. \
         If you need information about types, functions, or APIs from outside \
         your region, describe what you need instead of reading those files directly. \
         The orchestrator will provide the information you need."
    ));

    let retry_count = assignment.lock().await.lifecycle.retry_count();
    if retry_count > 0 {
        if let Some(prior) = prior_result {
            if let Some(reason) = &prior.failure_reason {
                let suggestion = prior.suggested_retry.as_deref().unwrap_or("Try a different approach.");
                prompt_text = format!(
                    "\n\nPREVIOUS ATTEMPT FAILED: {reason}\nSuggested approach: {suggestion}\n\n{prompt_text}"
                );
            }
        }
    }

    let instance_id = format!("{agent_id}-{index}");
    let mut zone_patterns = vec![format!("{region}/**")];
    zone_patterns.extend(ctx.shared_zones.all_patterns());

    ctx.router.register_region(region.clone(), instance_id.clone()).await;

    let outcome = run_session(ctx, &instance_id, agent_config, &zone_patterns, &prompt_text, index).await;

    ctx.router.unregister_region(&region, &instance_id).await;
    ctx.active_sessions.lock().await.remove(&instance_id);

    match outcome {
        Ok(agent_output) => {
            let evaluation = ctx
                .oracles
                .evaluate
                .evaluate(EvaluateRequest {
                    subtask_description: description.clone(),
                    agent_output: agent_output.chars().take(4000).collect(),
                    expected_files: expected_files.clone(),
                })
                .await;

            match evaluation {
                Ok(response) => {
                    let next_state = match response.status {
                        SubtaskResultStatus::Completed => SubtaskState::Completed,
                        SubtaskResultStatus::Partial => SubtaskState::Partial,
                        SubtaskResultStatus::Failed => SubtaskState::Failed,
                    };
                    if let Err(e) = assignment.lock().await.lifecycle.transition(next_state) {
                        tracing::warn!(error = %e, "subtask lifecycle transition after evaluation failed");
                    }
                    SubtaskResult {
                        index,
                        description,
                        region,
                        agent_id,
                        status: response.status,
                        agent_output,
                        failure_reason: response.failure_reason,
                        suggested_retry: response.suggested_retry,
                        cost_tokens: 0,
                    }
                }
                Err(reason) => {
                    transition_failed(assignment).await;
                    SubtaskResult {
                        index,
                        description,
                        region,
                        agent_id,
                        status: SubtaskResultStatus::Failed,
                        agent_output,
                        failure_reason: Some(format!("evaluate oracle failed: {reason}")),
                        suggested_retry: None,
                        cost_tokens: 0,
                    }
                }
            }
        }
        Err((agent_output, reason)) => {
            transition_failed(assignment).await;
            SubtaskResult {
                index,
                description,
                region,
                agent_id,
                status: SubtaskResultStatus::Failed,
                agent_output,
                failure_reason: Some(reason),
                suggested_retry: None,
                cost_tokens: 0,
            }
        }
    }
}

async fn transition_failed(assignment: &Mutex<AgentAssignment>) {
    if let Err(e) = assignment.lock().await.lifecycle.transition(SubtaskState::Failed) {
        tracing::warn!(error = %e, "subtask lifecycle transition to failed failed");
    }
}

/// Spawns the session, streams the prompt, and always tears the session
/// down — the `Ok`/`Err` split mirrors a try/finally boundary, not RPC
/// success: both paths run the same cleanup.
async fn run_session(
    ctx: &WorkerContext,
    instance_id: &str,
    agent_config: &'static crew_core::AgentConfig,
    zone_patterns: &[String],
    prompt_text: &str,
    subtask_index: usize,
) -> Result<String, (String, String)> {
    let session = match Session::start(
        &ctx.config.proxy,
        ctx.config.workspace.clone(),
        instance_id,
        agent_config,
        zone_patterns,
        &[],
    ) {
        Ok(session) => session,
        Err(e) => return Err((String::new(), format!("failed to spawn agent session: {e}"))),
    };

    ctx.active_sessions.lock().await.insert(instance_id.to_string(), session.clone());

    if let Err(e) = session.initialize().await {
        session.kill().await;
        return Err((String::new(), format!("agent initialize failed: {e}")));
    }
    if let Err(e) = session.new_session().await {
        session.kill().await;
        return Err((String::new(), format!("agent new_session failed: {e}")));
    }

    let mut listener_handle = None;
    if let Some(port) = session.tcp_port() {
        listener_handle =
            Some(ctx.blocked_listener.spawn_for_port(port, instance_id.to_string(), ctx.router.clone()));
    }

    let prompt_result = session.prompt(prompt_text).await;

    if let Some(handle) = listener_handle {
        handle.abort();
    }
    session.kill().await;

    let updates = match prompt_result {
        Ok(updates) => updates,
        Err(e) => return Err((String::new(), format!("prompt execution error: {e}"))),
    };

    let mut agent_output = String::new();
    for update in updates {
        match update {
            SessionUpdate::Text(text) => {
                ctx.progress.on_text(instance_id, &text).await;
                agent_output.push_str(&text);
            }
            SessionUpdate::Usage { raw } => {
                let tokens = raw.get("usage").and_then(|u| u.get("used")).and_then(|v| v.as_u64()).unwrap_or(0);
                if tokens > 0 {
                    ctx.cost
                        .record(CostEntry {
                            source: instance_id.to_string(),
                            tokens_used: tokens,
                            description: "subtask execution".to_string(),
                            subtask: Some(subtask_index),
                            region: None,
                        })
                        .await;
                }
            }
            SessionUpdate::Done { stop_reason, .. } => {
                ctx.progress.on_done(instance_id, &stop_reason).await;
            }
            SessionUpdate::Error { message, .. } => {
                ctx.progress.on_error(instance_id, &message).await;
                return Err((agent_output, message));
            }
            SessionUpdate::Thought(_) | SessionUpdate::ToolCall { .. } | SessionUpdate::Other { .. } => {}
        }
    }

    Ok(agent_output)
}

#[cfg(test)]
#[path = "subtask_worker_tests.rs"]
mod tests;
