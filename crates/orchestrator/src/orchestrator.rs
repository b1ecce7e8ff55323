// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestration driver: decompose -> assign -> confirm -> spawn ->
//! run -> record. Ties together the oracle capability set, the A2A
//! router, the scheduler, and every persisted-state surface.

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::oracles::{AssignRequest, DecomposeRequest, Oracles};
use crate::subtask_worker::{self, ProgressSink, WorkerContext};
use crate::workspace_context::WorkspaceContext;
use async_trait::async_trait;
use crew_adapters::session::Session;
use crew_adapters::zones::SharedZoneConfig;
use crew_core::registry::{available_agents, get_agent, resolve_agent_name, AGENTS};
use crew_core::{
    AgentAssignment, Subtask, SubtaskResult, SubtaskResultStatus, SubtaskState, TaskLifecycle, TaskState,
};
use crew_engine::cost::{CostEntry, CostTracker};
use crew_engine::router::{PeerQuery, Router, SymbolIndex};
use crew_engine::scheduler::Scheduler;
use crew_storage::agent_stats::AgentStats;
use crew_storage::persistence::{RunPersistence, RunState, SavedSubtask};
use crew_storage::session_memory::{SessionContext, SessionMemory};
use crew_storage::trace::{TraceCollector, TrainingTrace};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::Mutex;

/// `~/.eisen/` subdirectories, threaded through construction instead of
/// resolved ad hoc by each persisted-state surface.
pub struct Paths {
    pub runs_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub traces_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub agent_stats_path: PathBuf,
}

impl Paths {
    pub fn under_home() -> Result<Self, OrchestratorError> {
        let home = dirs::home_dir()
            .ok_or_else(|| OrchestratorError::Configuration("could not determine home directory".to_string()))?;
        let root = home.join(".eisen");
        Ok(Self {
            runs_dir: root.join("runs"),
            sessions_dir: root.join("sessions"),
            traces_dir: root.join("traces"),
            cache_dir: root.join("cache"),
            agent_stats_path: root.join("agent_stats.json"),
        })
    }
}

/// Final aggregated outcome of a `run`/`retry_failed`/`resume_run` call.
#[derive(Debug, Clone)]
pub struct OrchestratorResult {
    pub status: TaskState,
    pub subtask_results: Vec<SubtaskResult>,
    pub total_cost_tokens: u64,
    pub orchestrator_cost_tokens: u64,
}

#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, plan: &str) -> bool;
}

/// Reads a `y`/`n` line from stdin, matching the original's `input()`
/// prompt: EOF or an unparsed answer is treated as "no."
pub struct StdinConfirmation;

#[async_trait]
impl ConfirmationGate for StdinConfirmation {
    async fn confirm(&self, plan: &str) -> bool {
        println!("{plan}");
        print!("Proceed? [y/n]: ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(0) => false,
            Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// Queries a live peer session for router cross-region resolution. Shares
/// the worker's active-sessions map by `Arc`, rather than holding the
/// worker context itself, to avoid an orchestrator/router/session cycle.
struct SessionPeerQuery {
    active_sessions: Arc<Mutex<HashMap<String, Arc<Session>>>>,
}

#[async_trait]
impl PeerQuery for SessionPeerQuery {
    async fn query_peer(&self, agent_id: &str, prompt: &str) -> Option<String> {
        let session = self.active_sessions.lock().await.get(agent_id).cloned()?;
        let updates = session.prompt(prompt).await.ok()?;
        let mut text = String::new();
        for update in updates {
            if let crew_adapters::session::SessionUpdate::Text(t) = update {
                text.push_str(&t);
            }
        }
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

fn override_patterns() -> &'static [regex::Regex; 3] {
    static PATTERNS: std::sync::OnceLock<[regex::Regex; 3]> = std::sync::OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            regex::Regex::new(r"use\s+(\w[\w-]*)\s+for\s+(/\S+)").expect("valid regex"),
            regex::Regex::new(r"@(\w[\w-]*)\s+(/\S+)").expect("valid regex"),
            regex::Regex::new(r"assign\s+(\w[\w-]*)\s+to\s+(/\S+)").expect("valid regex"),
        ]
    })
}

/// Extracts explicit agent-to-region overrides from user intent, e.g.
/// `"use claude for /core"`, `"@codex /ui"`, `"assign gemini to /api"`.
/// Paths containing spaces are not matched — the region group is `\S+`,
/// the same limitation the original carried.
pub fn parse_user_overrides(intent: &str) -> HashMap<String, String> {
    let mut overrides = HashMap::new();
    for pattern in override_patterns() {
        for captures in pattern.captures_iter(intent) {
            let agent_name = &captures[1];
            let region = &captures[2];
            if let Some(agent_id) = resolve_agent_name(agent_name) {
                overrides.insert(region.to_string(), agent_id.to_string());
            }
        }
    }
    overrides
}

fn detect_language(region: &str) -> &'static str {
    let region_path = region.trim_start_matches('/');
    if region_path.contains("core") || region_path.contains("src") {
        return "rust";
    }
    if region_path.contains("ui") || region_path.contains("extension") {
        return "typescript";
    }
    if region_path.contains("agent") || region_path.contains("py") {
        return "python";
    }
    "unknown"
}

fn infer_task_type(region: &str) -> &'static str {
    let region_path = region.trim_start_matches('/').to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| region_path.contains(k));
    if contains_any(&["ui", "frontend", "views", "components"]) {
        "ui"
    } else if contains_any(&["test", "spec", "__tests__"]) {
        "tests"
    } else if contains_any(&["config", ".config", "settings"]) {
        "config"
    } else if contains_any(&["core", "backend", "server", "api"]) {
        "backend"
    } else if contains_any(&["lib", "utils", "shared", "common"]) {
        "library"
    } else {
        "general"
    }
}

/// Owns the orchestration run's lifecycle and drives it to completion.
pub struct Orchestrator {
    config: OrchestratorConfig,
    lifecycle: Mutex<TaskLifecycle>,
    oracles: Arc<Oracles>,
    workspace_context: Arc<dyn WorkspaceContext>,
    region_context: Arc<dyn subtask_worker::RegionContext>,
    progress: Arc<dyn ProgressSink>,
    confirmation: Arc<dyn ConfirmationGate>,
    router: Arc<Router>,
    cost: Arc<CostTracker>,
    blocked_listener: Arc<crew_engine::blocked_listener::BlockedAccessListener>,
    active_sessions: Arc<Mutex<HashMap<String, Arc<Session>>>>,
    shared_zones: SharedZoneConfig,
    agent_stats: Arc<AgentStats>,
    session_memory: Arc<SessionMemory>,
    run_persistence: Arc<RunPersistence>,
    trace_collector: Arc<TraceCollector>,
    run_id: String,
    run_started_at: Mutex<Option<std::time::Instant>>,
    user_intent: Mutex<String>,
    workspace_tree: Mutex<String>,
    symbol_index: Mutex<String>,
    assignments: Mutex<Vec<Arc<Mutex<AgentAssignment>>>>,
    results: Mutex<Vec<SubtaskResult>>,
}

#[allow(clippy::too_many_arguments)]
impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        oracles: Oracles,
        symbol_index: Box<dyn SymbolIndex>,
        workspace_context: Arc<dyn WorkspaceContext>,
        region_context: Arc<dyn subtask_worker::RegionContext>,
        progress: Arc<dyn ProgressSink>,
        confirmation: Arc<dyn ConfirmationGate>,
        paths: &Paths,
    ) -> Result<Self, OrchestratorError> {
        let active_sessions = Arc::new(Mutex::new(HashMap::new()));
        let router = Arc::new(Router::new(
            config.workspace.clone(),
            symbol_index,
            Box::new(SessionPeerQuery { active_sessions: active_sessions.clone() }),
        ));

        Ok(Self {
            run_id: crew_core::RunId::new().to_string(),
            lifecycle: Mutex::new(TaskLifecycle::new()),
            oracles: Arc::new(oracles),
            workspace_context,
            region_context,
            progress,
            confirmation,
            router,
            cost: Arc::new(CostTracker::new()),
            blocked_listener: crew_engine::blocked_listener::BlockedAccessListener::new(),
            active_sessions,
            shared_zones: SharedZoneConfig::from_workspace(&config.workspace),
            agent_stats: Arc::new(AgentStats::load(&paths.agent_stats_path)),
            session_memory: Arc::new(SessionMemory::new(&paths.sessions_dir)),
            run_persistence: Arc::new(RunPersistence::new(&paths.runs_dir)),
            trace_collector: Arc::new(TraceCollector::new(&paths.traces_dir)),
            config,
            run_started_at: Mutex::new(None),
            user_intent: Mutex::new(String::new()),
            workspace_tree: Mutex::new(String::new()),
            symbol_index: Mutex::new(String::new()),
            assignments: Mutex::new(Vec::new()),
            results: Mutex::new(Vec::new()),
        })
    }

    pub async fn state(&self) -> TaskState {
        self.lifecycle.lock().await.state()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn worker_context(&self) -> WorkerContext {
        WorkerContext {
            config: Arc::new(OrchestratorConfig {
                workspace: self.config.workspace.clone(),
                effort: self.config.effort,
                auto_approve: self.config.auto_approve,
                max_agents: self.config.max_agents,
                model: self.config.model.clone(),
                proxy: self.config.proxy.clone(),
            }),
            oracles: self.oracles.clone(),
            router: self.router.clone(),
            cost: self.cost.clone(),
            blocked_listener: self.blocked_listener.clone(),
            region_context: self.region_context.clone(),
            progress: self.progress.clone(),
            shared_zones: self.shared_zones.clone(),
            active_sessions: self.active_sessions.clone(),
        }
    }

    pub async fn run(&self, user_intent: &str) -> Result<OrchestratorResult, OrchestratorError> {
        *self.run_started_at.lock().await = Some(std::time::Instant::now());
        *self.user_intent.lock().await = user_intent.to_string();

        let prev_contexts =
            self.session_memory.load_relevant_context(user_intent, &self.config.workspace.to_string_lossy(), 0.2, 3);

        self.lifecycle.lock().await.transition(TaskState::Decomposing)?;
        let workspace_tree = self.workspace_context.workspace_tree();
        let symbol_index = self.workspace_context.symbol_index();
        *self.workspace_tree.lock().await = workspace_tree.clone();
        *self.symbol_index.lock().await = symbol_index.clone();
        let overrides = parse_user_overrides(user_intent);

        let mut decompose_intent = user_intent.to_string();
        if !prev_contexts.is_empty() {
            let summary = prev_contexts
                .iter()
                .map(|c| {
                    let files: usize = c.modified_files.values().map(Vec::len).sum();
                    format!("- Previous task '{}' modified {files} files", truncate(&c.user_intent, 60))
                })
                .collect::<Vec<_>>()
                .join("\n");
            decompose_intent = format!("{user_intent}\n\nPrevious related work:\n{summary}");
        }

        let subtasks = self.decompose(&decompose_intent, &workspace_tree, &symbol_index).await?;
        let agent_ids = self.assign_agents(&subtasks, &overrides).await?;

        let assignments: Vec<Arc<Mutex<AgentAssignment>>> = subtasks
            .into_iter()
            .zip(agent_ids)
            .enumerate()
            .map(|(i, (subtask, agent_id))| Arc::new(Mutex::new(AgentAssignment::new(subtask, i, agent_id))))
            .collect();
        *self.assignments.lock().await = assignments;

        self.lifecycle.lock().await.transition(TaskState::Confirming)?;
        if !self.config.auto_approve {
            let plan = self.render_plan().await;
            if !self.confirmation.confirm(&plan).await {
                self.lifecycle.lock().await.transition(TaskState::Cancelled)?;
                self.save_run_state("cancelled").await;
                return Ok(OrchestratorResult {
                    status: TaskState::Cancelled,
                    subtask_results: Vec::new(),
                    total_cost_tokens: 0,
                    orchestrator_cost_tokens: 0,
                });
            }
        }

        self.save_run_state("spawning").await;

        self.lifecycle.lock().await.transition(TaskState::Spawning)?;
        self.lifecycle.lock().await.transition(TaskState::Running)?;

        let all_assignments = self.assignments.lock().await.clone();
        let results = self.execute_all_subtasks(&all_assignments, &[]).await;
        *self.results.lock().await = results.clone();

        let final_state = if results.iter().all(|r| r.status == SubtaskResultStatus::Completed) {
            TaskState::Completed
        } else {
            TaskState::Done
        };
        self.lifecycle.lock().await.transition(final_state)?;

        let result = self.build_result(results).await;
        self.record_trace(&result).await;
        self.record_agent_stats(&result).await;
        self.save_session_context(&result, &prev_contexts).await;
        self.save_run_state(state_label(result.status)).await;

        Ok(result)
    }

    pub async fn retry_failed(&self) -> Result<OrchestratorResult, OrchestratorError> {
        let state = self.lifecycle.lock().await.state();
        if state != TaskState::Done {
            return Err(OrchestratorError::NotRetryable(state.to_string()));
        }
        self.lifecycle.lock().await.transition(TaskState::Retrying)?;

        let assignments = self.assignments.lock().await.clone();
        let mut failed_assignments = Vec::new();
        for assignment in &assignments {
            let mut guard = assignment.lock().await;
            if guard.lifecycle.state().can_retry() {
                guard.lifecycle.transition(SubtaskState::Retrying)?;
                drop(guard);
                failed_assignments.push(assignment.clone());
            }
        }

        self.lifecycle.lock().await.transition(TaskState::Running)?;
        let prior_results = self.results.lock().await.clone();
        let retry_results = self.execute_all_subtasks(&failed_assignments, &prior_results).await;

        let mut results = self.results.lock().await.clone();
        for retry_result in retry_results {
            if retry_result.index < results.len() {
                results[retry_result.index] = retry_result;
            }
        }
        *self.results.lock().await = results.clone();

        let final_state = if results.iter().all(|r| r.status == SubtaskResultStatus::Completed) {
            TaskState::Completed
        } else {
            TaskState::Done
        };
        self.lifecycle.lock().await.transition(final_state)?;

        Ok(self.build_result(results).await)
    }

    pub async fn resume_run(&self, saved: RunState) -> Result<OrchestratorResult, OrchestratorError> {
        *self.run_started_at.lock().await = Some(std::time::Instant::now());
        *self.user_intent.lock().await = saved.user_intent.clone();

        let mut results = Vec::new();
        let mut assignments = Vec::new();
        let mut to_resume = Vec::new();

        for saved_subtask in &saved.subtasks {
            let mut subtask = Subtask::new(saved_subtask.description.clone(), saved_subtask.region.clone());
            subtask.expected_files = saved_subtask.expected_files.clone();
            subtask.depends_on = saved_subtask.depends_on.clone();

            let status = status_from_str(&saved_subtask.status);
            results.push(SubtaskResult {
                index: saved_subtask.index,
                description: saved_subtask.description.clone(),
                region: saved_subtask.region.clone(),
                agent_id: saved_subtask.agent_id.clone(),
                status,
                agent_output: saved_subtask.agent_output.clone(),
                failure_reason: saved_subtask.failure_reason.clone(),
                suggested_retry: saved_subtask.suggested_retry.clone(),
                cost_tokens: saved_subtask.cost_tokens,
            });

            let assignment = Arc::new(Mutex::new(AgentAssignment::new(
                subtask,
                saved_subtask.index,
                saved_subtask.agent_id.clone(),
            )));
            if matches!(saved_subtask.status.as_str(), "pending" | "running" | "failed" | "partial") {
                to_resume.push(assignment.clone());
            }
            assignments.push(assignment);
        }

        *self.assignments.lock().await = assignments;
        *self.results.lock().await = results.clone();

        if to_resume.is_empty() {
            tracing::info!("no subtasks to resume -- all completed");
            return Ok(self.build_result(results).await);
        }

        tracing::info!(run_id = %saved.run_id, count = to_resume.len(), "resuming run");

        self.lifecycle.lock().await.transition(TaskState::Decomposing)?;
        self.lifecycle.lock().await.transition(TaskState::Confirming)?;
        self.lifecycle.lock().await.transition(TaskState::Spawning)?;
        self.lifecycle.lock().await.transition(TaskState::Running)?;

        let prior_results = results.clone();
        let resume_results = self.execute_all_subtasks(&to_resume, &prior_results).await;
        let mut results = self.results.lock().await.clone();
        for r in resume_results {
            if r.index < results.len() {
                results[r.index] = r;
            }
        }
        *self.results.lock().await = results.clone();

        let final_state = if results.iter().all(|r| r.status == SubtaskResultStatus::Completed) {
            TaskState::Completed
        } else {
            TaskState::Done
        };
        self.lifecycle.lock().await.transition(final_state)?;

        let result = self.build_result(results).await;
        self.record_trace(&result).await;
        self.record_agent_stats(&result).await;
        self.save_run_state(state_label(result.status)).await;
        Ok(result)
    }

    async fn execute_all_subtasks(
        &self,
        assignments: &[Arc<Mutex<AgentAssignment>>],
        prior_results: &[SubtaskResult],
    ) -> Vec<SubtaskResult> {
        let batch_view: Vec<AgentAssignment> = {
            let mut view = Vec::with_capacity(assignments.len());
            for assignment in assignments {
                let guard = assignment.lock().await;
                view.push(AgentAssignment::new(guard.subtask.clone(), guard.subtask_index, guard.agent_id.clone()));
            }
            view
        };

        let worker_ctx = Arc::new(self.worker_context());
        let shared: Arc<Vec<Arc<Mutex<AgentAssignment>>>> = Arc::new(assignments.to_vec());
        let prior: Arc<Vec<SubtaskResult>> = Arc::new(prior_results.to_vec());

        let scheduler = Scheduler::new(self.config.max_agents);
        let worker = move |position: usize| {
            let ctx = worker_ctx.clone();
            let shared = shared.clone();
            let prior = prior.clone();
            async move {
                let assignment = &shared[position];
                let index = assignment.lock().await.subtask_index;
                let prior_result = prior.iter().find(|r| r.index == index);
                subtask_worker::execute_subtask(&ctx, assignment, prior_result).await
            }
        };

        scheduler.run(&batch_view, worker).await
    }

    async fn decompose(
        &self,
        intent: &str,
        workspace_tree: &str,
        symbol_index: &str,
    ) -> Result<Vec<Subtask>, OrchestratorError> {
        let response = self
            .oracles
            .decompose
            .decompose(DecomposeRequest {
                user_intent: intent.to_string(),
                workspace_tree: workspace_tree.to_string(),
                symbol_index: symbol_index.to_string(),
            })
            .await
            .map_err(|reason| OrchestratorError::Oracle { oracle: "decompose", reason })?;

        self.record_orchestrator_cost("TaskDecompose").await;

        let total = response.subtasks.len();
        let mut subtasks = response.subtasks;
        for subtask in &mut subtasks {
            subtask.sanitize_depends_on(total);
        }
        tracing::info!(count = subtasks.len(), reasoning = %response.reasoning, "decomposed user intent");
        Ok(subtasks)
    }

    async fn assign_agents(
        &self,
        subtasks: &[Subtask],
        overrides: &HashMap<String, String>,
    ) -> Result<Vec<String>, OrchestratorError> {
        let available = available_agents();
        let available_json = if available.is_empty() {
            serde_json::to_string(&AGENTS[..3.min(AGENTS.len())].iter().map(|a| (a.id, a.name)).collect::<Vec<_>>())
        } else {
            serde_json::to_string(&available.iter().map(|a| (a.id, a.name)).collect::<Vec<_>>())
        }
        .unwrap_or_else(|_| "[]".to_string());

        let mut assignments = Vec::with_capacity(subtasks.len());
        for subtask in subtasks {
            if let Some(agent_id) = overrides.get(&subtask.region) {
                tracing::info!(agent_id, region = %subtask.region, "using user override");
                assignments.push(agent_id.clone());
                continue;
            }

            let language = detect_language(&subtask.region);
            let task_type = infer_task_type(&subtask.region);
            let stats_summary = self.agent_stats.get_stats_summary(task_type, language);
            let recommendation = self.agent_stats.best_agent_for(task_type, language);

            let mut agents_input = available_json.clone();
            if !stats_summary.is_empty() {
                agents_input = format!("{available_json}\n\n{stats_summary}");
                if let Some(recommended) = &recommendation {
                    agents_input.push_str(&format!("\nRecommended: {recommended} (based on historical performance)"));
                }
            }

            let agent_id = self
                .oracles
                .assign
                .assign(AssignRequest {
                    subtask_description: subtask.description.clone(),
                    subtask_region: subtask.region.clone(),
                    primary_language: language.to_string(),
                    available_agents: agents_input,
                })
                .await
                .map_err(|reason| OrchestratorError::Oracle { oracle: "assign", reason })?;
            self.record_orchestrator_cost("AgentSelect").await;
            assignments.push(agent_id);
        }
        Ok(assignments)
    }

    async fn record_orchestrator_cost(&self, description: &str) {
        self.cost
            .record(CostEntry {
                source: "orchestrator".to_string(),
                tokens_used: 0,
                description: description.to_string(),
                subtask: None,
                region: None,
            })
            .await;
    }

    async fn render_plan(&self) -> String {
        let mut lines = vec!["\nTask Decomposition:\n".to_string()];
        for assignment in self.assignments.lock().await.iter() {
            let guard = assignment.lock().await;
            let agent_name = get_agent(&guard.agent_id).map(|a| a.name).unwrap_or(&guard.agent_id);
            let deps = if guard.subtask.depends_on.is_empty() {
                String::new()
            } else {
                format!(
                    " (depends on: {})",
                    guard.subtask.depends_on.iter().map(|d| (d + 1).to_string()).collect::<Vec<_>>().join(", ")
                )
            };
            lines.push(format!("  Subtask {}: {}{}", guard.subtask_index + 1, guard.subtask.description, deps));
            lines.push(format!("    Region:  {}", guard.subtask.region));
            lines.push(format!("    Agent:   {agent_name}"));
            if !guard.subtask.expected_files.is_empty() {
                lines.push(format!("    Files:   {}", guard.subtask.expected_files.join(", ")));
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }

    async fn build_result(&self, results: Vec<SubtaskResult>) -> OrchestratorResult {
        let status =
            if results.iter().all(|r| r.status == SubtaskResultStatus::Completed) { TaskState::Completed } else { TaskState::Done };
        let summary = self.cost.summary().await;
        let breakdown = self.cost.detailed_breakdown("default").await;
        OrchestratorResult {
            status,
            subtask_results: results,
            total_cost_tokens: summary.total_tokens,
            orchestrator_cost_tokens: breakdown.per_source_tokens.get("orchestrator").copied().unwrap_or(0),
        }
    }

    async fn record_trace(&self, result: &OrchestratorResult) {
        let assignments = self.assignments.lock().await.clone();
        let mut subtask_dicts = Vec::new();
        let mut assignment_dicts = Vec::new();
        for assignment in &assignments {
            let guard = assignment.lock().await;
            subtask_dicts.push(serde_json::json!({
                "description": guard.subtask.description,
                "region": guard.subtask.region,
                "expected_files": guard.subtask.expected_files,
                "depends_on": guard.subtask.depends_on,
            }));
            assignment_dicts.push(serde_json::json!({
                "agent_id": guard.agent_id,
                "subtask_index": guard.subtask_index,
                "language": detect_language(&guard.subtask.region),
            }));
        }

        let duration_ms = self
            .run_started_at
            .lock()
            .await
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or(0);

        let quality = TrainingTrace::quality_from_statuses(
            result.subtask_results.iter().map(|r| r.status == SubtaskResultStatus::Completed),
        );

        let trace = TrainingTrace {
            run_id: self.run_id.clone(),
            user_intent: self.user_intent.lock().await.clone(),
            workspace_summary: self.workspace_tree.lock().await.chars().take(500).collect(),
            subtasks: subtask_dicts,
            assignments: assignment_dicts,
            subtask_results: result
                .subtask_results
                .iter()
                .map(|r| serde_json::to_value(r).unwrap_or(serde_json::Value::Null))
                .collect(),
            duration_ms,
            quality,
            timestamp: 0.0,
        };

        if let Err(e) = self.trace_collector.record_run(trace) {
            tracing::warn!(error = %e, "failed to record training trace");
        }
    }

    async fn record_agent_stats(&self, result: &OrchestratorResult) {
        let assignments = self.assignments.lock().await.clone();
        for (assignment, res) in assignments.iter().zip(result.subtask_results.iter()) {
            let guard = assignment.lock().await;
            let agent_type = guard.agent_id.rsplit_once('-').map(|(base, _)| base).unwrap_or(&guard.agent_id);
            let task_type = infer_task_type(&guard.subtask.region);
            let language = detect_language(&guard.subtask.region);
            if let Err(e) = self.agent_stats.record_outcome(
                agent_type,
                task_type,
                language,
                res.status == SubtaskResultStatus::Completed,
                res.cost_tokens,
                0.0,
            ) {
                tracing::warn!(error = %e, "failed to record agent stats");
            }
        }
    }

    async fn save_session_context(&self, result: &OrchestratorResult, _prev_contexts: &[SessionContext]) {
        let mut modified_files: HashMap<String, Vec<String>> = HashMap::new();
        let mut key_decisions = Vec::new();
        let mut subtask_summaries = Vec::new();

        for r in &result.subtask_results {
            modified_files.entry(r.region.clone()).or_default();
            subtask_summaries.push(serde_json::json!({
                "description": r.description,
                "region": r.region,
                "status": r.status,
                "agent_id": r.agent_id,
            }));
            if r.status == SubtaskResultStatus::Completed {
                key_decisions.push(format!("Completed '{}' in {} using {}", r.description, r.region, r.agent_id));
            }
        }

        let ctx = SessionContext {
            session_id: self.run_id.clone(),
            timestamp: unix_now(),
            user_intent: self.user_intent.lock().await.clone(),
            workspace: self.config.workspace.to_string_lossy().into_owned(),
            modified_files,
            key_decisions,
            resolved_symbols: Vec::new(),
            conflict_resolutions: Vec::new(),
            subtask_summaries,
            status: result.status.to_string(),
        };

        if let Err(e) = self.session_memory.save_session(&ctx) {
            tracing::warn!(error = %e, "failed to save session context");
        }
    }

    async fn save_run_state(&self, state_label: &str) {
        let assignments = self.assignments.lock().await.clone();
        let results = self.results.lock().await.clone();

        let mut saved_subtasks = Vec::with_capacity(assignments.len());
        for assignment in &assignments {
            let guard = assignment.lock().await;
            let result = results.iter().find(|r| r.index == guard.subtask_index);
            saved_subtasks.push(SavedSubtask {
                index: guard.subtask_index,
                description: guard.subtask.description.clone(),
                region: guard.subtask.region.clone(),
                expected_files: guard.subtask.expected_files.clone(),
                depends_on: guard.subtask.depends_on.clone(),
                agent_id: guard.agent_id.clone(),
                status: result.map(|r| r.status.to_string()).unwrap_or_else(|| "pending".to_string()),
                agent_output: result.map(|r| r.agent_output.chars().take(1000).collect()).unwrap_or_default(),
                failure_reason: result.and_then(|r| r.failure_reason.clone()),
                suggested_retry: result.and_then(|r| r.suggested_retry.clone()),
                cost_tokens: result.map(|r| r.cost_tokens).unwrap_or(0),
            });
        }

        let summary = self.cost.summary().await;
        let breakdown = self.cost.detailed_breakdown("default").await;
        let mut run_state = RunState::new(&self.run_id, self.user_intent.lock().await.clone(), self.config.workspace.to_string_lossy());
        run_state.effort = self.config.effort.to_string();
        run_state.auto_approve = self.config.auto_approve;
        run_state.max_agents = self.config.max_agents;
        run_state.state = state_label.to_string();
        run_state.subtasks = saved_subtasks;
        run_state.total_tokens = summary.total_tokens;
        run_state.orchestrator_tokens = breakdown.per_source_tokens.get("orchestrator").copied().unwrap_or(0);

        if let Err(e) = self.run_persistence.save(&mut run_state) {
            tracing::warn!(error = %e, "failed to save run state");
        }
    }
}

fn state_label(state: TaskState) -> &'static str {
    match state {
        TaskState::Completed => "completed",
        _ => "done",
    }
}

fn status_from_str(s: &str) -> SubtaskResultStatus {
    match s {
        "completed" => SubtaskResultStatus::Completed,
        "partial" => SubtaskResultStatus::Partial,
        _ => SubtaskResultStatus::Failed,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

fn unix_now() -> f64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
