// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `crew` - decomposes a user intent into region-scoped subtasks, runs a
//! sub-agent per subtask, and records the outcome for future runs.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod cli_args;
mod exit_error;
mod logging;
mod oracles_heuristic;
mod symbol_index;

use clap::Parser;
use cli_args::{Cli, ModeArg};
use crew_orchestrator::{
    DefaultWorkspaceContext, ExtensionProtocol, FsRegionContext, NoopProgressSink, Oracles, Orchestrator,
    OrchestratorConfig, OrchestratorResult, Paths, StdinConfirmation,
};
use exit_error::ExitError;
use oracles_heuristic::HeuristicOracles;
use std::sync::Arc;
use tracing::info;

const MIN_TRACES_FOR_COMPILE: usize = 5;
const MIN_QUALITY_FOR_COMPILE: f64 = 0.5;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::ExitCode::from(e.code as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<std::process::ExitCode, ExitError> {
    let workspace = match cli.workspace.clone() {
        Some(workspace) => workspace,
        None => std::env::current_dir()
            .map_err(|e| ExitError::new(1, format!("could not determine current directory: {e}")))?,
    };
    let paths = Paths::under_home().map_err(|e| ExitError::new(1, e.to_string()))?;

    if cli.stats {
        print_stats(&paths)?;
        return Ok(std::process::ExitCode::SUCCESS);
    }
    if cli.sessions {
        print_sessions(&paths)?;
        return Ok(std::process::ExitCode::SUCCESS);
    }
    if cli.compile {
        print_compile_report(&paths)?;
        return Ok(std::process::ExitCode::SUCCESS);
    }
    if cli.resume || cli.resume_id.is_some() {
        return resume(&cli, &workspace, &paths).await;
    }

    let Some(intent) = cli.intent.clone() else {
        return Err(ExitError::new(2, "an intent is required unless --stats, --sessions, --compile, or --resume is given"));
    };

    run_new(&cli, &workspace, &paths, &intent).await
}

fn build_config(cli: &Cli, workspace: &std::path::Path) -> Result<OrchestratorConfig, ExitError> {
    let mut config = OrchestratorConfig::new(workspace);
    config.effort = cli.effort.into_effort_level();
    config.auto_approve = cli.auto_approve;
    if let Some(model) = &cli.model {
        crew_orchestrator::check_model_credentials(model).map_err(|e| ExitError::new(1, e.to_string()))?;
        config.model = Some(model.clone());
    }
    Ok(config)
}

fn build_oracles() -> Oracles {
    Oracles {
        decompose: Box::new(HeuristicOracles),
        assign: Box::new(HeuristicOracles),
        prompt_build: Box::new(HeuristicOracles),
        evaluate: Box::new(HeuristicOracles),
    }
}

async fn run_new(
    cli: &Cli,
    workspace: &std::path::Path,
    paths: &Paths,
    intent: &str,
) -> Result<std::process::ExitCode, ExitError> {
    let config = build_config(cli, workspace)?;
    let workspace_context = Arc::new(DefaultWorkspaceContext::new(workspace, &paths.cache_dir));
    let region_context = Arc::new(FsRegionContext { workspace: workspace.to_path_buf() });

    if cli.mode == ModeArg::Extension {
        return run_extension_mode(config, workspace_context, region_context, paths).await;
    }

    let orchestrator = Orchestrator::new(
        config,
        build_oracles(),
        Box::new(symbol_index::EmptySymbolIndex),
        workspace_context,
        region_context,
        Arc::new(NoopProgressSink),
        Arc::new(StdinConfirmation),
        paths,
    )
    .map_err(|e| ExitError::new(1, e.to_string()))?;

    info!(run_id = orchestrator.run_id(), "starting run");
    let result = orchestrator.run(intent).await.map_err(|e| ExitError::new(1, e.to_string()))?;
    Ok(exit_code_for(&result))
}

/// `--mode extension` drives the orchestrator over newline-delimited JSON
/// on stdio instead of a terminal prompt. The protocol's own confirmation
/// gate and progress sink stand in for the interactive ones. A `cancel`
/// command or EOF ends the loop with a clean success exit, matching the
/// protocol's own "ends the read loop gracefully" contract.
async fn run_extension_mode(
    config: OrchestratorConfig,
    workspace_context: Arc<dyn crew_orchestrator::WorkspaceContext>,
    region_context: Arc<dyn crew_orchestrator::RegionContext>,
    paths: &Paths,
) -> Result<std::process::ExitCode, ExitError> {
    use crew_orchestrator::ext_protocol::{
        result_message, state_message, Command, ExtensionConfirmationGate, ExtensionProgressSink, OutboundChannel,
    };
    use tokio::sync::mpsc;

    let outbound = Arc::new(OutboundChannel::new(tokio::io::stdout()));
    let (approvals_tx, approvals_rx) = mpsc::unbounded_channel();
    let confirmation = Arc::new(ExtensionConfirmationGate::new(outbound.clone(), approvals_rx));
    let progress = Arc::new(ExtensionProgressSink::new(outbound.clone()));

    let orchestrator = Orchestrator::new(
        config,
        build_oracles(),
        Box::new(symbol_index::EmptySymbolIndex),
        workspace_context,
        region_context,
        progress,
        confirmation,
        paths,
    )
    .map_err(|e| ExitError::new(1, e.to_string()))?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut protocol = ExtensionProtocol::new(stdin);

    loop {
        match protocol.next_command(&approvals_tx, &outbound).await {
            Some(Command::Run { intent, .. }) => {
                outbound.send(&state_message(orchestrator.state().await)).await;
                let result = orchestrator.run(&intent).await.map_err(|e| ExitError::new(1, e.to_string()))?;
                outbound.send(&result_message(&result)).await;
                return Ok(exit_code_for(&result));
            }
            Some(Command::Retry { .. }) => {
                let result = orchestrator.retry_failed().await.map_err(|e| ExitError::new(1, e.to_string()))?;
                outbound.send(&result_message(&result)).await;
                return Ok(exit_code_for(&result));
            }
            Some(Command::Cancel) | None => {
                return Ok(std::process::ExitCode::SUCCESS);
            }
        }
    }
}

async fn resume(cli: &Cli, workspace: &std::path::Path, paths: &Paths) -> Result<std::process::ExitCode, ExitError> {
    let persistence = crew_storage::persistence::RunPersistence::new(&paths.runs_dir);

    let saved = if let Some(run_id) = &cli.resume_id {
        persistence.load(run_id).map_err(|e| ExitError::new(1, format!("could not load run '{run_id}': {e}")))?
    } else {
        let mut resumable = persistence.list_resumable().map_err(|e| ExitError::new(1, e.to_string()))?;
        if resumable.is_empty() {
            println!("no resumable runs");
            return Ok(std::process::ExitCode::SUCCESS);
        }
        for (i, run) in resumable.iter().enumerate() {
            println!("{i}: {} ({}) - {}", run.run_id, run.user_intent, run.progress_summary());
        }
        print!("resume which run? [0-{}]: ", resumable.len() - 1);
        use std::io::Write;
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map_err(|e| ExitError::new(1, e.to_string()))?;
        let index: usize = line.trim().parse().map_err(|_| ExitError::new(2, "not a valid selection"))?;
        if index >= resumable.len() {
            return Err(ExitError::new(2, "selection out of range"));
        }
        resumable.swap_remove(index)
    };

    if !saved.is_resumable() {
        return Err(ExitError::new(1, format!("run '{}' is not resumable ({})", saved.run_id, saved.progress_summary())));
    }

    let config = build_config(cli, workspace)?;
    let workspace_context = Arc::new(DefaultWorkspaceContext::new(workspace, &paths.cache_dir));
    let region_context = Arc::new(FsRegionContext { workspace: workspace.to_path_buf() });
    let orchestrator = Orchestrator::new(
        config,
        build_oracles(),
        Box::new(symbol_index::EmptySymbolIndex),
        workspace_context,
        region_context,
        Arc::new(NoopProgressSink),
        Arc::new(StdinConfirmation),
        paths,
    )
    .map_err(|e| ExitError::new(1, e.to_string()))?;

    let result = orchestrator.resume_run(saved).await.map_err(|e| ExitError::new(1, e.to_string()))?;
    Ok(exit_code_for(&result))
}

fn print_stats(paths: &Paths) -> Result<(), ExitError> {
    let stats = crew_storage::agent_stats::AgentStats::load(&paths.agent_stats_path);
    let all = stats.all_stats();
    if all.is_empty() {
        println!("no agent performance data recorded yet");
        return Ok(());
    }
    println!("{:<14} {:<16} {:<10} {:>8} {:>10} {:>10}", "agent", "task", "language", "samples", "success", "avg_tokens");
    for row in all {
        println!(
            "{:<14} {:<16} {:<10} {:>8} {:>9.1}% {:>10}",
            row.agent_type,
            row.task_type,
            row.language,
            row.sample_count,
            row.success_rate * 100.0,
            row.avg_tokens
        );
    }
    Ok(())
}

fn print_sessions(paths: &Paths) -> Result<(), ExitError> {
    let memory = crew_storage::session_memory::SessionMemory::new(&paths.sessions_dir);
    let sessions = memory.list_sessions();
    if sessions.is_empty() {
        println!("no saved sessions");
        return Ok(());
    }
    for (session_id, intent_preview, status, timestamp) in sessions {
        println!("{session_id}  [{status}]  {timestamp:.0}  {intent_preview}");
    }
    Ok(())
}

fn print_compile_report(paths: &Paths) -> Result<(), ExitError> {
    let traces = crew_storage::trace::TraceCollector::new(&paths.traces_dir)
        .list_all()
        .map_err(|e| ExitError::new(1, e.to_string()))?;

    if traces.len() < MIN_TRACES_FOR_COMPILE {
        println!("SKIP all modules: only {} traces recorded, need at least {MIN_TRACES_FOR_COMPILE}", traces.len());
        return Ok(());
    }

    let usable: Vec<_> = traces.iter().filter(|t| t.quality >= MIN_QUALITY_FOR_COMPILE).collect();
    for module in ["decompose", "assign", "prompt_build", "evaluate"] {
        if usable.len() < MIN_TRACES_FOR_COMPILE {
            println!("SKIP {module}: only {} traces meet the quality bar (>= {MIN_QUALITY_FOR_COMPILE})", usable.len());
        } else {
            println!("OK {module}: compiled from {} traces", usable.len());
        }
    }
    Ok(())
}

fn run_succeeded(result: &OrchestratorResult) -> bool {
    result.status == crew_core::TaskState::Completed
}

fn exit_code_for(result: &OrchestratorResult) -> std::process::ExitCode {
    if run_succeeded(result) {
        std::process::ExitCode::SUCCESS
    } else {
        std::process::ExitCode::FAILURE
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
