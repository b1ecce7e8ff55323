// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level argument surface for the `crew` binary.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum EffortArg {
    Low,
    Medium,
    High,
}

impl EffortArg {
    pub fn into_effort_level(self) -> crew_orchestrator::EffortLevel {
        match self {
            EffortArg::Low => crew_orchestrator::EffortLevel::Low,
            EffortArg::Medium => crew_orchestrator::EffortLevel::Medium,
            EffortArg::High => crew_orchestrator::EffortLevel::High,
        }
    }
}

impl std::fmt::Display for EffortArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EffortArg::Low => "low",
            EffortArg::Medium => "medium",
            EffortArg::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum ModeArg {
    Interactive,
    Extension,
}

impl std::fmt::Display for ModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModeArg::Interactive => "interactive",
            ModeArg::Extension => "extension",
        };
        f.write_str(s)
    }
}

#[derive(Parser, Debug)]
#[command(name = "crew", version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")))]
pub struct Cli {
    /// What to build, fix, or change. Required unless one of the
    /// informational flags below is given instead.
    pub intent: Option<String>,

    /// Workspace root to operate in. Defaults to the current directory.
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// How deeply to inspect each subtask's region before prompting.
    #[arg(long, value_enum, default_value_t = EffortArg::Medium)]
    pub effort: EffortArg,

    /// Skip the plan confirmation prompt and proceed automatically.
    #[arg(long)]
    pub auto_approve: bool,

    /// `<provider>/<name>` model override, e.g. `anthropic/claude-sonnet-4`.
    #[arg(long)]
    pub model: Option<String>,

    /// Drive the orchestrator over newline-delimited JSON on stdio
    /// instead of an interactive terminal prompt.
    #[arg(long, value_enum, default_value_t = ModeArg::Interactive)]
    pub mode: ModeArg,

    /// Emit debug-level tracing output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Run the offline oracle-compilation pass over collected traces and exit.
    #[arg(long)]
    pub compile: bool,

    /// List resumable runs and prompt for one to resume.
    #[arg(long)]
    pub resume: bool,

    /// Resume a specific run by id, skipping the prompt.
    #[arg(long)]
    pub resume_id: Option<String>,

    /// Print learned per-agent performance stats and exit.
    #[arg(long)]
    pub stats: bool,

    /// Print saved cross-session memory and exit.
    #[arg(long)]
    pub sessions: bool,
}

#[cfg(test)]
#[path = "cli_args_tests.rs"]
mod tests;
