// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static table of known sub-agent profiles and an availability probe.
//!
//! Mirrors the host editor extension's own agent list so that a region
//! assignment made by this core lines up with what the extension can
//! actually spawn.

use serde::{Deserialize, Serialize};

/// One known sub-agent's spawn profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub command: &'static str,
    pub args: &'static [&'static str],
}

/// The static registry, mirroring `extension/src/acp/agents.ts`.
pub static AGENTS: &[AgentConfig] = &[
    AgentConfig { id: "opencode", name: "OpenCode", command: "opencode", args: &["acp"] },
    AgentConfig {
        id: "claude-code",
        name: "Claude Code",
        command: "npx",
        args: &["@zed-industries/claude-code-acp"],
    },
    AgentConfig {
        id: "codex",
        name: "Codex CLI",
        command: "npx",
        args: &["@zed-industries/codex-acp"],
    },
    AgentConfig { id: "gemini", name: "Gemini CLI", command: "gemini", args: &["--experimental-acp"] },
    AgentConfig { id: "goose", name: "Goose", command: "goose", args: &["acp"] },
    AgentConfig { id: "amp", name: "Amp", command: "amp", args: &["acp"] },
    AgentConfig { id: "aider", name: "Aider", command: "aider", args: &["--acp"] },
];

/// Look up a known agent by its canonical id.
pub fn get_agent(agent_id: &str) -> Option<&'static AgentConfig> {
    AGENTS.iter().find(|a| a.id == agent_id)
}

/// Return the subset of [`AGENTS`] whose command resolves on `PATH`.
pub fn available_agents() -> Vec<&'static AgentConfig> {
    AGENTS.iter().filter(|a| which(a.command)).collect()
}

pub fn is_agent_available(agent_id: &str) -> bool {
    get_agent(agent_id).is_some_and(|a| which(a.command))
}

/// Resolve a short/fuzzy user-typed name (e.g. `"claude"`) to a canonical
/// agent id, for override parsing. Returns `None` for unknown names.
pub fn resolve_agent_name(name: &str) -> Option<&'static str> {
    let lower = name.trim().to_ascii_lowercase();
    match lower.as_str() {
        "claude" | "claude-code" => Some("claude-code"),
        "opencode" => Some("opencode"),
        "codex" => Some("codex"),
        "gemini" => Some("gemini"),
        "goose" => Some("goose"),
        "amp" => Some("amp"),
        "aider" => Some("aider"),
        _ => None,
    }
}

fn which(command: &str) -> bool {
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| dir.join(command).is_file())
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
