// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestration run configuration: effort level, agent concurrency,
//! model selection, and the credential checks that must pass before any
//! sub-agent process is spawned.

use crate::error::OrchestratorError;
use crew_engine::scheduler::DEFAULT_MAX_AGENTS;
use std::path::PathBuf;

/// How deeply the region context builder (`subtask_worker` step 3)
/// inspects a subtask's region before handing it to the prompt-build oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffortLevel {
    Low,
    Medium,
    High,
}

impl EffortLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EffortLevel::Low => "low",
            EffortLevel::Medium => "medium",
            EffortLevel::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(EffortLevel::Low),
            "medium" => Some(EffortLevel::Medium),
            "high" => Some(EffortLevel::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for EffortLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for EffortLevel {
    fn default() -> Self {
        EffortLevel::Medium
    }
}

pub struct OrchestratorConfig {
    pub workspace: PathBuf,
    pub effort: EffortLevel,
    pub auto_approve: bool,
    pub max_agents: usize,
    /// `"<provider>/<name>"`, e.g. `"anthropic/claude-sonnet-4"`. `None` defers
    /// to whatever the oracle implementation's own default is.
    pub model: Option<String>,
    /// The file-access proxy binary, spawned as the immediate child of
    /// every sub-agent session. Defaults to `eisen-core` on `PATH`.
    pub proxy: String,
}

impl OrchestratorConfig {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            effort: EffortLevel::default(),
            auto_approve: false,
            max_agents: DEFAULT_MAX_AGENTS,
            model: None,
            proxy: "eisen-core".to_string(),
        }
    }

    crew_core::setters! {
        set { effort: EffortLevel, auto_approve: bool, max_agents: usize }
        into { proxy: String }
        option { model: String }
    }
}

/// One supported remote LLM provider and the env var that holds its credential.
struct ProviderCredential {
    provider: &'static str,
    env_vars: &'static [&'static str],
}

const PROVIDER_CREDENTIALS: &[ProviderCredential] = &[
    ProviderCredential { provider: "anthropic", env_vars: &["ANTHROPIC_API_KEY"] },
    ProviderCredential { provider: "openai", env_vars: &["OPENAI_API_KEY"] },
    ProviderCredential { provider: "google", env_vars: &["GOOGLE_API_KEY", "GEMINI_API_KEY"] },
    ProviderCredential { provider: "groq", env_vars: &["GROQ_API_KEY"] },
    ProviderCredential { provider: "mistral", env_vars: &["MISTRAL_API_KEY"] },
];

/// Validates a `"<provider>/<name>"` model string against the env-var
/// credential it needs, before any subprocess is spawned. `ollama/...` is
/// exempt — local inference, no API key required.
pub fn check_model_credentials(model: &str) -> Result<(), OrchestratorError> {
    let (provider, _name) = model.split_once('/').ok_or_else(|| {
        OrchestratorError::Configuration(format!(
            "model string '{model}' is not in '<provider>/<name>' format"
        ))
    })?;

    if provider == "ollama" {
        return Ok(());
    }

    let Some(cred) = PROVIDER_CREDENTIALS.iter().find(|c| c.provider == provider) else {
        return Err(OrchestratorError::Configuration(format!(
            "unrecognised model provider '{provider}' in '{model}'"
        )));
    };

    let has_credential = cred.env_vars.iter().any(|var| {
        std::env::var(var).map(|v| !v.is_empty()).unwrap_or(false)
    });
    if has_credential {
        return Ok(());
    }

    Err(OrchestratorError::Configuration(format!(
        "missing credential for provider '{provider}': set {}",
        cred.env_vars.join(" or ")
    )))
}

/// `EISEN_AGENT_MODEL`, if set, as the run's default model string.
pub fn default_model_from_env() -> Option<String> {
    std::env::var("EISEN_AGENT_MODEL").ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
