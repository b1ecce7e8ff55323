// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared zone configuration: glob patterns every spawned session may
//! access regardless of its assigned region.

use serde::Deserialize;
use std::path::Path;

/// Default shared zones -- accessible by all agents regardless of region.
/// These cover the most common project-level config files and shared dirs.
pub static DEFAULT_SHARED_ZONES: &[&str] = &[
    "package.json",
    "package-lock.json",
    "tsconfig.json",
    "tsconfig.*.json",
    "Cargo.toml",
    "Cargo.lock",
    "*.config.js",
    "*.config.ts",
    "*.config.mjs",
    "*.config.cjs",
    ".env.example",
    "types/**",
    "shared/**",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "requirements.txt",
    ".gitignore",
];

#[derive(Debug, Default, Deserialize)]
struct RawZoneFile {
    #[serde(default)]
    shared_zones: Option<serde_json::Value>,
    #[serde(default = "default_true")]
    use_default_shared_zones: bool,
}

fn default_true() -> bool {
    true
}

/// Combines the built-in defaults with user-provided overrides from a
/// workspace's `.eisen/config.json`.
#[derive(Debug, Clone, Default)]
pub struct SharedZoneConfig {
    pub custom_patterns: Vec<String>,
    pub use_defaults: bool,
}

impl SharedZoneConfig {
    pub fn all_patterns(&self) -> Vec<String> {
        let mut patterns = Vec::new();
        if self.use_defaults {
            patterns.extend(DEFAULT_SHARED_ZONES.iter().map(|s| s.to_string()));
        }
        patterns.extend(self.custom_patterns.iter().cloned());
        patterns
    }

    /// Load shared zone config from `<workspace>/.eisen/config.json` if it
    /// exists. A non-list `shared_zones` value is ignored with a warning
    /// rather than failing the run.
    pub fn from_workspace(workspace: &Path) -> Self {
        let config_path = workspace.join(".eisen").join("config.json");
        let Ok(contents) = std::fs::read_to_string(&config_path) else {
            return Self { custom_patterns: Vec::new(), use_defaults: true };
        };

        let raw: RawZoneFile = match serde_json::from_str(&contents) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "failed to parse shared zone config");
                return Self { custom_patterns: Vec::new(), use_defaults: true };
            }
        };

        let custom_patterns = match raw.shared_zones {
            Some(serde_json::Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(_) => {
                tracing::warn!(path = %config_path.display(), "shared_zones is not a list, ignoring");
                Vec::new()
            }
            None => Vec::new(),
        };

        tracing::info!(
            path = %config_path.display(),
            custom = custom_patterns.len(),
            defaults = raw.use_default_shared_zones,
            "loaded shared zone config"
        );

        Self { custom_patterns, use_defaults: raw.use_default_shared_zones }
    }
}

#[cfg(test)]
#[path = "zones_tests.rs"]
mod tests;
