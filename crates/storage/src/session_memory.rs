// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-session context handoff: persists context from completed
//! orchestration sessions and retrieves relevant context for a related
//! follow-up task, so agents can build on prior work instead of
//! starting cold.

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub timestamp: f64,
    pub user_intent: String,
    pub workspace: String,
    #[serde(default)]
    pub modified_files: std::collections::HashMap<String, Vec<String>>,
    #[serde(default)]
    pub key_decisions: Vec<String>,
    #[serde(default)]
    pub resolved_symbols: Vec<String>,
    #[serde(default)]
    pub conflict_resolutions: Vec<String>,
    #[serde(default)]
    pub subtask_summaries: Vec<Value>,
    #[serde(default)]
    pub status: String,
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Jaccard similarity between lowercased word sets.
fn text_similarity(a: &str, b: &str) -> f64 {
    let words_a = word_set(a);
    let words_b = word_set(b);
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f64 / union as f64
}

pub struct SessionMemory {
    sessions_dir: PathBuf,
}

impl SessionMemory {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self { sessions_dir: sessions_dir.into() }
    }

    pub fn with_default_dir() -> Result<Self, StorageError> {
        let home = dirs::home_dir().ok_or(StorageError::NoDataDir)?;
        Ok(Self::new(home.join(".eisen").join("sessions")))
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.sessions_dir.join(format!("sess_{session_id}.json"))
    }

    pub fn save_session(&self, context: &SessionContext) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.sessions_dir)?;
        let path = self.path_for(&context.session_id);
        let json = serde_json::to_string_pretty(context)
            .map_err(|source| StorageError::Decode { path: path.display().to_string(), source })?;
        std::fs::write(&path, json)?;
        tracing::info!(session_id = %context.session_id, path = %path.display(), "saved session context");
        Ok(())
    }

    /// Returns `None` rather than an error when the session doesn't exist
    /// or its file is corrupt, matching the original's best-effort lookup.
    pub fn load_session(&self, session_id: &str) -> Option<SessionContext> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return None;
        }
        match load_context(&path) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "failed to load session");
                None
            }
        }
    }

    /// Sessions from the same workspace, scored by intent similarity,
    /// above `min_similarity`, most-relevant-first (ties broken by recency).
    pub fn load_relevant_context(&self, user_intent: &str, workspace: &str, min_similarity: f64, max_results: usize) -> Vec<SessionContext> {
        if !self.sessions_dir.exists() {
            return Vec::new();
        }
        let mut scored: Vec<(f64, SessionContext)> = Vec::new();
        let entries = match std::fs::read_dir(&self.sessions_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read sessions directory");
                return Vec::new();
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_session_file(&path) {
                continue;
            }
            match load_context(&path) {
                Ok(ctx) => {
                    if ctx.workspace != workspace {
                        continue;
                    }
                    let similarity = text_similarity(user_intent, &ctx.user_intent);
                    if similarity >= min_similarity {
                        scored.push((similarity, ctx));
                    }
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to read session"),
            }
        }
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.timestamp.partial_cmp(&a.1.timestamp).unwrap_or(std::cmp::Ordering::Equal))
        });
        scored.into_iter().take(max_results).map(|(_, ctx)| ctx).collect()
    }

    /// Augments a sub-agent prompt with a summary of prior related work.
    pub fn inject_into_prompt(&self, contexts: &[SessionContext], prompt: &str) -> String {
        if contexts.is_empty() {
            return prompt.to_string();
        }

        let mut injection_parts = Vec::new();
        for ctx in contexts {
            let mut parts = vec![format!("Previous related work ('{}'):", truncate(&ctx.user_intent, 80))];

            for (region, files) in &ctx.modified_files {
                let mut files_str = files.iter().take(5).cloned().collect::<Vec<_>>().join(", ");
                if files.len() > 5 {
                    files_str.push_str(&format!(" (+{} more)", files.len() - 5));
                }
                parts.push(format!("  Region {region}: modified {files_str}"));
            }

            if !ctx.key_decisions.is_empty() {
                parts.push("  Key decisions:".to_string());
                for decision in ctx.key_decisions.iter().take(3) {
                    parts.push(format!("    - {decision}"));
                }
            }

            if !ctx.resolved_symbols.is_empty() {
                let symbols_str = ctx.resolved_symbols.iter().take(5).cloned().collect::<Vec<_>>().join(", ");
                parts.push(format!("  Resolved symbols: {symbols_str}"));
            }

            injection_parts.push(parts.join("\n"));
        }

        let injection = injection_parts.join("\n\n");
        format!("CONTEXT FROM PREVIOUS SESSIONS:\n{injection}\n\nConsider the above when implementing your changes.\n\n{prompt}")
    }

    /// `(session_id, intent_preview, status, timestamp)`, in directory order.
    pub fn list_sessions(&self) -> Vec<(String, String, String, f64)> {
        let mut sessions = Vec::new();
        let Ok(mut entries) = std::fs::read_dir(&self.sessions_dir).map(|e| e.flatten().collect::<Vec<_>>()) else {
            return sessions;
        };
        entries.sort_by_key(|e| e.path());
        for entry in entries {
            let path = entry.path();
            if !is_session_file(&path) {
                continue;
            }
            if let Ok(ctx) = load_context(&path) {
                sessions.push((ctx.session_id.clone(), truncate(&ctx.user_intent, 60), ctx.status.clone(), ctx.timestamp));
            }
        }
        sessions
    }

    /// Deletes all session files, returning the count deleted.
    pub fn clear(&self) -> usize {
        let Ok(entries) = std::fs::read_dir(&self.sessions_dir) else {
            return 0;
        };
        let mut count = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if is_session_file(&path) && std::fs::remove_file(&path).is_ok() {
                count += 1;
            }
        }
        count
    }
}

fn is_session_file(path: &Path) -> bool {
    path.file_stem().and_then(|s| s.to_str()).is_some_and(|s| s.starts_with("sess_")) && path.extension().and_then(|e| e.to_str()) == Some("json")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

fn load_context(path: &Path) -> Result<SessionContext, StorageError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|source| StorageError::Decode { path: path.display().to_string(), source })
}

#[cfg(test)]
#[path = "session_memory_tests.rs"]
mod tests;
