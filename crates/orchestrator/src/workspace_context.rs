// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workspace tree / symbol index the decompose oracle is given.
//! Treated as an opaque external dependency — the real implementation is
//! a native parser outside this crate's scope; [`DefaultWorkspaceContext`]
//! is the thin local fallback used when none is supplied.

use crew_storage::symbol_cache::SymbolTreeCache;
use std::path::{Path, PathBuf};

pub trait WorkspaceContext: Send + Sync {
    fn workspace_tree(&self) -> String;
    fn symbol_index(&self) -> String;
}

const SKIPPED_DIRS: &[&str] = &["node_modules", "target", ".venv", "__pycache__", ".git"];

fn list_top_level(root: &Path) -> String {
    let Ok(entries) = std::fs::read_dir(root) else { return "[]".to_string() };
    let mut names: Vec<String> = entries
        .flatten()
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_str()) {
                None
            } else {
                Some(name)
            }
        })
        .collect();
    names.sort();
    serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
}

/// Caches a shallow directory listing as the "workspace tree," and an
/// empty symbol snapshot — a real symbol index is an opaque external
/// dependency this crate never implements.
pub struct DefaultWorkspaceContext {
    workspace: PathBuf,
    cache: SymbolTreeCache,
}

impl DefaultWorkspaceContext {
    pub fn new(workspace: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        Self { cache: SymbolTreeCache::new(workspace.clone(), cache_dir), workspace }
    }
}

impl WorkspaceContext for DefaultWorkspaceContext {
    fn workspace_tree(&self) -> String {
        let workspace = self.workspace.clone();
        self.cache.get_workspace_tree(|| list_top_level(&workspace))
    }

    fn symbol_index(&self) -> String {
        self.cache.get_snapshot(|| "{}".to_string())
    }
}

#[cfg(test)]
#[path = "workspace_context_tests.rs"]
mod tests;
