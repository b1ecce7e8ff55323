// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-region information router (A2A): resolves a symbol reference via
//! the workspace symbol index first, then by querying the owning agent's
//! live session, and finally a progress-guaranteeing fallback string.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// One hit from the external workspace symbol index.
#[derive(Debug, Clone)]
pub struct SymbolMatch {
    pub kind: String,
    pub name: String,
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// The opaque native workspace symbol index (`parse_workspace`/`snapshot`/`lookup_symbol`).
#[async_trait]
pub trait SymbolIndex: Send + Sync {
    async fn lookup_symbol(&self, workspace: &Path, symbol_name: &str) -> Vec<SymbolMatch>;
}

/// Sends a focused one-shot prompt on a live peer session and returns its
/// final streamed text, or `None` if the peer is unreachable or produced
/// only an error update.
#[async_trait]
pub trait PeerQuery: Send + Sync {
    async fn query_peer(&self, agent_id: &str, prompt: &str) -> Option<String>;
}

fn format_match(m: &SymbolMatch) -> String {
    format!("{} {} ({}:{}-{})", m.kind, m.name, m.path, m.start_line, m.end_line)
}

pub struct Router {
    workspace: PathBuf,
    symbol_index: Box<dyn SymbolIndex>,
    peer_query: Box<dyn PeerQuery>,
    regions: Mutex<IndexMap<String, String>>,
    cache: Mutex<IndexMap<String, String>>,
}

impl Router {
    pub fn new(workspace: PathBuf, symbol_index: Box<dyn SymbolIndex>, peer_query: Box<dyn PeerQuery>) -> Self {
        Self { workspace, symbol_index, peer_query, regions: Mutex::new(IndexMap::new()), cache: Mutex::new(IndexMap::new()) }
    }

    /// Register `region_path` as owned by `agent_id`, e.g. `/core` -> `claude-0`.
    pub async fn register_region(&self, region_path: impl Into<String>, agent_id: impl Into<String>) {
        self.regions.lock().await.insert(region_path.into(), agent_id.into());
    }

    /// Drop the region mapping only if it's still owned by `agent_id`.
    pub async fn unregister_region(&self, region_path: &str, agent_id: &str) {
        let mut regions = self.regions.lock().await;
        if regions.get(region_path).map(String::as_str) == Some(agent_id) {
            regions.shift_remove(region_path);
        }
    }

    pub async fn region_count(&self) -> usize {
        self.regions.lock().await.len()
    }

    pub async fn resolve(&self, requesting_agent: &str, symbol_name: &str, context: &str) -> String {
        if let Some(cached) = self.cache.lock().await.get(symbol_name) {
            return cached.clone();
        }

        let matches = self.symbol_index.lookup_symbol(&self.workspace, symbol_name).await;
        if !matches.is_empty() {
            let text = matches.iter().map(format_match).collect::<Vec<_>>().join("\n");
            self.cache.lock().await.insert(symbol_name.to_string(), text.clone());
            return text;
        }

        if let Some(text) = self.resolve_via_peer(requesting_agent, symbol_name, context).await {
            self.cache.lock().await.insert(symbol_name.to_string(), text.clone());
            return text;
        }

        format!("Symbol '{symbol_name}' not found in workspace symbol tree or active agents.")
    }

    async fn resolve_via_peer(&self, requesting_agent: &str, symbol_name: &str, context: &str) -> Option<String> {
        let haystack = format!("{symbol_name} {context}").to_lowercase();
        let mut owners: Vec<String> = {
            let regions = self.regions.lock().await;
            regions
                .iter()
                .filter(|(region_path, _)| haystack.contains(&region_path.trim_start_matches('/').to_lowercase()))
                .map(|(_, owner)| owner.clone())
                .collect()
        };
        owners.dedup();

        let [owner] = owners.as_slice() else { return None };
        if owner == requesting_agent {
            return None;
        }

        let prompt = format!(
            "I need the type signature and brief description of `{symbol_name}`. Context: {context}. \
             Reply with ONLY the signature/definition, no explanation."
        );
        self.peer_query.query_peer(owner, &prompt).await.map(|text| text.trim().to_string())
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
