// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token/cost bookkeeping for the run as a whole and for the A2A router's
//! cache-hit savings specifically.

use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// `"orchestrator"`, `"a2a_router"`, or an agent id.
#[derive(Debug, Clone, Serialize)]
pub struct CostEntry {
    pub source: String,
    pub tokens_used: u64,
    pub description: String,
    pub subtask: Option<usize>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct A2aStats {
    pub symbol_tree_hits: u64,
    pub agent_queries: u64,
    pub agent_query_tokens: u64,
    pub total_resolutions: u64,
}

impl A2aStats {
    /// A free cache hit is assumed to have avoided reading a ~3000-token file.
    pub fn tokens_saved_estimate(&self) -> u64 {
        self.symbol_tree_hits * 3000
    }
}

fn cost_rate_per_million_usd(model_family: &str) -> f64 {
    match model_family {
        "claude" => 15.0,
        "gpt-4" => 30.0,
        "gemini" => 7.0,
        _ => 10.0, // default
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CostSummary {
    pub total_tokens: u64,
    pub total_entries: usize,
    pub a2a_resolutions: u64,
    pub tokens_saved_estimate: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedBreakdown {
    pub per_source_tokens: HashMap<String, u64>,
    pub a2a: A2aStats,
    pub estimated_usd: f64,
}

#[derive(Default)]
pub struct CostTracker {
    entries: Mutex<Vec<CostEntry>>,
    a2a: Mutex<A2aStats>,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, entry: CostEntry) {
        self.entries.lock().await.push(entry);
    }

    pub async fn record_symbol_tree_hit(&self) {
        let mut a2a = self.a2a.lock().await;
        a2a.symbol_tree_hits += 1;
        a2a.total_resolutions += 1;
    }

    pub async fn record_agent_query(&self, tokens: u64) {
        let mut a2a = self.a2a.lock().await;
        a2a.agent_queries += 1;
        a2a.agent_query_tokens += tokens;
        a2a.total_resolutions += 1;
        drop(a2a);
        self.record(CostEntry {
            source: "a2a_router".to_string(),
            tokens_used: tokens,
            description: "cross-region agent query".to_string(),
            subtask: None,
            region: None,
        })
        .await;
    }

    pub async fn summary(&self) -> CostSummary {
        let entries = self.entries.lock().await;
        let a2a = self.a2a.lock().await;
        CostSummary {
            total_tokens: entries.iter().map(|e| e.tokens_used).sum(),
            total_entries: entries.len(),
            a2a_resolutions: a2a.total_resolutions,
            tokens_saved_estimate: a2a.tokens_saved_estimate(),
        }
    }

    pub async fn detailed_breakdown(&self, model_family: &str) -> DetailedBreakdown {
        let entries = self.entries.lock().await;
        let a2a = self.a2a.lock().await;
        let mut per_source_tokens: HashMap<String, u64> = HashMap::new();
        for entry in entries.iter() {
            *per_source_tokens.entry(entry.source.clone()).or_insert(0) += entry.tokens_used;
        }
        let total_tokens: u64 = entries.iter().map(|e| e.tokens_used).sum();
        let estimated_usd = (total_tokens as f64 / 1_000_000.0) * cost_rate_per_million_usd(model_family);
        DetailedBreakdown { per_source_tokens, a2a: a2a.clone(), estimated_usd }
    }

    pub async fn format_dashboard(&self, model_family: &str) -> String {
        let breakdown = self.detailed_breakdown(model_family).await;
        let mut lines = vec!["Source               Tokens".to_string(), "-------------------- ------".to_string()];
        let mut sources: Vec<_> = breakdown.per_source_tokens.iter().collect();
        sources.sort_by(|a, b| a.0.cmp(b.0));
        for (source, tokens) in sources {
            lines.push(format!("{source:<20} {tokens:>6}"));
        }
        lines.push(String::new());
        lines.push(format!(
            "A2A: {} symbol-tree hits, {} agent queries ({} tokens), ~{} tokens saved",
            breakdown.a2a.symbol_tree_hits,
            breakdown.a2a.agent_queries,
            breakdown.a2a.agent_query_tokens,
            breakdown.a2a.tokens_saved_estimate()
        ));
        lines.push(format!("Estimated cost: ${:.4}", breakdown.estimated_usd));
        lines.join("\n")
    }
}

#[cfg(test)]
#[path = "cost_tests.rs"]
mod tests;
