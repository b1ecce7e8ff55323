// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;
use std::sync::Mutex as StdMutex;

struct FakeSymbolIndex {
    matches: Vec<SymbolMatch>,
}

#[async_trait]
impl SymbolIndex for FakeSymbolIndex {
    async fn lookup_symbol(&self, _workspace: &Path, _symbol_name: &str) -> Vec<SymbolMatch> {
        self.matches.clone()
    }
}

struct FakePeerQuery {
    response: Option<String>,
    calls: StdMutex<Vec<(String, String)>>,
}

#[async_trait]
impl PeerQuery for FakePeerQuery {
    async fn query_peer(&self, agent_id: &str, prompt: &str) -> Option<String> {
        self.calls.lock().unwrap().push((agent_id.to_string(), prompt.to_string()));
        self.response.clone()
    }
}

fn router(matches: Vec<SymbolMatch>, peer_response: Option<String>) -> (Router, &'static str) {
    let symbol_index = Box::new(FakeSymbolIndex { matches });
    let peer_query = Box::new(FakePeerQuery { response: peer_response, calls: StdMutex::new(Vec::new()) });
    (Router::new(PathBuf::from("/workspace"), symbol_index, peer_query), "placeholder")
}

#[tokio::test]
async fn symbol_index_hit_short_circuits_peer_query() {
    let (router, _) = router(
        vec![SymbolMatch { kind: "fn".into(), name: "auth".into(), path: "/core/auth.rs".into(), start_line: 1, end_line: 10 }],
        None,
    );
    let result = router.resolve("claude-0", "auth", "ctx").await;
    assert_eq!(result, "fn auth (/core/auth.rs:1-10)");
}

#[tokio::test]
async fn cache_hit_returns_byte_equal_text() {
    let (router, _) = router(
        vec![SymbolMatch { kind: "fn".into(), name: "auth".into(), path: "/core/auth.rs".into(), start_line: 1, end_line: 10 }],
        None,
    );
    let first = router.resolve("claude-0", "auth", "ctx").await;
    let second = router.resolve("claude-0", "auth", "ctx").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn single_owner_match_is_queried_and_not_the_requester() {
    let (router, _) = router(vec![], Some("fn auth(token: &str) -> bool".to_string()));
    router.register_region("/core", "codex-1").await;
    let result = router.resolve("claude-0", "auth", "Blocked read access to /core/auth.rs").await;
    assert_eq!(result, "fn auth(token: &str) -> bool");
}

#[tokio::test]
async fn requester_owning_the_only_region_is_not_queried() {
    let (router, _) = router(vec![], Some("should not appear".to_string()));
    router.register_region("/core", "claude-0").await;
    let result = router.resolve("claude-0", "auth", "Blocked read access to /core/auth.rs").await;
    assert_eq!(result, "Symbol 'auth' not found in workspace symbol tree or active agents.");
}

#[tokio::test]
async fn multiple_owner_matches_fall_back() {
    let (router, _) = router(vec![], Some("irrelevant".to_string()));
    router.register_region("/core", "codex-1").await;
    router.register_region("/coreutils", "gemini-2").await;
    let result = router.resolve("claude-0", "sym", "touches both core and coreutils modules").await;
    assert_eq!(result, "Symbol 'sym' not found in workspace symbol tree or active agents.");
}

#[tokio::test]
async fn no_match_anywhere_yields_fallback_text() {
    let (router, _) = router(vec![], None);
    let result = router.resolve("claude-0", "mystery", "ctx").await;
    assert_eq!(result, "Symbol 'mystery' not found in workspace symbol tree or active agents.");
}

#[tokio::test]
async fn unregister_region_is_a_noop_when_not_owned_by_caller() {
    let (router, _) = router(vec![], None);
    router.register_region("/core", "codex-1").await;
    router.unregister_region("/core", "someone-else").await;
    assert_eq!(router.region_count().await, 1);
    router.unregister_region("/core", "codex-1").await;
    assert_eq!(router.region_count().await, 0);
}
