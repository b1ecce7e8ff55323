// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn workspace_tree_lists_top_level_entries_sorted() {
    let workspace = tempdir().unwrap();
    std::fs::create_dir_all(workspace.path().join("ui")).unwrap();
    std::fs::create_dir_all(workspace.path().join("core")).unwrap();
    std::fs::create_dir_all(workspace.path().join("target")).unwrap();
    std::fs::create_dir_all(workspace.path().join(".git")).unwrap();

    let cache_dir = tempdir().unwrap();
    let ctx = DefaultWorkspaceContext::new(workspace.path(), cache_dir.path());
    let tree: Vec<String> = serde_json::from_str(&ctx.workspace_tree()).unwrap();

    assert_eq!(tree, vec!["core".to_string(), "ui".to_string()]);
}

#[test]
fn symbol_index_defaults_to_an_empty_object() {
    let workspace = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let ctx = DefaultWorkspaceContext::new(workspace.path(), cache_dir.path());
    assert_eq!(ctx.symbol_index(), "{}");
}
