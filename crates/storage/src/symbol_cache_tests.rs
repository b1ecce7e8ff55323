// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::cell::Cell;
use tempfile::TempDir;

#[test]
fn first_call_is_always_a_miss_and_reparses() {
    let workspace = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    std::fs::write(workspace.path().join("a.rs"), "fn a() {}").unwrap();
    let cache = SymbolTreeCache::new(workspace.path(), cache_dir.path());

    let calls = Cell::new(0);
    let tree = cache.get_workspace_tree(|| {
        calls.set(calls.get() + 1);
        "{\"tree\":1}".to_string()
    });

    assert_eq!(tree, "{\"tree\":1}");
    assert_eq!(calls.get(), 1);
}

#[test]
fn second_call_without_changes_hits_in_memory_cache() {
    let workspace = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    std::fs::write(workspace.path().join("a.rs"), "fn a() {}").unwrap();
    let cache = SymbolTreeCache::new(workspace.path(), cache_dir.path());

    let calls = Cell::new(0);
    let parse = || {
        calls.set(calls.get() + 1);
        "{\"tree\":1}".to_string()
    };
    cache.get_workspace_tree(parse);
    cache.get_workspace_tree(parse);

    assert_eq!(calls.get(), 1);
}

#[test]
fn modifying_a_tracked_file_invalidates_the_cache() {
    let workspace = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let tracked = workspace.path().join("a.rs");
    std::fs::write(&tracked, "fn a() {}").unwrap();
    let cache = SymbolTreeCache::new(workspace.path(), cache_dir.path());

    let calls = Cell::new(0);
    cache.get_workspace_tree(|| {
        calls.set(calls.get() + 1);
        "{\"v\":1}".to_string()
    });

    // Bump the mtime forward enough that filesystems with coarse
    // timestamp resolution still observe the change.
    let future = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
    let file = std::fs::OpenOptions::new().write(true).open(&tracked).unwrap();
    file.set_modified(future).unwrap();

    let tree = cache.get_workspace_tree(|| {
        calls.set(calls.get() + 1);
        "{\"v\":2}".to_string()
    });

    assert_eq!(tree, "{\"v\":2}");
    assert_eq!(calls.get(), 2);
}

#[test]
fn explicit_invalidate_forces_a_reparse() {
    let workspace = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    std::fs::write(workspace.path().join("a.rs"), "fn a() {}").unwrap();
    let cache = SymbolTreeCache::new(workspace.path(), cache_dir.path());

    let calls = Cell::new(0);
    let parse = || {
        calls.set(calls.get() + 1);
        "{}".to_string()
    };
    cache.get_workspace_tree(parse);
    cache.invalidate();
    cache.get_workspace_tree(parse);

    assert_eq!(calls.get(), 2);
}

#[test]
fn fresh_instance_has_no_tracked_mtimes_so_it_always_reparses() {
    // A fresh cache starts with no recorded mtimes, so staleness checks
    // never have anything to compare against and the disk cache (written
    // by a prior instance) goes unused until this instance records its
    // own mtimes via a first reparse.
    let workspace = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    std::fs::write(workspace.path().join("a.rs"), "fn a() {}").unwrap();

    {
        let cache = SymbolTreeCache::new(workspace.path(), cache_dir.path());
        cache.get_workspace_tree(|| "{\"from\":\"disk\"}".to_string());
    }

    let cache = SymbolTreeCache::new(workspace.path(), cache_dir.path());
    let calls = Cell::new(0);
    let tree = cache.get_workspace_tree(|| {
        calls.set(calls.get() + 1);
        "{\"from\":\"reparse\"}".to_string()
    });

    assert_eq!(tree, "{\"from\":\"reparse\"}");
    assert_eq!(calls.get(), 1);
}

#[test]
fn startup_timer_summary_includes_marks_and_total() {
    let timer = StartupTimer::new();
    timer.mark("load config");
    timer.mark("spawn agents");

    let summary = timer.summary();
    assert!(summary.contains("Startup timing:"));
    assert!(summary.contains("load config:"));
    assert!(summary.contains("spawn agents:"));
    assert!(summary.contains("Total:"));
}
