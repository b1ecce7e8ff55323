// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Symbol tree / snapshot caching and startup timing. The workspace
//! parse that backs `SymbolTreeCache` is expensive (walks every file),
//! so callers hand in a reparse closure and this cache decides whether
//! it's actually needed.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Instant, SystemTime};

const STALENESS_SAMPLE_LIMIT: usize = 50;
const TRACKED_FILE_LIMIT: usize = 500;
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", ".venv", "__pycache__"];

struct CacheState {
    tree_json: Option<String>,
    snapshot_json: Option<String>,
    mtimes: std::collections::HashMap<PathBuf, SystemTime>,
}

impl CacheState {
    fn empty() -> Self {
        Self { tree_json: None, snapshot_json: None, mtimes: std::collections::HashMap::new() }
    }
}

/// Caches a workspace's parsed symbol tree and snapshot, invalidating
/// itself once any sampled tracked file's mtime has moved.
pub struct SymbolTreeCache {
    workspace: PathBuf,
    cache_dir: PathBuf,
    state: Mutex<CacheState>,
}

impl SymbolTreeCache {
    pub fn new(workspace: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self { workspace: workspace.into(), cache_dir: cache_dir.into(), state: Mutex::new(CacheState::empty()) }
    }

    pub fn with_default_dir(workspace: impl Into<PathBuf>) -> Option<Self> {
        let home = dirs::home_dir()?;
        Some(Self::new(workspace, home.join(".eisen").join("cache")))
    }

    /// Returns the cached tree, reparsing via `reparse` only if stale
    /// (and the disk cache, if present, is also stale).
    pub fn get_workspace_tree(&self, reparse: impl FnOnce() -> String) -> String {
        self.get_or_reparse("symbol_tree.json", |s| s.tree_json.clone(), |s, v| s.tree_json = Some(v), reparse)
    }

    pub fn get_snapshot(&self, reparse: impl FnOnce() -> String) -> String {
        self.get_or_reparse("snapshot.json", |s| s.snapshot_json.clone(), |s, v| s.snapshot_json = Some(v), reparse)
    }

    fn get_or_reparse(
        &self,
        disk_filename: &str,
        read: impl Fn(&CacheState) -> Option<String>,
        write: impl Fn(&mut CacheState, String),
        reparse: impl FnOnce() -> String,
    ) -> String {
        {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = read(&state) {
                if !self.is_stale(&state) {
                    tracing::debug!("symbol cache hit (in-memory)");
                    return cached;
                }
            }
        }

        if let Some(disk) = self.load_disk_cache(disk_filename) {
            let stale = {
                let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                self.is_stale(&state)
            };
            if !stale {
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                write(&mut state, disk.clone());
                tracing::debug!("symbol cache hit (disk)");
                return disk;
            }
        }

        let fresh = reparse();
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            write(&mut state, fresh.clone());
        }
        self.record_mtimes();
        self.save_disk_cache(disk_filename, &fresh);
        fresh
    }

    pub fn invalidate(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = CacheState::empty();
        tracing::debug!("symbol cache invalidated");
    }

    fn is_stale(&self, state: &CacheState) -> bool {
        if state.mtimes.is_empty() {
            return true;
        }
        for (path, cached_mtime) in state.mtimes.iter().take(STALENESS_SAMPLE_LIMIT) {
            match std::fs::metadata(path).and_then(|m| m.modified()) {
                Ok(current) if current != *cached_mtime => {
                    tracing::debug!(path = %path.display(), "symbol cache stale: file modified");
                    return true;
                }
                Ok(_) => {}
                Err(_) => {}
            }
        }
        false
    }

    fn record_mtimes(&self) {
        let mut mtimes = std::collections::HashMap::new();
        let mut count = 0usize;
        walk_tracked(&self.workspace, &mut |path| {
            if count >= TRACKED_FILE_LIMIT {
                return false;
            }
            if let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) {
                mtimes.insert(path.to_path_buf(), modified);
                count += 1;
            }
            true
        });
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.mtimes = mtimes;
    }

    fn save_disk_cache(&self, filename: &str, content: &str) {
        if std::fs::create_dir_all(&self.cache_dir).is_err() {
            return;
        }
        if let Err(e) = std::fs::write(self.cache_dir.join(filename), content) {
            tracing::debug!(filename, error = %e, "failed to save disk cache");
        }
    }

    fn load_disk_cache(&self, filename: &str) -> Option<String> {
        std::fs::read_to_string(self.cache_dir.join(filename)).ok()
    }
}

/// Walks `root` depth-first, skipping hidden and build-artifact
/// directories, calling `visit(file_path)` for each file found.
/// Stops early once `visit` returns `false`.
fn walk_tracked(root: &Path, visit: &mut impl FnMut(&Path) -> bool) {
    let Ok(entries) = std::fs::read_dir(root) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else { continue };
        if file_type.is_dir() {
            let basename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if basename.starts_with('.') || SKIPPED_DIRS.contains(&basename) {
                continue;
            }
            walk_tracked(&path, visit);
        } else if !visit(&path) {
            return;
        }
    }
}

/// Tracks named timing marks relative to process start, for startup
/// performance profiling.
pub struct StartupTimer {
    start: Instant,
    marks: Mutex<Vec<(String, std::time::Duration)>>,
}

impl Default for StartupTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl StartupTimer {
    pub fn new() -> Self {
        Self { start: Instant::now(), marks: Mutex::new(Vec::new()) }
    }

    pub fn mark(&self, label: impl Into<String>) {
        let elapsed = self.start.elapsed();
        self.marks.lock().unwrap_or_else(|e| e.into_inner()).push((label.into(), elapsed));
    }

    pub fn summary(&self) -> String {
        let marks = self.marks.lock().unwrap_or_else(|e| e.into_inner());
        let mut lines = vec!["Startup timing:".to_string()];
        for (label, elapsed) in marks.iter() {
            lines.push(format!("  {label}: {:.3}s", elapsed.as_secs_f64()));
        }
        lines.push(format!("  Total: {:.3}s", self.start.elapsed().as_secs_f64()));
        lines.join("\n")
    }
}

#[cfg(test)]
#[path = "symbol_cache_tests.rs"]
mod tests;
