//! `--stats` and `--sessions` specs: read-only reporting over persisted state.

use crate::prelude::*;

#[test]
fn stats_with_no_history_prints_a_placeholder() {
    let project = Project::empty();
    cli().args(&["--stats"]).env_home(&project).passes().stdout_has("no agent performance data");
}

#[test]
fn sessions_with_no_history_prints_a_placeholder() {
    let project = Project::empty();
    cli().args(&["--sessions"]).env_home(&project).passes().stdout_has("no saved sessions");
}

#[test]
fn compile_with_too_few_traces_skips_every_module() {
    let project = Project::empty();
    cli()
        .args(&["--compile"])
        .env_home(&project)
        .passes()
        .stdout_has("SKIP")
        .stdout_has("need at least");
}
