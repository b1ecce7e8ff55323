//! `--resume` / `--resume-id` specs against an empty persisted-run store.

use crate::prelude::*;

#[test]
fn resume_with_no_saved_runs_prints_a_placeholder() {
    let project = Project::empty();
    cli().args(&["--resume"]).env_home(&project).passes().stdout_has("no resumable runs");
}

#[test]
fn resume_id_for_an_unknown_run_fails() {
    let project = Project::empty();
    cli()
        .args(&["--resume-id", "does-not-exist"])
        .env_home(&project)
        .fails_with_code(1)
        .stderr_has("could not load run");
}
