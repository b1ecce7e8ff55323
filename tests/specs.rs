//! Workspace-level integration specs, run against the built `crew` binary.

mod prelude;

mod cli {
    mod help;
    mod resume;
    mod stats;
}
