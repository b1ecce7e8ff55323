//! Top-level CLI usage specs.

use crate::prelude::*;

#[test]
fn no_args_and_no_flags_shows_a_usage_error() {
    cli().fails_with_code(2).stderr_has("an intent is required");
}

#[test]
fn help_flag_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage");
}

#[test]
fn version_flag_shows_the_version() {
    cli().args(&["--version"]).passes().stdout_has("crew");
}
