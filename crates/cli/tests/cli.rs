// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box tests against the actual `crew` binary.

use assert_cmd::Command;

#[test]
fn help_prints_usage_and_exits_zero() {
    let output = Command::cargo_bin("crew").unwrap().arg("--help").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
}

#[test]
fn no_intent_and_no_flag_is_a_usage_error() {
    Command::cargo_bin("crew").unwrap().assert().failure().code(2);
}

#[test]
fn stats_with_no_recorded_data_prints_a_placeholder_and_exits_zero() {
    let temp_home = tempfile::tempdir().unwrap();
    let output = Command::cargo_bin("crew").unwrap().env("HOME", temp_home.path()).arg("--stats").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("no agent performance data"));
}
