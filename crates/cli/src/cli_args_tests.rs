// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::Parser;

#[test]
fn parses_a_bare_intent() {
    let cli = Cli::parse_from(["crew", "add a login page"]);
    assert_eq!(cli.intent.as_deref(), Some("add a login page"));
    assert_eq!(cli.effort, EffortArg::Medium);
    assert_eq!(cli.mode, ModeArg::Interactive);
    assert!(!cli.auto_approve);
}

#[test]
fn parses_flags_without_an_intent() {
    let cli = Cli::parse_from(["crew", "--stats"]);
    assert!(cli.intent.is_none());
    assert!(cli.stats);
}

#[test]
fn parses_effort_and_mode_overrides() {
    let cli = Cli::parse_from(["crew", "--effort", "high", "--mode", "extension", "do it"]);
    assert_eq!(cli.effort, EffortArg::High);
    assert_eq!(cli.mode, ModeArg::Extension);
}

#[test]
fn parses_resume_id() {
    let cli = Cli::parse_from(["crew", "--resume-id", "run-abc123"]);
    assert_eq!(cli.resume_id.as_deref(), Some("run-abc123"));
}

#[yare::parameterized(
    low    = { EffortArg::Low, crew_orchestrator::EffortLevel::Low },
    medium = { EffortArg::Medium, crew_orchestrator::EffortLevel::Medium },
    high   = { EffortArg::High, crew_orchestrator::EffortLevel::High },
)]
fn effort_arg_maps_to_effort_level(arg: EffortArg, expected: crew_orchestrator::EffortLevel) {
    assert_eq!(arg.into_effort_level(), expected);
}
