// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parse_inbound_decodes_run_with_optional_effort() {
    let parsed = parse_inbound(r#"{"type":"run","intent":"add a login page","effort":"high"}"#).unwrap();
    assert_eq!(parsed, Inbound::Run { intent: "add a login page".to_string(), effort: Some("high".to_string()) });
}

#[test]
fn parse_inbound_decodes_run_without_effort() {
    let parsed = parse_inbound(r#"{"type":"run","intent":"fix the bug"}"#).unwrap();
    assert_eq!(parsed, Inbound::Run { intent: "fix the bug".to_string(), effort: None });
}

#[test]
fn parse_inbound_decodes_approve_retry_and_cancel() {
    assert_eq!(parse_inbound(r#"{"type":"approve","approved":true}"#).unwrap(), Inbound::Approve { approved: true });
    assert_eq!(
        parse_inbound(r#"{"type":"retry","subtask_indices":[0,2]}"#).unwrap(),
        Inbound::Retry { subtask_indices: vec![0, 2] }
    );
    assert_eq!(parse_inbound(r#"{"type":"cancel"}"#).unwrap(), Inbound::Cancel);
}

#[test]
fn parse_inbound_rejects_unrecognised_type() {
    assert!(parse_inbound(r#"{"type":"reboot"}"#).is_err());
}

#[test]
fn parse_inbound_rejects_malformed_json() {
    assert!(parse_inbound("not json at all").is_err());
}

#[test]
fn encode_outbound_produces_one_newline_terminated_json_line() {
    let line = encode_outbound(&Outbound::State { state: "running".to_string() });
    assert_eq!(line, "{\"type\":\"state\",\"state\":\"running\"}\n");
}

#[test]
fn state_message_uses_the_lifecycle_display_form() {
    let message = state_message(TaskState::Confirming);
    assert_eq!(message, Outbound::State { state: "confirming".to_string() });
}

#[tokio::test]
async fn next_command_skips_malformed_lines_and_reports_them() {
    let mock = tokio_test::io::Builder::new()
        .read(b"garbage\n")
        .read(b"{\"type\":\"run\",\"intent\":\"do it\"}\n")
        .build();
    let mut protocol = ExtensionProtocol::new(tokio::io::BufReader::new(mock));
    let (approvals_tx, _approvals_rx) = mpsc::unbounded_channel();
    let outbound = OutboundChannel::new(Vec::<u8>::new());

    let command = protocol.next_command(&approvals_tx, &outbound).await;
    assert_eq!(command, Some(Command::Run { intent: "do it".to_string(), effort: None }));
}

#[tokio::test]
async fn next_command_returns_none_on_eof() {
    let mock = tokio_test::io::Builder::new().build();
    let mut protocol = ExtensionProtocol::new(tokio::io::BufReader::new(mock));
    let (approvals_tx, _approvals_rx) = mpsc::unbounded_channel();
    let outbound = OutboundChannel::new(Vec::<u8>::new());

    assert_eq!(protocol.next_command(&approvals_tx, &outbound).await, None);
}

#[tokio::test]
async fn next_command_routes_approve_to_the_approvals_channel_and_keeps_reading() {
    let mock = tokio_test::io::Builder::new()
        .read(b"{\"type\":\"approve\",\"approved\":true}\n")
        .read(b"{\"type\":\"cancel\"}\n")
        .build();
    let mut protocol = ExtensionProtocol::new(tokio::io::BufReader::new(mock));
    let (approvals_tx, mut approvals_rx) = mpsc::unbounded_channel();
    let outbound = OutboundChannel::new(Vec::<u8>::new());

    let command = protocol.next_command(&approvals_tx, &outbound).await;
    assert_eq!(command, Some(Command::Cancel));
    assert_eq!(approvals_rx.try_recv(), Ok(true));
}

#[tokio::test]
async fn extension_confirmation_gate_sends_plan_then_awaits_approval() {
    let outbound = Arc::new(OutboundChannel::new(Vec::<u8>::new()));
    let (approvals_tx, approvals_rx) = mpsc::unbounded_channel();
    let gate = ExtensionConfirmationGate::new(outbound, approvals_rx);

    approvals_tx.send(true).unwrap();
    assert!(gate.confirm("plan text").await);
}

#[tokio::test]
async fn extension_confirmation_gate_declines_when_the_channel_closes() {
    let outbound = Arc::new(OutboundChannel::new(Vec::<u8>::new()));
    let (approvals_tx, approvals_rx) = mpsc::unbounded_channel();
    let gate = ExtensionConfirmationGate::new(outbound, approvals_rx);

    drop(approvals_tx);
    assert!(!gate.confirm("plan text").await);
}
