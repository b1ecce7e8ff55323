// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-boundary adapters: JSON-RPC framing, sub-agent session
//! management, and workspace shared-zone configuration.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod rpc;
pub mod session;
pub mod zones;

pub use error::AdapterError;
pub use rpc::{Incoming, RpcConnection, RpcError};
pub use session::{Session, SessionUpdate};
pub use zones::{SharedZoneConfig, DEFAULT_SHARED_ZONES};
