// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The concurrent execution engine: dependency-batched scheduling, the
//! cross-region request router, the blocked-access listener, and the
//! conflict detector/soft lock/resolver.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod blocked_listener;
pub mod conflict;
pub mod cost;
pub mod router;
pub mod scheduler;

pub use blocked_listener::{BlockedAccessEvent, BlockedAccessListener};
pub use conflict::{Conflict, ConflictChanges, ConflictDetector, ConflictStrategy, MergeOracle, Resolution, Resolver, SoftLock, WriteRecord};
pub use cost::{A2aStats, CostEntry, CostSummary, CostTracker, DetailedBreakdown};
pub use router::{PeerQuery, Router, SymbolIndex, SymbolMatch};
pub use scheduler::{compute_batches, Scheduler, DEFAULT_MAX_AGENTS};
