// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stand-in [`crew_engine::router::SymbolIndex`]: a real native workspace
//! parser is an opaque external dependency outside this crate's scope, so
//! the router always falls through to a live peer query or its fallback.

use async_trait::async_trait;
use crew_engine::router::{SymbolIndex, SymbolMatch};
use std::path::Path;

pub struct EmptySymbolIndex;

#[async_trait]
impl SymbolIndex for EmptySymbolIndex {
    async fn lookup_symbol(&self, _workspace: &Path, _symbol_name: &str) -> Vec<SymbolMatch> {
        Vec::new()
    }
}
