// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record at {path}: {source}")]
    Decode { path: String, #[source] source: serde_json::Error },

    #[error("no record found for id '{0}'")]
    NotFound(String),

    #[error("could not determine a per-user data directory")]
    NoDataDir,
}
