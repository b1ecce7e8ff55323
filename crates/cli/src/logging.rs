// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup for the `crew` binary. Unlike a daemon, there's no
//! log-rotation concern here — just stderr, with a filter the user can
//! widen with `--verbose` or override entirely via `RUST_LOG`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn setup_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(std::io::stderr)).init();
}
