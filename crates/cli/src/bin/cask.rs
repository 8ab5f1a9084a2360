// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cask` — thin client for the Codex provider.

#[tokio::main]
async fn main() {
    std::process::exit(ccb_cli::thin_client::run(ccb_core::Provider::Codex).await);
}
