// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lask` — thin client for the Claude Code provider.

#[tokio::main]
async fn main() {
    std::process::exit(ccb_cli::thin_client::run(ccb_core::Provider::Claude).await);
}
