// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oask` — thin client for the OpenCode provider.

#[tokio::main]
async fn main() {
    std::process::exit(ccb_cli::thin_client::run(ccb_core::Provider::OpenCode).await);
}
