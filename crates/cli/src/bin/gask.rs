// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gask` — thin client for the Gemini provider.

#[tokio::main]
async fn main() {
    std::process::exit(ccb_cli::thin_client::run(ccb_core::Provider::Gemini).await);
}
