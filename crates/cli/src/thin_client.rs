// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared argument parsing and dispatch for the four per-provider thin
//! clients (`<tool> [--sync] [--timeout N] "<message>"`). Each
//! `src/bin/{lask,cask,gask,oask}.rs` is a few lines calling [`run`] with
//! its own [`Provider`] — the command name is taken from the provider's
//! own `cli_tool_name` (via `CommandFactory`/`FromArgMatches`) rather than
//! the shared binary's own package name.

use crate::client::BrokerClient;
use ccb_core::Provider;
use clap::{CommandFactory, FromArgMatches, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Wait indefinitely for the reply instead of giving up after
    /// `--timeout` (plus a short grace period) if the daemon stalls.
    #[arg(long)]
    sync: bool,

    /// Seconds to wait for a reply before timing out (`-1` waits forever
    /// server-side). Defaults to `CCB_<PFX>_DEFAULT_TIMEOUT_S` or 120.
    #[arg(long)]
    timeout: Option<f64>,

    /// Suppress the completion notification side-channel for this request.
    #[arg(long)]
    quiet: bool,

    /// Write the reply to this path instead of (or in addition to) stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Skip the protocol-marker wrapping of the message before sending it.
    #[arg(long = "no-wrap")]
    no_wrap: bool,

    /// The prompt to send. Multiple words are joined with spaces, so
    /// quoting is optional for simple messages.
    message: Vec<String>,
}

/// Parse `std::env::args()` under the given provider's tool name, send the
/// request, print the reply, and return the process exit code.
pub async fn run(provider: Provider) -> i32 {
    let spec = provider.spec();
    let matches = Args::command().name(spec.cli_tool_name).get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(a) => a,
        Err(e) => {
            let _ = e.print();
            return 2;
        }
    };

    if args.message.is_empty() {
        eprintln!("{}: expected a message to send", spec.cli_tool_name);
        return 2;
    }
    let message = args.message.join(" ");
    let timeout_s = args.timeout.unwrap_or_else(|| crate::env::default_timeout_s(&spec.prefix.to_uppercase()));

    let client = BrokerClient::new(provider);
    match client.call(message, timeout_s, args.quiet, args.output, args.no_wrap, args.sync).await {
        Ok(response) => {
            if !response.reply.is_empty() {
                println!("{}", response.reply);
            }
            response.exit_code
        }
        Err(e) => {
            eprintln!("{}: {e}", spec.cli_tool_name);
            1
        }
    }
}
