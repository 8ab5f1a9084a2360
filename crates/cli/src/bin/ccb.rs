// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ccb` — management binary for the broker daemons themselves
//! (`up`/`down`/`status`), as opposed to the per-provider thin clients that
//! send requests through them.

use anyhow::Result;
use ccb_cli::client::BrokerClient;
use ccb_core::Provider;
use clap::{Parser, Subcommand, ValueEnum};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "ccb", version, about = "Manage the request-broker daemons")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a provider's daemon if it isn't already running.
    Up {
        #[arg(long, value_enum)]
        provider: Option<ProviderArg>,
    },
    /// Ask a provider's daemon to shut down.
    Down {
        #[arg(long, value_enum)]
        provider: Option<ProviderArg>,
    },
    /// Report whether each provider's daemon is running.
    Status {
        #[arg(long, value_enum)]
        provider: Option<ProviderArg>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderArg {
    Claude,
    Codex,
    Gemini,
    Opencode,
}

impl From<ProviderArg> for Provider {
    fn from(p: ProviderArg) -> Self {
        match p {
            ProviderArg::Claude => Provider::Claude,
            ProviderArg::Codex => Provider::Codex,
            ProviderArg::Gemini => Provider::Gemini,
            ProviderArg::Opencode => Provider::OpenCode,
        }
    }
}

fn targets(provider: Option<ProviderArg>) -> Vec<Provider> {
    match provider {
        Some(p) => vec![p.into()],
        None => Provider::ALL.to_vec(),
    }
}

async fn up(provider: Provider) -> Result<()> {
    let client = BrokerClient::new(provider);
    let prefix = provider.spec().cli_tool_name;
    if client.ping().await? {
        println!("{prefix}: already running");
        return Ok(());
    }

    let mut child = ccb_cli::daemon_process::start_daemon_background(provider.spec().prefix)?;
    let deadline = Instant::now() + ccb_cli::env::connect_timeout();
    loop {
        if let Ok(Some(status)) = child.try_wait() {
            anyhow::bail!("{prefix}: ccbd exited with {status} before becoming reachable");
        }
        if client.ping().await? {
            println!("{prefix}: started");
            return Ok(());
        }
        if Instant::now() >= deadline {
            anyhow::bail!("{prefix}: timed out waiting for ccbd to become reachable");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn down(provider: Provider) -> Result<()> {
    let client = BrokerClient::new(provider);
    let prefix = provider.spec().cli_tool_name;
    if client.shutdown().await? {
        println!("{prefix}: shutdown requested");
    } else {
        println!("{prefix}: not running");
    }
    Ok(())
}

async fn status(provider: Provider) -> Result<()> {
    let client = BrokerClient::new(provider);
    let prefix = provider.spec().cli_tool_name;
    if client.ping().await? {
        println!("{prefix}: running");
    } else {
        println!("{prefix}: not running");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Up { provider } => {
            for p in targets(provider) {
                up(p).await?;
            }
        }
        Commands::Down { provider } => {
            for p in targets(provider) {
                down(p).await?;
            }
        }
        Commands::Status { provider } => {
            for p in targets(provider) {
                status(p).await?;
            }
        }
    }
    Ok(())
}
