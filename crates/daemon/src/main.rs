// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ccbd — the request-broker daemon.
//!
//! One running `ccbd` process serves exactly one provider (Claude, Codex,
//! Gemini, or OpenCode): which one is decided by the binary's own name
//! (`lask` for the `lask`-prefixed launcher, etc.) or an explicit
//! `--provider` argument, never by environment alone, so a launcher can
//! `exec` a symlink named after the provider and get the right behavior.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use ccb_adapters::{HookNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter, NotifyError, TmuxBackend};
use ccb_core::Provider;
use ccb_daemon::handler::HandlerLocations;
use ccb_daemon::server::{run, ServerConfig};
use ccb_daemon::{daemon_env, BrokerHandler};
use ccb_engine::resolver::TranscriptLocations;
use ccb_engine::AdapterTiming;
use tracing::{error, info};

/// Either of the two notify strategies a deployment can configure, unified
/// behind one concrete type since `NotifyAdapter: Clone` rules out a trait
/// object.
#[derive(Clone)]
enum ConfiguredNotifier {
    Hook(HookNotifyAdapter),
    NoOp(NoOpNotifyAdapter),
}

#[async_trait::async_trait]
impl NotifyAdapter for ConfiguredNotifier {
    async fn notify_completion(&self, req_id: &str, reply: &str, success: bool) -> Result<(), NotifyError> {
        match self {
            ConfiguredNotifier::Hook(h) => h.notify_completion(req_id, reply, success).await,
            ConfiguredNotifier::NoOp(n) => n.notify_completion(req_id, reply, success).await,
        }
    }
}

fn resolve_provider() -> Option<Provider> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--provider" {
            return args.next().and_then(|v| Provider::from_tool_name(&v));
        }
        if let Some(rest) = arg.strip_prefix("--provider=") {
            return Provider::from_tool_name(rest);
        }
    }
    let exe = std::env::args().next()?;
    let name = std::path::Path::new(&exe).file_stem()?.to_str()?;
    Provider::from_tool_name(name)
}

fn state_dir() -> std::path::PathBuf {
    dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from(".")).join(".ccb")
}

fn transcript_root(env_names: &[&str], default_subdir: &str) -> std::path::PathBuf {
    for name in env_names {
        if let Ok(v) = std::env::var(name) {
            return std::path::PathBuf::from(v);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(default_subdir)
}

fn locations_for(provider: Provider) -> HandlerLocations {
    match provider {
        Provider::Claude => HandlerLocations {
            jsonl: Some(TranscriptLocations {
                transcript_root: transcript_root(&["CLAUDE_PROJECTS_ROOT", "CLAUDE_PROJECT_ROOT"], ".claude/projects"),
                sessions_index: None,
            }),
            opencode_db: None,
        },
        Provider::Codex => HandlerLocations {
            jsonl: Some(TranscriptLocations {
                transcript_root: transcript_root(&["CODEX_SESSION_ROOT"], ".codex/sessions"),
                sessions_index: None,
            }),
            opencode_db: None,
        },
        Provider::Gemini => HandlerLocations {
            jsonl: Some(TranscriptLocations {
                transcript_root: transcript_root(&["GEMINI_SESSION_ROOT"], ".gemini/sessions"),
                sessions_index: None,
            }),
            opencode_db: None,
        },
        Provider::OpenCode => HandlerLocations {
            jsonl: None,
            opencode_db: Some(transcript_root(&["OPENCODE_STORAGE_DB"], ".local/share/opencode/storage.db")),
        },
    }
}

fn configured_notifier(prefix: &str) -> ConfiguredNotifier {
    match std::env::var(format!("CCB_{prefix}_NOTIFY_HOOK")) {
        Ok(cmd) if !cmd.is_empty() => ConfiguredNotifier::Hook(HookNotifyAdapter::new(cmd)),
        _ => ConfiguredNotifier::NoOp(NoOpNotifyAdapter),
    }
}

fn setup_logging(log_path: &std::path::Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_appender = tracing_appender::rolling::never(
        log_path.parent().unwrap_or_else(|| std::path::Path::new(".")),
        log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("ccbd.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("ccbd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("ccbd {} — request-broker daemon", env!("CARGO_PKG_VERSION"));
                println!();
                println!("USAGE:");
                println!("    ccbd [--provider <lask|cask|gask|oask>]");
                println!();
                println!("ccbd is typically started by its matching thin client (lask,");
                println!("cask, gask, oask) and should not be invoked directly.");
                return Ok(());
            }
            _ => {}
        }
    }

    let provider = resolve_provider().ok_or("could not determine provider: pass --provider or run as lask/cask/gask/oask")?;
    let spec = provider.spec();
    // The `CCB_<PFX>_*` env var convention uses the upper-cased prefix
    // (`CCB_LASK_...`); `ProviderSpec::prefix` itself stays lower-case since
    // it also names the CLI binary and protocol `type` field.
    let prefix_upper = spec.prefix.to_uppercase();

    let dir = state_dir();
    let log_path = dir.join("logs").join(spec.log_file_name);
    let _log_guard = setup_logging(&log_path)?;
    info!(provider = spec.prefix, "starting");

    let state_path =
        daemon_env::state_file_override(&prefix_upper).unwrap_or_else(|| dir.join("run").join(spec.state_file_name));
    if let Some(parent) = state_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let idle_timeout = daemon_env::idle_timeout(spec.idle_timeout_env, spec.default_idle_timeout_s);
    let scan_limit = ccb_engine::resolver_env::bind_scan_limit(&prefix_upper);
    let timing = AdapterTiming {
        pane_check_interval: ccb_adapters::env::pane_check_interval(&prefix_upper),
        rebind_tail_bytes: ccb_adapters::env::rebind_tail_bytes(&prefix_upper) as u64,
        ..AdapterTiming::default()
    };
    let terminal = TmuxBackend::new(dir.join("pane-logs"));
    let handler = BrokerHandler::new(
        provider,
        terminal,
        locations_for(provider),
        scan_limit,
        timing,
        configured_notifier(&prefix_upper),
    );

    let config = ServerConfig {
        provider,
        state_path,
        idle_timeout,
    };

    if let Err(e) = run(handler, config).await {
        error!(error = %e, "daemon exited with error");
        return Err(e.into());
    }
    info!("daemon shut down cleanly");
    Ok(())
}
