// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon-owned slice of the `CCB_<PFX>_*` surface: whether the
//! daemon path is enabled at all, whether a client may autostart it, where
//! its state file lives, and its idle-timeout.
//!
//! Same `CCB_{prefix}_{suffix}` lookup shape as `ccb-adapters::env` and
//! `ccb-engine::resolver_env`, kept in its own file per-crate rather than
//! shared, matching the per-crate `env.rs` convention used elsewhere
//! (`crates/adapters/src/env.rs`, `crates/daemon/src/env.rs`).

use std::path::PathBuf;
use std::time::Duration;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// `CCB_<PFX> = 0|1` — whole daemon path enabled (default: enabled).
pub fn enabled(prefix: &str) -> bool {
    env_var(&format!("CCB_{prefix}")).map(|v| v != "0").unwrap_or(true)
}

/// `CCB_<PFX>_AUTOSTART` / legacy `CCB_AUTO_<PFX>` — may a client spawn a
/// missing daemon (default: allowed).
pub fn autostart(prefix: &str) -> bool {
    if let Some(v) = env_var(&format!("CCB_{prefix}_AUTOSTART")) {
        return v != "0";
    }
    if let Some(v) = env_var(&format!("CCB_AUTO_{prefix}")) {
        return v != "0";
    }
    true
}

/// `CCB_<PFX>_STATE_FILE` override, or `None` to use the provider's default path.
pub fn state_file_override(prefix: &str) -> Option<PathBuf> {
    env_var(&format!("CCB_{prefix}_STATE_FILE")).map(PathBuf::from)
}

/// `CCB_<PFX>_IDLE_TIMEOUT_S` override, falling back to `default_s`. `0`
/// (from either source) disables idle-timeout shutdown entirely.
pub fn idle_timeout(idle_timeout_env: &str, default_s: u64) -> Option<Duration> {
    let secs = env_var(idle_timeout_env)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default_s);
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}
