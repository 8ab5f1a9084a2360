// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The client-side slice of the `CCB_<PFX>_*` surface, kept in its own
//! file per-crate rather than shared, matching the per-crate `env.rs`
//! convention used elsewhere and [`ccb_daemon::daemon_env`]'s daemon-side sibling.

use std::path::PathBuf;
use std::time::Duration;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// `CCB_<PFX> = 0|1` — whole daemon path enabled (default: enabled). A
/// client that sees this disabled must not attempt to connect or autostart.
pub fn enabled(prefix: &str) -> bool {
    env_var(&format!("CCB_{prefix}")).map(|v| v != "0").unwrap_or(true)
}

/// `CCB_<PFX>_AUTOSTART` / legacy `CCB_AUTO_<PFX>` — may this client spawn a
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

/// Override the `ccbd` binary to launch, bypassing `PATH`/sibling lookup.
pub fn daemon_binary_override() -> Option<String> {
    env_var("CCB_DAEMON_BINARY")
}

/// How long to keep polling for the daemon's state file to appear after
/// spawning it, in milliseconds. `CCB_CLIENT_CONNECT_TIMEOUT_MS`, default 5s.
pub fn connect_timeout() -> Duration {
    env_var("CCB_CLIENT_CONNECT_TIMEOUT_MS")
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Interval between connect retries while waiting for a spawned daemon.
/// `CCB_CLIENT_CONNECT_POLL_MS`, default 50ms.
pub fn connect_poll_interval() -> Duration {
    env_var("CCB_CLIENT_CONNECT_POLL_MS")
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(50))
}

/// Extra grace the client gives the socket read beyond `timeout_s`, on top
/// of the server's own `timeout_s + 5s` wait, before giving up locally
/// (ignored entirely in `--sync` mode, or for the unbounded `timeout_s < 0` case).
/// `CCB_CLIENT_READ_GRACE_MS`, default 10s.
pub fn read_grace() -> Duration {
    env_var("CCB_CLIENT_READ_GRACE_MS")
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}

/// Default `timeout_s` sent when the caller doesn't pass `--timeout`.
/// `CCB_<PFX>_DEFAULT_TIMEOUT_S`, default 120s.
pub fn default_timeout_s(prefix: &str) -> f64 {
    env_var(&format!("CCB_{prefix}_DEFAULT_TIMEOUT_S"))
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(120.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(env)]
    fn enabled_defaults_true_and_respects_zero() {
        std::env::remove_var("CCB_LASK");
        assert!(enabled("LASK"));
        std::env::set_var("CCB_LASK", "0");
        assert!(!enabled("LASK"));
        std::env::remove_var("CCB_LASK");
    }

    #[test]
    #[serial(env)]
    fn autostart_falls_back_to_legacy_var() {
        std::env::remove_var("CCB_LASK_AUTOSTART");
        std::env::remove_var("CCB_AUTO_LASK");
        assert!(autostart("LASK"));
        std::env::set_var("CCB_AUTO_LASK", "0");
        assert!(!autostart("LASK"));
        std::env::remove_var("CCB_AUTO_LASK");
    }

    #[test]
    #[serial(env)]
    fn default_timeout_defaults_to_120() {
        std::env::remove_var("CCB_LASK_DEFAULT_TIMEOUT_S");
        assert_eq!(default_timeout_s("LASK"), 120.0);
    }
}
