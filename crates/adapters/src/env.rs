// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.
//!
//! Covers the Transcript Reader's own knobs; the rest of the
//! `CCB_<PFX>_*` surface (state file, autostart, idle timeout, bind
//! refresh/scan limits) belongs to `ccb-daemon::env` and `ccb-cli::env`,
//! which own the daemon lifecycle and client CLI respectively.

use std::time::Duration;

fn env_var(prefix: &str, suffix: &str) -> Option<String> {
    std::env::var(format!("CCB_{prefix}_{suffix}")).ok()
}

fn parse_secs(prefix: &str, suffix: &str) -> Option<Duration> {
    env_var(prefix, suffix)
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn parse_usize(prefix: &str, suffix: &str) -> Option<usize> {
    env_var(prefix, suffix).and_then(|s| s.parse::<usize>().ok())
}

/// How often the reader re-checks pane liveness and looks for new
/// transcript bytes (`CCB_<PFX>_PANE_CHECK_INTERVAL`, default: 2s).
pub fn pane_check_interval(prefix: &str) -> Duration {
    parse_secs(prefix, "PANE_CHECK_INTERVAL").unwrap_or(Duration::from_secs(2))
}

/// How many trailing bytes of a rotated/truncated log file to re-scan when
/// rebinding a cursor (`CCB_<PFX>_REBIND_TAIL_BYTES`, default: 2MiB).
pub fn rebind_tail_bytes(prefix: &str) -> usize {
    parse_usize(prefix, "REBIND_TAIL_BYTES").unwrap_or(2 * 1024 * 1024)
}

/// Size of the initial window read when a reader first binds to a
/// transcript file, before falling back to incremental tailing
/// (`CCB_<PFX>_LOG_FIRST_WINDOW`, default: 64KiB).
pub fn log_first_window(prefix: &str) -> usize {
    parse_usize(prefix, "LOG_FIRST_WINDOW").unwrap_or(64 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(env)]
    fn defaults_apply_when_unset() {
        std::env::remove_var("CCB_LASK_PANE_CHECK_INTERVAL");
        std::env::remove_var("CCB_LASK_REBIND_TAIL_BYTES");
        std::env::remove_var("CCB_LASK_LOG_FIRST_WINDOW");

        assert_eq!(pane_check_interval("LASK"), Duration::from_secs(2));
        assert_eq!(rebind_tail_bytes("LASK"), 2 * 1024 * 1024);
        assert_eq!(log_first_window("LASK"), 64 * 1024);
    }

    #[test]
    #[serial(env)]
    fn overrides_are_read_per_prefix() {
        std::env::set_var("CCB_CASK_PANE_CHECK_INTERVAL", "5");
        assert_eq!(pane_check_interval("CASK"), Duration::from_secs(5));
        assert_eq!(pane_check_interval("LASK"), Duration::from_secs(2));
        std::env::remove_var("CCB_CASK_PANE_CHECK_INTERVAL");
    }
}
