// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment knobs owned by the Session Resolver: how aggressively the
//! background monitor rechecks live bindings, and how far the bounded
//! mtime scan (tier c) is willing to look. The Transcript Reader's own
//! knobs live in `ccb_adapters::env`; the daemon lifecycle's in
//! `ccb-daemon::env`.

use std::time::Duration;

fn env_var(prefix: &str, suffix: &str) -> Option<String> {
    std::env::var(format!("CCB_{prefix}_{suffix}")).ok()
}

fn parse_secs_f64(prefix: &str, suffix: &str) -> Option<Duration> {
    env_var(prefix, suffix)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(Duration::from_secs_f64)
}

fn parse_usize(prefix: &str, suffix: &str) -> Option<usize> {
    env_var(prefix, suffix).and_then(|s| s.parse::<usize>().ok())
}

/// Starting (and post-change-reset) interval between rebind attempts for a
/// live session binding, before exponential backoff kicks in on no-change
/// (`CCB_<PFX>_BIND_REFRESH_INTERVAL`, default: 60s).
pub fn bind_refresh_interval(prefix: &str) -> Duration {
    parse_secs_f64(prefix, "BIND_REFRESH_INTERVAL").unwrap_or(Duration::from_secs(60))
}

/// How many most-recently-modified transcript files the tier-c bounded scan
/// is willing to read before giving up (`CCB_<PFX>_BIND_SCAN_LIMIT`,
/// default: 400, clamped to `[50, 20000]`).
pub fn bind_scan_limit(prefix: &str) -> usize {
    parse_usize(prefix, "BIND_SCAN_LIMIT")
        .unwrap_or(400)
        .clamp(50, 20_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(env)]
    fn defaults_apply_when_unset() {
        std::env::remove_var("CCB_LASK_BIND_REFRESH_INTERVAL");
        std::env::remove_var("CCB_LASK_BIND_SCAN_LIMIT");

        assert_eq!(bind_refresh_interval("LASK"), Duration::from_secs(60));
        assert_eq!(bind_scan_limit("LASK"), 400);
    }

    #[test]
    #[serial(env)]
    fn scan_limit_is_clamped_both_directions() {
        std::env::set_var("CCB_CASK_BIND_SCAN_LIMIT", "10");
        assert_eq!(bind_scan_limit("CASK"), 50);
        std::env::set_var("CCB_CASK_BIND_SCAN_LIMIT", "999999");
        assert_eq!(bind_scan_limit("CASK"), 20_000);
        std::env::remove_var("CCB_CASK_BIND_SCAN_LIMIT");
    }

    #[test]
    #[serial(env)]
    fn overrides_are_read_per_prefix() {
        std::env::set_var("CCB_GASK_BIND_REFRESH_INTERVAL", "15");
        assert_eq!(bind_refresh_interval("GASK"), Duration::from_secs(15));
        assert_eq!(bind_refresh_interval("LASK"), Duration::from_secs(60));
        std::env::remove_var("CCB_GASK_BIND_REFRESH_INTERVAL");
    }
}
