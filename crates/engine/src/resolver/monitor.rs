// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background rebind scheduling: each bound session is rechecked
//! on a fixed cadence, and a transcript change resets that cadence back to
//! its starting interval while a run of no-change doublings back it off, up
//! to a cap. Sessions untouched past an eviction window are dropped.
//!
//! The scheduling decision is pure and unit-testable; `run` below is the
//! thin tokio loop that drives it against real wall-clock time.

use std::collections::HashMap;
use std::time::{Duration, Instant};

const CHECK_INTERVAL: Duration = Duration::from_secs(10);
const BACKOFF_CAP: Duration = Duration::from_secs(600);
const EVICT_AFTER: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct Tracked {
    next_check: Instant,
    backoff: Duration,
    last_seen_live: Instant,
}

/// Per-session rebind state: when each session is next due for a rebind
/// attempt, and how long it's been since that session last showed activity.
pub struct BindMonitor {
    refresh_interval: Duration,
    sessions: HashMap<String, Tracked>,
}

impl BindMonitor {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            refresh_interval,
            sessions: HashMap::new(),
        }
    }

    /// Start (or resume) tracking a session key, due for its first check
    /// immediately.
    pub fn track(&mut self, key: &str, now: Instant) {
        self.sessions.entry(key.to_string()).or_insert(Tracked {
            next_check: now,
            backoff: self.refresh_interval,
            last_seen_live: now,
        });
    }

    /// Which tracked session keys are due for a rebind attempt right now.
    pub fn due(&self, now: Instant) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|(_, t)| t.next_check <= now)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Record the outcome of a rebind attempt: `changed` resets the backoff
    /// to the starting interval (and refreshes the liveness clock);
    /// unchanged doubles it, capped at `BACKOFF_CAP`.
    pub fn record_outcome(&mut self, key: &str, changed: bool, now: Instant) {
        let Some(t) = self.sessions.get_mut(key) else {
            return;
        };
        if changed {
            t.backoff = self.refresh_interval;
            t.last_seen_live = now;
        } else {
            t.backoff = (t.backoff * 2).min(BACKOFF_CAP);
        }
        t.next_check = now + t.backoff;
    }

    /// Drop sessions that haven't shown a change in over `EVICT_AFTER`.
    pub fn evict_stale(&mut self, now: Instant) -> Vec<String> {
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, t)| now.duration_since(t.last_seen_live) > EVICT_AFTER)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            self.sessions.remove(key);
        }
        stale
    }

    pub fn check_interval(&self) -> Duration {
        CHECK_INTERVAL
    }

    pub fn is_tracked(&self, key: &str) -> bool {
        self.sessions.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newly_tracked_session_is_immediately_due() {
        let now = Instant::now();
        let mut m = BindMonitor::new(Duration::from_secs(60));
        m.track("k1", now);
        assert_eq!(m.due(now), vec!["k1".to_string()]);
    }

    #[test]
    fn unchanged_outcome_doubles_backoff_up_to_cap() {
        let mut m = BindMonitor::new(Duration::from_secs(60));
        let t0 = Instant::now();
        m.track("k1", t0);
        m.record_outcome("k1", false, t0);
        assert!(!m.due(t0 + Duration::from_secs(61)).contains(&"k1".to_string()));
        assert!(m.due(t0 + Duration::from_secs(121)).contains(&"k1".to_string()));
    }

    #[test]
    fn changed_outcome_resets_backoff_to_refresh_interval() {
        let mut m = BindMonitor::new(Duration::from_secs(60));
        let t0 = Instant::now();
        m.track("k1", t0);
        m.record_outcome("k1", false, t0);
        m.record_outcome("k1", true, t0 + Duration::from_secs(200));
        let next = t0 + Duration::from_secs(200);
        assert!(!m.due(next + Duration::from_secs(30)).contains(&"k1".to_string()));
        assert!(m.due(next + Duration::from_secs(61)).contains(&"k1".to_string()));
    }

    #[test]
    fn stale_session_is_evicted_after_five_minutes_of_no_change() {
        let mut m = BindMonitor::new(Duration::from_secs(60));
        let t0 = Instant::now();
        m.track("k1", t0);
        let evicted = m.evict_stale(t0 + Duration::from_secs(301));
        assert_eq!(evicted, vec!["k1".to_string()]);
        assert!(!m.is_tracked("k1"));
    }

    #[test]
    fn fresh_session_is_not_evicted() {
        let mut m = BindMonitor::new(Duration::from_secs(60));
        let t0 = Instant::now();
        m.track("k1", t0);
        assert!(m.evict_stale(t0 + Duration::from_secs(10)).is_empty());
    }
}
