// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The global pane registry (`PaneRegistry`).
//!
//! An inverted index from CCB session id / pane id to a descriptor summary,
//! stored at `~/.ccb/run/ccb-session-<id>.json`. Stale entries (older than
//! the TTL) are treated as absent on read; nothing actively sweeps them,
//! matching `lib/pane_registry.py` in the original implementation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Entries older than this are ignored on lookup, though never deleted.
pub const TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// One summary row in the pane registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaneRegistryEntry {
    pub ccb_session_id: String,
    pub pane_id: String,
    pub descriptor_path: PathBuf,
    pub updated_at_epoch_s: i64,
}

impl PaneRegistryEntry {
    /// Whether this entry is still within the TTL as of `now_epoch_s`.
    pub fn is_fresh(&self, now_epoch_s: i64) -> bool {
        now_epoch_s.saturating_sub(self.updated_at_epoch_s) < TTL_SECONDS
    }
}

/// The on-disk shape of one registry file: a flat list of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaneRegistry {
    pub entries: Vec<PaneRegistryEntry>,
}

impl PaneRegistry {
    /// Look up a fresh entry by CCB session id or pane id.
    pub fn find(&self, key: &str, now_epoch_s: i64) -> Option<&PaneRegistryEntry> {
        self.entries
            .iter()
            .find(|e| (e.ccb_session_id == key || e.pane_id == key) && e.is_fresh(now_epoch_s))
    }

    /// Insert or replace the entry for this session id, refreshing its timestamp.
    pub fn upsert(&mut self, entry: PaneRegistryEntry) {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.ccb_session_id == entry.ccb_session_id)
        {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, age_s: i64, now: i64) -> PaneRegistryEntry {
        PaneRegistryEntry {
            ccb_session_id: id.into(),
            pane_id: format!("%{id}"),
            descriptor_path: PathBuf::from("/proj/.ccb_config/.claude-session"),
            updated_at_epoch_s: now - age_s,
        }
    }

    #[test]
    fn fresh_entry_is_found() {
        let now = 1_000_000;
        let mut reg = PaneRegistry::default();
        reg.upsert(entry("s1", 10, now));
        assert!(reg.find("s1", now).is_some());
    }

    #[test]
    fn stale_entry_is_ignored_but_not_removed() {
        let now = 1_000_000;
        let mut reg = PaneRegistry::default();
        reg.upsert(entry("s1", TTL_SECONDS + 1, now));
        assert!(reg.find("s1", now).is_none());
        assert_eq!(reg.entries.len(), 1);
    }

    #[test]
    fn upsert_replaces_existing_entry() {
        let now = 1_000_000;
        let mut reg = PaneRegistry::default();
        reg.upsert(entry("s1", 10, now));
        reg.upsert(entry("s1", 0, now));
        assert_eq!(reg.entries.len(), 1);
        assert_eq!(reg.entries[0].updated_at_epoch_s, now);
    }

    #[test]
    fn lookup_by_pane_id_also_works() {
        let now = 1_000_000;
        let mut reg = PaneRegistry::default();
        reg.upsert(entry("s1", 0, now));
        assert!(reg.find("%s1", now).is_some());
    }
}
