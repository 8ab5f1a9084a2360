// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk load/save for `PaneRegistry`, one file per CCB session
//! id under a registry directory, matching `lib/pane_registry.py`'s
//! one-file-per-session layout rather than a single shared index file.

use crate::safe_write::{read_json, safe_write, StorageError};
use ccb_core::{PaneRegistry, PaneRegistryEntry};
use std::path::{Path, PathBuf};

/// The file a given CCB session id's registry entry lives at.
pub fn registry_path_for_session(registry_dir: &Path, ccb_session_id: &str) -> PathBuf {
    registry_dir.join(format!("ccb-session-{ccb_session_id}.json"))
}

/// Load the single-entry registry file for one session, or `None` if absent.
pub fn load_registry_entry(
    registry_dir: &Path,
    ccb_session_id: &str,
) -> Result<Option<PaneRegistryEntry>, StorageError> {
    let path = registry_path_for_session(registry_dir, ccb_session_id);
    let registry: Option<PaneRegistry> = read_json(&path)?;
    Ok(registry.and_then(|r| r.entries.into_iter().next()))
}

/// Upsert and atomically persist one session's registry entry to its own file.
pub fn save_registry_entry(registry_dir: &Path, entry: &PaneRegistryEntry) -> Result<(), StorageError> {
    let path = registry_path_for_session(registry_dir, &entry.ccb_session_id);
    let mut registry = read_json::<PaneRegistry>(&path)?.unwrap_or_default();
    registry.upsert(entry.clone());
    safe_write(&path, &registry)
}

/// Scan every registry file in `registry_dir`, returning fresh entries only.
pub fn scan_fresh_entries(registry_dir: &Path, now_epoch_s: i64) -> Result<Vec<PaneRegistryEntry>, StorageError> {
    let mut found = Vec::new();
    let entries = match std::fs::read_dir(registry_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
        Err(e) => return Err(e.into()),
    };
    for dir_entry in entries {
        let dir_entry = dir_entry?;
        if dir_entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(registry) = read_json::<PaneRegistry>(&dir_entry.path())? {
            found.extend(registry.entries.into_iter().filter(|e| e.is_fresh(now_epoch_s)));
        }
    }
    Ok(found)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
