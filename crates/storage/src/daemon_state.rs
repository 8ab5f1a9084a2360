// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk state file a daemon writes at startup for client discovery:
//! `{pid, host, connect_host, port, token, started_at}`
//! under `~/.ccb/run/`.

use crate::safe_write::{read_json, safe_write, StorageError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of one daemon's state file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonState {
    pub pid: u32,
    pub host: String,
    pub connect_host: String,
    pub port: u16,
    pub token: String,
    pub started_at: i64,
}

/// Load a daemon's state file, or `Ok(None)` if it hasn't started (yet, or ever).
pub fn load_daemon_state(path: &Path) -> Result<Option<DaemonState>, StorageError> {
    read_json(path)
}

/// Atomically write the daemon's state file at startup.
pub fn save_daemon_state(path: &Path, state: &DaemonState) -> Result<(), StorageError> {
    safe_write(path, state)
}

/// Remove the state file, but only if it still names `pid` — guards against
/// a newer daemon instance's file being deleted by a stale shutdown path.
pub fn remove_if_owned_by(path: &Path, pid: u32) -> Result<(), StorageError> {
    match load_daemon_state(path)? {
        Some(state) if state.pid == pid => match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        },
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "daemon_state_tests.rs"]
mod tests;
