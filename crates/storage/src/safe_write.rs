// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON file rewrite: write to a sibling temp file, fsync it, rename
//! over the target, then fsync the containing directory so the rename
//! itself is durable. A concurrent reader never observes a partial write.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Serialize `value` as pretty JSON and atomically rewrite `path`.
pub fn safe_write<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let tmp_path = parent.join(format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("safe-write"),
        std::process::id()
    ));

    let json = serde_json::to_vec_pretty(value)?;
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&json)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
    tracing::debug!(path = %path.display(), "rewrote file atomically");
    Ok(())
}

/// Read and parse a JSON file. Returns `Ok(None)` if it doesn't exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "safe_write_tests.rs"]
mod tests;
