// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's own failure domain: binding the socket, writing the state
//! file, anything short of a per-request `ProviderResult` (those already
//! have their own taxonomy in `ccb_core::ResultKind`). Grounded on the
//! teacher's `LifecycleError` (`crates/daemon/src/lifecycle.rs`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to bind {0}: {1}")]
    BindFailed(String, std::io::Error),
    #[error("state dir could not be resolved (no HOME)")]
    NoStateDir,
    #[error("storage error: {0}")]
    Storage(#[from] ccb_storage::StorageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
