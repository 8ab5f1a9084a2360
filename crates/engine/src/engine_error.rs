// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level errors. Every failure here is mapped to a
//! [`ccb_core::ResultKind`] before a [`ccb_core::ProviderResult`] is built —
//! nothing in this enum reaches the RPC layer directly.

use ccb_core::ResultKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no session descriptor bound for this project")]
    NoDescriptor,
    #[error("descriptor is malformed: {0}")]
    BadDescriptor(String),
    #[error("terminal pane unavailable: {0}")]
    Pane(String),
    #[error("no terminal backend available for this session")]
    NoBackend,
    #[error("request timed out before completion")]
    Timeout,
    #[error("protocol anchors were never observed")]
    Protocol,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: {0}")]
    Storage(#[from] ccb_storage::StorageError),
}

impl EngineError {
    pub fn kind(&self) -> ResultKind {
        match self {
            EngineError::NoDescriptor | EngineError::BadDescriptor(_) => ResultKind::Binding,
            EngineError::Pane(_) | EngineError::NoBackend => ResultKind::Pane,
            EngineError::Timeout => ResultKind::Timeout,
            EngineError::Protocol => ResultKind::Protocol,
            EngineError::Io(_) | EngineError::Storage(_) => ResultKind::TransientIo,
        }
    }
}
