// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op terminal backend for minimal deployments and dry runs.

use super::{TerminalBackend, TerminalError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Terminal backend that reports every pane as absent.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpTerminalBackend;

impl NoOpTerminalBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TerminalBackend for NoOpTerminalBackend {
    async fn send_text(&self, pane_id: &str, _text: &str) -> Result<(), TerminalError> {
        Err(TerminalError::NotFound(pane_id.to_string()))
    }

    async fn is_alive(&self, _pane_id: &str) -> Result<bool, TerminalError> {
        Ok(false)
    }

    async fn pane_log_path(&self, _pane_id: &str) -> Result<Option<PathBuf>, TerminalError> {
        Ok(None)
    }

    async fn ensure_pane_log(&self, _pane_id: &str) -> Result<Option<PathBuf>, TerminalError> {
        Ok(None)
    }

    async fn get_text(&self, pane_id: &str, _lines: u32) -> Result<String, TerminalError> {
        Err(TerminalError::NotFound(pane_id.to_string()))
    }

    async fn respawn_pane(
        &self,
        _pane_id: &str,
        _cmd: &str,
        _cwd: &Path,
        _remain_on_exit: bool,
    ) -> Result<(), TerminalError> {
        Err(TerminalError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_no_panes() {
        let backend = NoOpTerminalBackend::new();
        assert!(!backend.is_alive("anything").await.unwrap());
        assert!(backend.pane_log_path("anything").await.unwrap().is_none());
        assert!(backend.send_text("anything", "hi").await.is_err());
    }
}
