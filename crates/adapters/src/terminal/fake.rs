// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake terminal backend for testing.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{TerminalBackend, TerminalError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded terminal backend call.
#[derive(Debug, Clone)]
pub enum TerminalCall {
    SendText { pane_id: String, text: String },
    IsAlive { pane_id: String },
    EnsurePaneLog { pane_id: String },
    RespawnPane { pane_id: String, cmd: String },
    GetText { pane_id: String, lines: u32 },
    FindPaneByTitleMarker { marker: String },
}

#[derive(Debug, Clone, Default)]
struct FakePane {
    alive: bool,
    log_path: Option<PathBuf>,
    title: String,
    text: String,
    sent: Vec<String>,
}

struct FakeState {
    panes: HashMap<String, FakePane>,
    calls: Vec<TerminalCall>,
}

/// In-memory terminal backend for unit tests.
#[derive(Clone)]
pub struct FakeTerminalBackend {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeTerminalBackend {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                panes: HashMap::new(),
                calls: Vec::new(),
            })),
        }
    }
}

impl FakeTerminalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TerminalCall> {
        self.inner.lock().calls.clone()
    }

    /// Register a pane as alive (optionally with a title and scrollback log).
    pub fn add_pane(&self, pane_id: &str, title: &str) {
        self.inner.lock().panes.insert(
            pane_id.to_string(),
            FakePane {
                alive: true,
                title: title.to_string(),
                ..Default::default()
            },
        );
    }

    pub fn set_alive(&self, pane_id: &str, alive: bool) {
        if let Some(pane) = self.inner.lock().panes.get_mut(pane_id) {
            pane.alive = alive;
        }
    }

    pub fn set_text(&self, pane_id: &str, text: &str) {
        if let Some(pane) = self.inner.lock().panes.get_mut(pane_id) {
            pane.text = text.to_string();
        }
    }

    pub fn set_log_path(&self, pane_id: &str, path: PathBuf) {
        if let Some(pane) = self.inner.lock().panes.get_mut(pane_id) {
            pane.log_path = Some(path);
        }
    }

    /// Text injected via `send_text` calls, in order, for the given pane.
    pub fn sent_lines(&self, pane_id: &str) -> Vec<String> {
        self.inner
            .lock()
            .panes
            .get(pane_id)
            .map(|p| p.sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TerminalBackend for FakeTerminalBackend {
    async fn send_text(&self, pane_id: &str, text: &str) -> Result<(), TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TerminalCall::SendText {
            pane_id: pane_id.to_string(),
            text: text.to_string(),
        });
        match inner.panes.get_mut(pane_id) {
            Some(pane) => {
                pane.sent.push(text.to_string());
                Ok(())
            }
            None => Err(TerminalError::NotFound(pane_id.to_string())),
        }
    }

    async fn is_alive(&self, pane_id: &str) -> Result<bool, TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TerminalCall::IsAlive {
            pane_id: pane_id.to_string(),
        });
        Ok(inner.panes.get(pane_id).map(|p| p.alive).unwrap_or(false))
    }

    async fn pane_log_path(&self, pane_id: &str) -> Result<Option<PathBuf>, TerminalError> {
        Ok(self.inner.lock().panes.get(pane_id).and_then(|p| p.log_path.clone()))
    }

    async fn ensure_pane_log(&self, pane_id: &str) -> Result<Option<PathBuf>, TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TerminalCall::EnsurePaneLog {
            pane_id: pane_id.to_string(),
        });
        match inner.panes.get(pane_id) {
            Some(pane) => Ok(pane.log_path.clone()),
            None => Err(TerminalError::NotFound(pane_id.to_string())),
        }
    }

    async fn respawn_pane(
        &self,
        pane_id: &str,
        cmd: &str,
        _cwd: &Path,
        _remain_on_exit: bool,
    ) -> Result<(), TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TerminalCall::RespawnPane {
            pane_id: pane_id.to_string(),
            cmd: cmd.to_string(),
        });
        match inner.panes.get_mut(pane_id) {
            Some(pane) => {
                pane.alive = true;
                Ok(())
            }
            None => Err(TerminalError::NotFound(pane_id.to_string())),
        }
    }

    async fn get_text(&self, pane_id: &str, lines: u32) -> Result<String, TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TerminalCall::GetText {
            pane_id: pane_id.to_string(),
            lines,
        });
        match inner.panes.get(pane_id) {
            Some(pane) => Ok(pane.text.clone()),
            None => Err(TerminalError::NotFound(pane_id.to_string())),
        }
    }

    async fn find_pane_by_title_marker(&self, marker: &str) -> Result<Option<String>, TerminalError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TerminalCall::FindPaneByTitleMarker {
            marker: marker.to_string(),
        });
        Ok(inner
            .panes
            .iter()
            .find(|(_, pane)| pane.title.contains(marker))
            .map(|(id, _)| id.clone()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
