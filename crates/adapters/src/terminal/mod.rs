// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal Backend Interface.
//!
//! A capability set, not a class hierarchy: every backend can inject text
//! and check liveness; the scrollback-log and respawn operations are
//! optional because not every backend supports them.

mod fake;
mod noop;
mod tmux;

pub use fake::{FakeTerminalBackend, TerminalCall};
pub use noop::NoOpTerminalBackend;
pub use tmux::TmuxBackend;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from terminal backend operations.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("pane not found: {0}")]
    NotFound(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("operation not supported by this backend")]
    Unsupported,
}

#[async_trait]
pub trait TerminalBackend: Clone + Send + Sync + 'static {
    /// Inject `text` into the pane followed by a submit keystroke, preserving
    /// newlines. Must tolerate arbitrary Unicode including embedded fences.
    async fn send_text(&self, pane_id: &str, text: &str) -> Result<(), TerminalError>;

    async fn is_alive(&self, pane_id: &str) -> Result<bool, TerminalError>;

    /// Path to the raw scrollback log, if this backend captures one.
    async fn pane_log_path(&self, pane_id: &str) -> Result<Option<PathBuf>, TerminalError>;

    /// Like `pane_log_path`, but starts capture if it isn't already running.
    async fn ensure_pane_log(&self, pane_id: &str) -> Result<Option<PathBuf>, TerminalError>;

    /// Re-establish scrollback capture for all known panes (e.g. after the
    /// backend process restarted). Default: a no-op for backends that don't
    /// need it.
    async fn refresh_pane_logs(&self) -> Result<(), TerminalError> {
        Ok(())
    }

    /// Respawn a dead pane in place, re-running `cmd` in `cwd`. Default:
    /// unsupported.
    async fn respawn_pane(
        &self,
        _pane_id: &str,
        _cmd: &str,
        _cwd: &Path,
        _remain_on_exit: bool,
    ) -> Result<(), TerminalError> {
        Err(TerminalError::Unsupported)
    }

    /// Save the pane's current scrollback to `path` before a respawn
    /// discards it. Default: a no-op.
    async fn save_crash_log(&self, _pane_id: &str, _path: &Path, _lines: u32) -> Result<(), TerminalError> {
        Ok(())
    }

    /// Tail-of-screen text (not the full scrollback log).
    async fn get_text(&self, pane_id: &str, lines: u32) -> Result<String, TerminalError>;

    /// Find a pane whose title contains `marker`, across all known sessions.
    async fn find_pane_by_title_marker(&self, _marker: &str) -> Result<Option<String>, TerminalError> {
        Ok(None)
    }
}
