// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tmux terminal backend.
//!
//! Every operation shells out to the `tmux` binary — no long-lived handle
//! to the tmux server is kept, so the backend tolerates tmux restarting
//! underneath it.

use super::{TerminalBackend, TerminalError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// tmux-based terminal backend.
#[derive(Clone)]
pub struct TmuxBackend {
    /// Directory pane scrollback logs are written under.
    log_dir: PathBuf,
}

impl TmuxBackend {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    fn log_path_for(&self, pane_id: &str) -> PathBuf {
        let safe = pane_id.replace(['%', '/'], "_");
        self.log_dir.join(format!("pane-{safe}.log"))
    }

    async fn is_piping(&self, pane_id: &str) -> Result<bool, TerminalError> {
        let output = Command::new("tmux")
            .args(["display-message", "-t", pane_id, "-p", "#{pane_pipe}"])
            .output()
            .await
            .map_err(|e| TerminalError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(TerminalError::NotFound(pane_id.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim() == "1")
    }
}

#[async_trait]
impl TerminalBackend for TmuxBackend {
    async fn send_text(&self, pane_id: &str, text: &str) -> Result<(), TerminalError> {
        // -l = literal mode (no key-name interpretation), -- ends option parsing
        // so text starting with '-' is not mistaken for a flag.
        let output = Command::new("tmux")
            .args(["send-keys", "-t", pane_id, "-l", "--", text])
            .output()
            .await
            .map_err(|e| TerminalError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(TerminalError::NotFound(pane_id.to_string()));
        }

        let enter = Command::new("tmux")
            .args(["send-keys", "-t", pane_id, "Enter"])
            .output()
            .await
            .map_err(|e| TerminalError::CommandFailed(e.to_string()))?;
        if !enter.status.success() {
            return Err(TerminalError::NotFound(pane_id.to_string()));
        }
        Ok(())
    }

    async fn is_alive(&self, pane_id: &str) -> Result<bool, TerminalError> {
        let output = Command::new("tmux")
            .args(["has-session", "-t", pane_id])
            .output()
            .await
            .map_err(|e| TerminalError::CommandFailed(e.to_string()))?;
        Ok(output.status.success())
    }

    async fn pane_log_path(&self, pane_id: &str) -> Result<Option<PathBuf>, TerminalError> {
        Ok(Some(self.log_path_for(pane_id)))
    }

    async fn ensure_pane_log(&self, pane_id: &str) -> Result<Option<PathBuf>, TerminalError> {
        let path = self.log_path_for(pane_id);
        if self.is_piping(pane_id).await.unwrap_or(false) {
            return Ok(Some(path));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TerminalError::CommandFailed(e.to_string()))?;
        }
        let output = Command::new("tmux")
            .args([
                "pipe-pane",
                "-o",
                "-t",
                pane_id,
                &format!("cat >> {}", shell_quote(&path)),
            ])
            .output()
            .await
            .map_err(|e| TerminalError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(pane_id, %stderr, "tmux pipe-pane failed");
            return Err(TerminalError::CommandFailed(stderr.to_string()));
        }
        Ok(Some(path))
    }

    async fn refresh_pane_logs(&self) -> Result<(), TerminalError> {
        let output = Command::new("tmux")
            .args(["list-panes", "-a", "-F", "#{pane_id}"])
            .output()
            .await
            .map_err(|e| TerminalError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Ok(());
        }
        for pane_id in String::from_utf8_lossy(&output.stdout).lines() {
            if !pane_id.is_empty() {
                let _ = self.ensure_pane_log(pane_id).await;
            }
        }
        Ok(())
    }

    async fn respawn_pane(
        &self,
        pane_id: &str,
        cmd: &str,
        cwd: &Path,
        remain_on_exit: bool,
    ) -> Result<(), TerminalError> {
        if remain_on_exit {
            let _ = Command::new("tmux")
                .args(["set-option", "-t", pane_id, "remain-on-exit", "on"])
                .output()
                .await;
        }
        let output = Command::new("tmux")
            .args(["respawn-pane", "-k", "-t", pane_id, "-c"])
            .arg(cwd)
            .arg(cmd)
            .output()
            .await
            .map_err(|e| TerminalError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TerminalError::CommandFailed(stderr.to_string()));
        }
        Ok(())
    }

    async fn save_crash_log(&self, pane_id: &str, path: &Path, lines: u32) -> Result<(), TerminalError> {
        let text = self.get_text(pane_id, lines).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TerminalError::CommandFailed(e.to_string()))?;
        }
        tokio::fs::write(path, text)
            .await
            .map_err(|e| TerminalError::CommandFailed(e.to_string()))
    }

    async fn get_text(&self, pane_id: &str, lines: u32) -> Result<String, TerminalError> {
        let output = Command::new("tmux")
            .args(["capture-pane", "-t", pane_id, "-p", "-S", &format!("-{lines}")])
            .output()
            .await
            .map_err(|e| TerminalError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(TerminalError::NotFound(pane_id.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn find_pane_by_title_marker(&self, marker: &str) -> Result<Option<String>, TerminalError> {
        let output = Command::new("tmux")
            .args(["list-panes", "-a", "-F", "#{pane_id} #{pane_title}"])
            .output()
            .await
            .map_err(|e| TerminalError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Ok(None);
        }
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            if let Some((id, title)) = line.split_once(' ') {
                if title.contains(marker) {
                    return Ok(Some(id.to_string()));
                }
            }
        }
        Ok(None)
    }
}

/// Minimal POSIX-shell single-quote escaping, sufficient for the fixed log
/// paths this backend generates itself.
fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "'\\''"))
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
