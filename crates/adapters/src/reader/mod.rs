// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transcript Reader.
//!
//! Two flavors, same contract: tail an append-only transcript (JSONL for
//! Claude/Codex/OpenCode, a raw pane log as the Claude fallback) and emit
//! `(role, text)` events in file order with a resumable cursor.

mod opencode;
mod pane_log;
mod structured;

pub use opencode::OpenCodeReader;
pub use pane_log::PaneLogReader;
pub use structured::{JsonlFormat, StructuredReader};

use async_trait::async_trait;
use ccb_core::ReaderCursor;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("transcript file not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(String),
}

/// One transcript event. `Line` is the pane-log reader's role-less variant:
/// a raw log has no structured role tagging, so classification into
/// anchor/reply text is the engine's job, not the reader's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    User(String),
    Assistant(String),
    ToolUse(String),
    ToolResult(String),
    Line(String),
}

impl TranscriptEvent {
    pub fn text(&self) -> &str {
        match self {
            TranscriptEvent::User(t)
            | TranscriptEvent::Assistant(t)
            | TranscriptEvent::ToolUse(t)
            | TranscriptEvent::ToolResult(t)
            | TranscriptEvent::Line(t) => t,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, TranscriptEvent::User(_))
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, TranscriptEvent::Assistant(_))
    }
}

#[async_trait]
pub trait TranscriptReader: Send + Sync {
    /// Record `log_path`'s current end-of-file offset as a fresh cursor,
    /// without reading historical content.
    async fn capture_state(&self, log_path: std::path::PathBuf) -> ReaderCursor;

    /// Block up to `timeout` for new events past `cursor`. Incomplete
    /// trailing lines/records are carried forward in the returned cursor's
    /// `carry_bytes`, not emitted as events.
    async fn wait_for_events(
        &mut self,
        cursor: ReaderCursor,
        timeout: Duration,
    ) -> Result<(Vec<TranscriptEvent>, ReaderCursor), ReaderError>;
}
