// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw pane-log reader (Claude fallback).
//!
//! Tails the terminal's raw scrollback log. Each physical line is stripped
//! of ANSI escapes and carriage returns are normalized to newlines; no
//! further classification happens here — that's the state machine's job,
//! so every line becomes a role-less `Line` event.

use super::{ReaderError, TranscriptEvent, TranscriptReader};
use async_trait::async_trait;
use ccb_core::ReaderCursor;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Strips ANSI CSI escape sequences (`ESC [ ... final-byte`), the form
/// terminal scrollback logs actually contain for color/cursor control.
fn strip_ansi(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch == '\u{1b}' && input[idx..].as_bytes().get(1) == Some(&b'[') {
            let rest = &input[idx + 2..];
            if let Some(final_pos) = rest.find(|c: char| ('\u{40}'..='\u{7e}').contains(&c)) {
                let skip_to = idx + 2 + final_pos + 1;
                while let Some((next_idx, _)) = chars.peek() {
                    if *next_idx < skip_to {
                        chars.next();
                    } else {
                        break;
                    }
                }
                continue;
            }
        }
        result.push(ch);
    }
    result
}

async fn file_size(path: &PathBuf) -> u64 {
    tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

/// Tails a raw terminal scrollback log.
pub struct PaneLogReader {
    poll_interval: Duration,
}

impl PaneLogReader {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

#[async_trait]
impl TranscriptReader for PaneLogReader {
    async fn capture_state(&self, log_path: PathBuf) -> ReaderCursor {
        let mut cursor = ReaderCursor::new(log_path.clone());
        cursor.byte_offset = file_size(&log_path).await;
        cursor
    }

    async fn wait_for_events(
        &mut self,
        mut cursor: ReaderCursor,
        timeout: Duration,
    ) -> Result<(Vec<TranscriptEvent>, ReaderCursor), ReaderError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let size = file_size(&cursor.log_path).await;
            cursor.reset_if_truncated(size);

            if size > cursor.byte_offset {
                let mut file = tokio::fs::File::open(&cursor.log_path).await?;
                file.seek(std::io::SeekFrom::Start(cursor.byte_offset)).await?;
                let mut data = Vec::new();
                file.read_to_end(&mut data).await?;

                let mut buf = std::mem::take(&mut cursor.carry_bytes);
                buf.extend_from_slice(&data);
                cursor.byte_offset += data.len() as u64;

                // normalize \r to \n before tokenizing, same as the original adapter.
                for b in buf.iter_mut() {
                    if *b == b'\r' {
                        *b = b'\n';
                    }
                }

                let mut events = Vec::new();
                let mut start = 0;
                for (i, &b) in buf.iter().enumerate() {
                    if b == b'\n' {
                        let raw = String::from_utf8_lossy(&buf[start..i]);
                        events.push(TranscriptEvent::Line(strip_ansi(&raw)));
                        start = i + 1;
                    }
                }
                cursor.carry_bytes = buf[start..].to_vec();

                if !events.is_empty() {
                    return Ok((events, cursor));
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Ok((Vec::new(), cursor));
            }
            tokio::time::sleep(self.poll_interval.min(Duration::from_millis(50))).await;
        }
    }
}
