// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured JSONL transcript reader (Claude/Codex).
//!
//! Tails an append-only JSONL file; each new line is parsed independently
//! so a torn trailing write (the assistant CLI is mid-append when we poll)
//! degrades to "carry it forward, try again next tick" rather than an error.

use super::{ReaderError, TranscriptEvent, TranscriptReader};
use async_trait::async_trait;
use ccb_core::ReaderCursor;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Which assistant CLI's JSONL shape to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonlFormat {
    /// `{"type":"user"|"assistant", "message":{"role":..,"content":[...]}, "isSidechain":bool}`
    Claude,
    /// `{"type":"response_item","payload":{"type":"message","role":..,"content":[{"type":"output_text"|"input_text","text":..}]}}`
    Codex,
}

/// Tails a JSONL transcript file, reparsing whole lines as they complete.
pub struct StructuredReader {
    format: JsonlFormat,
    poll_interval: Duration,
}

impl StructuredReader {
    pub fn new(format: JsonlFormat, poll_interval: Duration) -> Self {
        Self { format, poll_interval }
    }

    fn parse_line(&self, line: &str) -> Option<TranscriptEvent> {
        if line.trim().is_empty() {
            return None;
        }
        let value: Value = serde_json::from_str(line).ok()?;
        match self.format {
            JsonlFormat::Claude => Self::parse_claude(&value),
            JsonlFormat::Codex => Self::parse_codex(&value),
        }
    }

    fn parse_claude(value: &Value) -> Option<TranscriptEvent> {
        if value.get("isSidechain").and_then(Value::as_bool) == Some(true) {
            return None;
        }
        let message = value.get("message")?;
        let role = message.get("role").and_then(Value::as_str)?;
        let text = Self::claude_content_text(message.get("content")?);
        if text.is_empty() {
            return None;
        }
        match role {
            "user" => Some(TranscriptEvent::User(text)),
            "assistant" => Some(TranscriptEvent::Assistant(text)),
            _ => None,
        }
    }

    fn claude_content_text(content: &Value) -> String {
        match content {
            Value::String(s) => s.clone(),
            Value::Array(parts) => {
                let mut out = Vec::new();
                for part in parts {
                    match part.get("type").and_then(Value::as_str) {
                        Some("text") => {
                            if let Some(t) = part.get("text").and_then(Value::as_str) {
                                out.push(t.to_string());
                            }
                        }
                        Some("tool_use") | Some("tool_result") => {}
                        _ => {}
                    }
                }
                out.join("\n")
            }
            _ => String::new(),
        }
    }

    fn parse_codex(value: &Value) -> Option<TranscriptEvent> {
        if value.get("type").and_then(Value::as_str) != Some("response_item") {
            return None;
        }
        let payload = value.get("payload")?;
        if payload.get("type").and_then(Value::as_str) != Some("message") {
            return None;
        }
        let role = payload.get("role").and_then(Value::as_str)?;
        let content = payload.get("content").and_then(Value::as_array);
        let text: String = content
            .map(|items| {
                items
                    .iter()
                    .filter(|item| {
                        matches!(
                            item.get("type").and_then(Value::as_str),
                            Some("output_text") | Some("input_text")
                        )
                    })
                    .filter_map(|item| item.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();
        let text = if text.is_empty() {
            payload.get("message").and_then(Value::as_str)?.to_string()
        } else {
            text
        };
        if text.trim().is_empty() {
            return None;
        }
        match role {
            "user" => Some(TranscriptEvent::User(text)),
            "assistant" => Some(TranscriptEvent::Assistant(text)),
            _ => None,
        }
    }
}

async fn file_size(path: &PathBuf) -> u64 {
    tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

#[async_trait]
impl TranscriptReader for StructuredReader {
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

                let mut events = Vec::new();
                let mut start = 0;
                for (i, &b) in buf.iter().enumerate() {
                    if b == b'\n' {
                        let line = String::from_utf8_lossy(&buf[start..i]);
                        if let Some(event) = self.parse_line(&line) {
                            events.push(event);
                        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn write_lines(path: &PathBuf, lines: &[&str]) {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .unwrap();
        for line in lines {
            file.write_all(line.as_bytes()).await.unwrap();
            file.write_all(b"\n").await.unwrap();
        }
    }

    #[tokio::test]
    async fn claude_format_extracts_user_and_assistant_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        tokio::fs::File::create(&path).await.unwrap();

        let cursor = ReaderCursor::new(path.clone());
        let mut reader = StructuredReader::new(JsonlFormat::Claude, Duration::from_millis(10));

        write_lines(
            &path,
            &[
                r#"{"type":"user","message":{"role":"user","content":"CCB_REQ_ID: abc"}}"#,
                r#"{"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"hello"}]}}"#,
            ],
        )
        .await;

        let (events, _cursor) = reader
            .wait_for_events(cursor, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].is_user());
        assert!(events[1].is_assistant());
        assert_eq!(events[1].text(), "hello");
    }

    #[tokio::test]
    async fn claude_format_skips_sidechain_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        tokio::fs::File::create(&path).await.unwrap();

        let cursor = ReaderCursor::new(path.clone());
        let mut reader = StructuredReader::new(JsonlFormat::Claude, Duration::from_millis(10));

        write_lines(
            &path,
            &[r#"{"type":"user","message":{"role":"user","content":"hi"},"isSidechain":true}"#],
        )
        .await;

        let (events, _cursor) = reader
            .wait_for_events(cursor, Duration::from_millis(100))
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn codex_format_extracts_output_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollout.jsonl");
        tokio::fs::File::create(&path).await.unwrap();

        let cursor = ReaderCursor::new(path.clone());
        let mut reader = StructuredReader::new(JsonlFormat::Codex, Duration::from_millis(10));

        write_lines(
            &path,
            &[r#"{"type":"response_item","payload":{"type":"message","role":"assistant","content":[{"type":"output_text","text":"done"}]}}"#],
        )
        .await;

        let (events, _cursor) = reader
            .wait_for_events(cursor, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text(), "done");
    }

    #[tokio::test]
    async fn incomplete_trailing_line_is_carried_forward() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        tokio::fs::File::create(&path).await.unwrap();

        let cursor = ReaderCursor::new(path.clone());
        let mut reader = StructuredReader::new(JsonlFormat::Claude, Duration::from_millis(10));

        let mut file = tokio::fs::OpenOptions::new().append(true).open(&path).await.unwrap();
        file.write_all(br#"{"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"partial"#)
            .await
            .unwrap();

        let (events, cursor) = reader
            .wait_for_events(cursor, Duration::from_millis(80))
            .await
            .unwrap();
        assert!(events.is_empty());
        assert!(!cursor.carry_bytes.is_empty());
    }

    #[tokio::test]
    async fn capture_state_starts_at_current_end_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        write_lines(&path, &[r#"{"type":"user","message":{"role":"user","content":"hi"}}"#]).await;

        let reader = StructuredReader::new(JsonlFormat::Claude, Duration::from_millis(10));
        let cursor = reader.capture_state(path.clone()).await;
        assert_eq!(cursor.byte_offset, file_size(&path).await);
    }

    #[tokio::test]
    async fn truncated_file_resets_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        write_lines(
            &path,
            &[r#"{"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"first"}]}}"#],
        )
        .await;

        let mut cursor = ReaderCursor::new(path.clone());
        cursor.byte_offset = file_size(&path).await + 1000;

        let mut reader = StructuredReader::new(JsonlFormat::Claude, Duration::from_millis(10));
        let (events, cursor) = reader
            .wait_for_events(cursor, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(cursor.byte_offset > 0);
    }
}
