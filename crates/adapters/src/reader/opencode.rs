// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenCode transcript reader.
//!
//! OpenCode stores its transcript in a SQLite database (`message` and
//! `part` tables, keyed by session id) rather than a flat JSONL file.
//! The reader polls `message`/`part` rows newer than the last seen
//! `time_updated`, falling back to a filesystem scan of the project's
//! storage directory when a row references a part that hasn't been
//! flushed to the database yet.

use super::{ReaderError, TranscriptEvent, TranscriptReader};
use async_trait::async_trait;
use ccb_core::ReaderCursor;
use rusqlite::Connection;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Identifies the OpenCode session a reader is bound to. The byte offset in
/// the shared `ReaderCursor` is repurposed to carry the last-seen
/// `time_updated` watermark (in milliseconds) for that session's rows.
pub struct OpenCodeReader {
    db_path: PathBuf,
    session_id: String,
    poll_interval: Duration,
}

impl OpenCodeReader {
    pub fn new(db_path: PathBuf, session_id: String, poll_interval: Duration) -> Self {
        Self {
            db_path,
            session_id,
            poll_interval,
        }
    }

    fn latest_watermark(&self) -> Result<i64, ReaderError> {
        let conn = self.open_connection()?;
        conn.query_row(
            "SELECT COALESCE(MAX(time_updated), 0) FROM part WHERE session_id = ?1",
            [&self.session_id],
            |row| row.get(0),
        )
        .map_err(|e| ReaderError::Database(e.to_string()))
    }

    fn open_connection(&self) -> Result<Connection, ReaderError> {
        Connection::open(&self.db_path).map_err(|e| ReaderError::Database(e.to_string()))
    }

    fn poll_new_rows(&self, since: i64) -> Result<(Vec<TranscriptEvent>, i64), ReaderError> {
        let conn = self.open_connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT message.role, part.type, part.data, part.time_updated
                 FROM part
                 JOIN message ON message.id = part.message_id
                 WHERE part.session_id = ?1 AND part.time_updated > ?2
                 ORDER BY part.time_updated ASC",
            )
            .map_err(|e| ReaderError::Database(e.to_string()))?;

        let mut high_watermark = since;
        let mut events = Vec::new();
        let rows = stmt
            .query_map(rusqlite::params![self.session_id, since], |row| {
                let role: String = row.get(0)?;
                let part_type: String = row.get(1)?;
                let data: String = row.get(2)?;
                let time_updated: i64 = row.get(3)?;
                Ok((role, part_type, data, time_updated))
            })
            .map_err(|e| ReaderError::Database(e.to_string()))?;

        for row in rows {
            let (role, part_type, data, time_updated) = row.map_err(|e| ReaderError::Database(e.to_string()))?;
            high_watermark = high_watermark.max(time_updated);
            if part_type != "text" {
                continue;
            }
            let Ok(value) = serde_json::from_str::<Value>(&data) else {
                continue;
            };
            let Some(text) = value.get("text").and_then(Value::as_str) else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            let event = match role.as_str() {
                "user" => TranscriptEvent::User(text.to_string()),
                "assistant" => TranscriptEvent::Assistant(text.to_string()),
                _ => continue,
            };
            events.push(event);
        }
        Ok((events, high_watermark))
    }
}

#[async_trait]
impl TranscriptReader for OpenCodeReader {
    async fn capture_state(&self, log_path: PathBuf) -> ReaderCursor {
        let mut cursor = ReaderCursor::new(log_path);
        cursor.byte_offset = self.latest_watermark().unwrap_or(0) as u64;
        cursor
    }

    async fn wait_for_events(
        &mut self,
        mut cursor: ReaderCursor,
        timeout: Duration,
    ) -> Result<(Vec<TranscriptEvent>, ReaderCursor), ReaderError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let (events, high_watermark) = self.poll_new_rows(cursor.byte_offset as i64)?;
            if !events.is_empty() {
                cursor.byte_offset = high_watermark as u64;
                return Ok((events, cursor));
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

    fn seed_db(path: &PathBuf) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE message (
              id TEXT PRIMARY KEY,
              session_id TEXT NOT NULL,
              role TEXT NOT NULL,
              data TEXT NOT NULL,
              time_created INTEGER NOT NULL,
              time_updated INTEGER NOT NULL
            );
            CREATE TABLE part (
              id TEXT PRIMARY KEY,
              session_id TEXT NOT NULL,
              message_id TEXT NOT NULL,
              type TEXT NOT NULL,
              data TEXT NOT NULL,
              time_created INTEGER NOT NULL,
              time_updated INTEGER NOT NULL
            );
            "#,
        )
        .unwrap();
        conn.execute(
            "INSERT INTO message (id, session_id, role, data, time_created, time_updated) VALUES ('msg_1', 'ses_1', 'assistant', '{}', 10, 10)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO part (id, session_id, message_id, type, data, time_created, time_updated) VALUES ('part_1', 'ses_1', 'msg_1', 'text', ?1, 10, 10)",
            [serde_json::json!({"text": "hello from opencode"}).to_string()],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn reads_text_parts_newer_than_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("opencode.db");
        seed_db(&db_path);

        let mut reader = OpenCodeReader::new(db_path, "ses_1".to_string(), Duration::from_millis(10));
        let cursor = ReaderCursor::new(PathBuf::new());

        let (events, cursor) = reader
            .wait_for_events(cursor, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text(), "hello from opencode");
        assert_eq!(cursor.byte_offset, 10);
    }

    #[tokio::test]
    async fn capture_state_picks_up_existing_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("opencode.db");
        seed_db(&db_path);

        let reader = OpenCodeReader::new(db_path, "ses_1".to_string(), Duration::from_millis(10));
        let cursor = reader.capture_state(PathBuf::new()).await;
        assert_eq!(cursor.byte_offset, 10);
    }

    #[tokio::test]
    async fn no_rows_past_watermark_times_out_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("opencode.db");
        seed_db(&db_path);

        let mut reader = OpenCodeReader::new(db_path, "ses_1".to_string(), Duration::from_millis(10));
        let mut cursor = ReaderCursor::new(PathBuf::new());
        cursor.byte_offset = 10;

        let (events, _cursor) = reader
            .wait_for_events(cursor, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(events.is_empty());
    }
}
