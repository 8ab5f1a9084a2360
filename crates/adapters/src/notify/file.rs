// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-path completion notifier.
//!
//! Writes the reply to the request's `output_path`, if one was given.
//! Fire-and-forget: callers log failures, they never fail the request.

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;
use std::path::PathBuf;

/// Writes completion replies to a fixed file path.
#[derive(Clone, Debug)]
pub struct FileNotifyAdapter {
    path: PathBuf,
}

impl FileNotifyAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl NotifyAdapter for FileNotifyAdapter {
    async fn notify_completion(&self, req_id: &str, reply: &str, success: bool) -> Result<(), NotifyError> {
        let status = if success { "ok" } else { "error" };
        let body = format!("req_id: {req_id}\nstatus: {status}\n\n{reply}\n");
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_reply_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let adapter = FileNotifyAdapter::new(path.clone());

        adapter.notify_completion("req-1", "hello world", true).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("req_id: req-1"));
        assert!(contents.contains("status: ok"));
        assert!(contents.contains("hello world"));
    }

    #[tokio::test]
    async fn failure_status_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let adapter = FileNotifyAdapter::new(path.clone());

        adapter.notify_completion("req-1", "boom", false).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("status: error"));
    }
}
