// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook-command completion notifier.
//!
//! Spawns a configured command with the req_id, status, and reply passed
//! as environment variables. The source's `notify_completion` side channel
//! also carries optional `email_*` fields whose exact semantics are left
//! to the external notifier; those pass through as additional
//! environment variables rather than being interpreted here.

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;
use tokio::process::Command;

/// Runs a shell command on every completion, fire-and-forget.
#[derive(Clone, Debug)]
pub struct HookNotifyAdapter {
    command: String,
    extra_env: Vec<(String, String)>,
}

impl HookNotifyAdapter {
    pub fn new(command: String) -> Self {
        Self {
            command,
            extra_env: Vec::new(),
        }
    }

    pub fn with_env(mut self, extra_env: Vec<(String, String)>) -> Self {
        self.extra_env = extra_env;
        self
    }
}

#[async_trait]
impl NotifyAdapter for HookNotifyAdapter {
    async fn notify_completion(&self, req_id: &str, reply: &str, success: bool) -> Result<(), NotifyError> {
        let status = if success { "ok" } else { "error" };
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .env("CCB_NOTIFY_REQ_ID", req_id)
            .env("CCB_NOTIFY_STATUS", status)
            .env("CCB_NOTIFY_REPLY", reply);
        for (key, value) in &self.extra_env {
            cmd.env(key, value);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NotifyError::SendFailed(stderr.to_string()));
        }
        Ok(())
    }
}
