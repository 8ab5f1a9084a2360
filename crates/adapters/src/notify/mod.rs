// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion-notifier adapters.
mod file;
mod hook;
mod noop;

pub use file::FileNotifyAdapter;
pub use hook::HookNotifyAdapter;
pub use noop::NoOpNotifyAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Fire-and-forget completion side-channel: carries the reply and req_id
/// once a request finishes, win or lose. Errors are for logging only —
/// nothing in the request path waits on or fails because of them.
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    async fn notify_completion(&self, req_id: &str, reply: &str, success: bool) -> Result<(), NotifyError>;
}
