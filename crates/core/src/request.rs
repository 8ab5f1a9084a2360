// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Request` and `ProviderResult`, and the error-kind taxonomy
//! every adapter failure is mapped into.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One inbound ask from a client, before a `req_id` is assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub work_dir: PathBuf,
    pub timeout_s: f64,
    pub message: String,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    #[serde(default)]
    pub no_wrap: bool,
    #[serde(default)]
    pub caller: Option<String>,
    #[serde(default)]
    pub email_to: Option<String>,
    #[serde(default)]
    pub email_subject: Option<String>,
}

impl Request {
    /// `timeout_s < 0` means wait indefinitely.
    pub fn is_unbounded(&self) -> bool {
        self.timeout_s < 0.0
    }
}

/// The error taxonomy every adapter failure maps into, independent of any one crate's error enum.
/// Every engine-level failure maps into exactly one of these before it is
/// turned into a `ProviderResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Ok,
    Config,
    Pane,
    Binding,
    Timeout,
    Protocol,
    TransientIo,
}

impl ResultKind {
    /// The exit code this kind surfaces to the client.
    pub fn exit_code(self) -> i32 {
        match self {
            ResultKind::Ok => 0,
            ResultKind::Config | ResultKind::Pane => 1,
            ResultKind::Binding | ResultKind::Timeout | ResultKind::Protocol => 2,
            ResultKind::TransientIo => 1,
        }
    }
}

/// The outcome of one request, returned to the RPC layer and then to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
    pub req_id: String,
    pub exit_code: i32,
    pub reply: String,
    pub session_key: String,
    pub done_seen: bool,
    pub anchor_seen: bool,
    pub anchor_ms: Option<u64>,
    pub done_ms: Option<u64>,
    pub fallback_scan: bool,
}

impl ProviderResult {
    pub fn from_kind(req_id: impl Into<String>, session_key: impl Into<String>, kind: ResultKind, reply: impl Into<String>) -> Self {
        Self {
            req_id: req_id.into(),
            exit_code: kind.exit_code(),
            reply: reply.into(),
            session_key: session_key.into(),
            done_seen: kind == ResultKind::Ok,
            anchor_seen: false,
            anchor_ms: None,
            done_ms: None,
            fallback_scan: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_timeout_detected() {
        let req = Request {
            id: "1".into(),
            work_dir: PathBuf::from("/p"),
            timeout_s: -1.0,
            message: "hi".into(),
            quiet: false,
            output_path: None,
            no_wrap: false,
            caller: None,
            email_to: None,
            email_subject: None,
        };
        assert!(req.is_unbounded());
    }

    #[test]
    fn exit_codes_match_result_kind_taxonomy() {
        assert_eq!(ResultKind::Ok.exit_code(), 0);
        assert_eq!(ResultKind::Timeout.exit_code(), 2);
        assert_eq!(ResultKind::Binding.exit_code(), 2);
        assert_eq!(ResultKind::Protocol.exit_code(), 2);
        assert_eq!(ResultKind::Pane.exit_code(), 1);
        assert_eq!(ResultKind::Config.exit_code(), 1);
    }

    #[test]
    fn from_kind_sets_done_seen_only_on_ok() {
        let ok = ProviderResult::from_kind("r1", "k1", ResultKind::Ok, "hi");
        assert!(ok.done_seen);
        let timeout = ProviderResult::from_kind("r1", "k1", ResultKind::Timeout, "");
        assert!(!timeout.done_seen);
    }
}
