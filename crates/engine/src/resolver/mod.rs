// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session Resolver: binds a project directory to the transcript
//! file an assistant CLI is actively writing, using the three-tier strategy
//! in `binder`, and keeps that binding fresh via the backoff schedule in
//! `monitor`.

pub mod binder;
pub mod monitor;
pub mod opencode;
pub mod path_normalize;

pub use binder::{resolve_binding, resolve_from_sessions_index, scan_latest_log_for_work_dir, SessionMeta};
pub use monitor::BindMonitor;
pub use opencode::resolve_opencode_session;
pub use path_normalize::{normalize_project_path, path_within};

use ccb_core::SessionDescriptor;
use std::path::{Path, PathBuf};

/// Where a JSONL-backed provider keeps its per-session transcripts, and
/// (optionally) a session index file that speeds up tier-b binding.
pub struct TranscriptLocations {
    pub transcript_root: PathBuf,
    pub sessions_index: Option<PathBuf>,
}

/// Resolve a JSONL-backed provider's (Claude, Codex, Gemini) active
/// transcript for `descriptor`'s project, per the three-tier strategy.
pub fn resolve_jsonl_binding(
    locations: &TranscriptLocations,
    descriptor: &SessionDescriptor,
    scan_limit: usize,
) -> Option<PathBuf> {
    let project = descriptor.work_dir.to_string_lossy();
    resolve_binding(
        &locations.transcript_root,
        descriptor.start_cmd_uuid().as_deref(),
        locations.sessions_index.as_deref(),
        &project,
        scan_limit,
    )
}

/// Resolve an OpenCode session id for `descriptor`'s project from its
/// SQLite session table.
pub fn resolve_opencode_binding(db_path: &Path, descriptor: &SessionDescriptor) -> Option<String> {
    let project = descriptor.work_dir.to_string_lossy();
    resolve_opencode_session(db_path, &project)
}
