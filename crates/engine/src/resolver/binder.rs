// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The three-tier transcript binding strategy: resume a known
//! session id directly, fall back to a provider's own session index, and
//! finally fall back to a bounded scan of recently modified transcripts
//! filtered by project directory. Shared by every JSONL-backed provider
//! (Claude, Codex, Gemini); OpenCode's SQLite-backed binding lives in
//! `opencode.rs` since it has no per-file transcript to glob for.

use super::path_normalize::path_within;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// What a resolver needs from the first few lines of a transcript file to
/// decide whether it belongs to the project being resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMeta {
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub is_sidechain: bool,
}

/// Read up to `max_lines` JSONL records looking for `sessionId`/`cwd`/
/// `isSidechain` fields. Malformed or unreadable files yield an empty meta
/// rather than an error — a resolver candidate that can't be read is simply
/// skipped by its caller.
pub fn read_session_meta(path: &Path, max_lines: usize) -> SessionMeta {
    let Ok(content) = fs::read_to_string(path) else {
        return SessionMeta::default();
    };
    let mut meta = SessionMeta::default();
    for line in content.lines().take(max_lines) {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };
        if meta.session_id.is_none() {
            meta.session_id = value
                .get("sessionId")
                .or_else(|| value.get("session_id"))
                .and_then(|v| v.as_str())
                .map(String::from);
        }
        if meta.cwd.is_none() {
            meta.cwd = value
                .get("cwd")
                .or_else(|| value.get("workspace"))
                .and_then(|v| v.as_str())
                .map(String::from);
        }
        if value
            .get("isSidechain")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            meta.is_sidechain = true;
        }
        if meta.session_id.is_some() && meta.cwd.is_some() {
            break;
        }
    }
    meta
}

fn walk_jsonl(root: &Path, out: &mut Vec<(PathBuf, SystemTime)>) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_jsonl(&path, out);
        } else if path.extension().is_some_and(|e| e == "jsonl") {
            if let Ok(meta) = entry.metadata() {
                if let Ok(mtime) = meta.modified() {
                    out.push((path, mtime));
                }
            }
        }
    }
}

/// Tier (a): the assistant was launched with `... resume <uuid>` — locate
/// that exact transcript by its file name, newest by mtime if more than one
/// provider directory happens to contain it.
pub fn find_log_for_session_id(root: &Path, session_id: &str) -> Option<PathBuf> {
    let want = format!("{session_id}.jsonl");
    let mut found: Vec<(PathBuf, SystemTime)> = Vec::new();
    walk_jsonl(root, &mut found);
    found
        .into_iter()
        .filter(|(p, _)| p.file_name().and_then(|n| n.to_str()) == Some(want.as_str()))
        .max_by_key(|(_, mtime)| *mtime)
        .map(|(p, _)| p)
}

/// One row of a provider's own `sessions-index.json`, trimmed to the fields
/// the resolver cares about.
#[derive(Debug, Clone, serde::Deserialize)]
struct IndexEntry {
    project: Option<String>,
    file: Option<PathBuf>,
    #[serde(default, rename = "fileMtime")]
    file_mtime: f64,
    #[serde(default, rename = "isSidechain")]
    is_sidechain: bool,
}

/// Tier (b): consult the provider's own index file, filtered to entries
/// whose recorded project matches and excluding sidechains, preferring the
/// highest recorded `fileMtime`.
pub fn resolve_from_sessions_index(index_path: &Path, project: &str) -> Option<PathBuf> {
    let content = fs::read_to_string(index_path).ok()?;
    let entries: Vec<IndexEntry> = serde_json::from_str(&content).ok()?;
    entries
        .into_iter()
        .filter(|e| !e.is_sidechain)
        .filter(|e| e.project.as_deref().is_some_and(|p| path_within(project, p)))
        .filter(|e| e.file.is_some())
        .max_by(|a, b| a.file_mtime.total_cmp(&b.file_mtime))
        .and_then(|e| e.file)
}

/// Tier (c): no direct id and no usable index — scan the `scan_limit` most
/// recently modified transcripts under `root`, reading each one's first
/// lines until a non-sidechain entry whose `cwd` is within `project` is
/// found.
pub fn scan_latest_log_for_work_dir(root: &Path, project: &str, scan_limit: usize) -> Option<PathBuf> {
    let mut candidates: Vec<(PathBuf, SystemTime)> = Vec::new();
    walk_jsonl(root, &mut candidates);
    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates.truncate(scan_limit);

    for (path, _) in candidates {
        let meta = read_session_meta(&path, 30);
        if meta.is_sidechain {
            continue;
        }
        if let Some(cwd) = &meta.cwd {
            if path_within(project, cwd) {
                return Some(path);
            }
        }
    }
    None
}

/// The full three-tier binding decision: try the explicit
/// `start_cmd` UUID first, then the provider's session index, then the
/// bounded mtime scan. Returns the winning transcript path, if any.
pub fn resolve_binding(
    transcript_root: &Path,
    start_cmd_uuid: Option<&str>,
    sessions_index: Option<&Path>,
    project: &str,
    scan_limit: usize,
) -> Option<PathBuf> {
    if let Some(id) = start_cmd_uuid {
        if let Some(path) = find_log_for_session_id(transcript_root, id) {
            return Some(path);
        }
    }
    if let Some(index) = sessions_index {
        if let Some(path) = resolve_from_sessions_index(index, project) {
            return Some(path);
        }
    }
    scan_latest_log_for_work_dir(transcript_root, project, scan_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_jsonl(path: &Path, lines: &[&str]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = File::create(path).unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
    }

    #[test]
    fn finds_log_by_uuid_file_name() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("proj1/abc-123.jsonl");
        write_jsonl(&target, &[r#"{"sessionId":"abc-123","cwd":"/proj1"}"#]);
        write_jsonl(&dir.path().join("proj2/other.jsonl"), &[r#"{"cwd":"/proj2"}"#]);

        let found = find_log_for_session_id(dir.path(), "abc-123").unwrap();
        assert_eq!(found, target);
    }

    #[test]
    fn scan_skips_sidechains_and_picks_matching_cwd() {
        let dir = tempdir().unwrap();
        let side = dir.path().join("a.jsonl");
        write_jsonl(&side, &[r#"{"cwd":"/proj","isSidechain":true}"#]);
        std::thread::sleep(std::time::Duration::from_millis(10));
        let real = dir.path().join("b.jsonl");
        write_jsonl(&real, &[r#"{"cwd":"/proj"}"#]);

        let found = scan_latest_log_for_work_dir(dir.path(), "/proj", 400).unwrap();
        assert_eq!(found, real);
    }

    #[test]
    fn scan_ignores_unrelated_project() {
        let dir = tempdir().unwrap();
        write_jsonl(&dir.path().join("a.jsonl"), &[r#"{"cwd":"/other"}"#]);
        assert!(scan_latest_log_for_work_dir(dir.path(), "/proj", 400).is_none());
    }

    #[test]
    fn sessions_index_prefers_highest_mtime_nonsidechain_match() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("sessions-index.json");
        let winner = dir.path().join("winner.jsonl");
        std::fs::write(
            &index_path,
            serde_json::json!([
                {"project": "/proj", "file": winner, "fileMtime": 100.0, "isSidechain": false},
                {"project": "/proj", "file": "/tmp/older.jsonl", "fileMtime": 10.0, "isSidechain": false},
                {"project": "/proj", "file": "/tmp/side.jsonl", "fileMtime": 999.0, "isSidechain": true},
            ])
            .to_string(),
        )
        .unwrap();

        let found = resolve_from_sessions_index(&index_path, "/proj").unwrap();
        assert_eq!(found, winner);
    }

    #[test]
    fn resolve_binding_prefers_uuid_tier_over_scan() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("known-id.jsonl");
        write_jsonl(&target, &[r#"{"cwd":"/elsewhere"}"#]);

        let found = resolve_binding(dir.path(), Some("known-id"), None, "/proj", 400).unwrap();
        assert_eq!(found, target);
    }
}
