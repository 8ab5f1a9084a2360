// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenCode session binding: there is no per-session transcript file to
//! glob for, so binding means picking a row from OpenCode's own `session`
//! table (keyed by working directory) rather than walking the filesystem.

use super::path_normalize::path_within;
use rusqlite::Connection;

/// Find the most recently updated OpenCode session whose recorded
/// `directory` is the project directory or a descendant of it.
pub fn resolve_opencode_session(db_path: &std::path::Path, project: &str) -> Option<String> {
    let conn = Connection::open(db_path).ok()?;
    let mut stmt = conn
        .prepare("SELECT id, directory FROM session ORDER BY time_updated DESC")
        .ok()?;
    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let directory: String = row.get(1)?;
            Ok((id, directory))
        })
        .ok()?;
    for row in rows.flatten() {
        let (id, directory) = row;
        if path_within(project, &directory) {
            return Some(id);
        }
    }
    None
}
