// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derives the worker-pool routing key: `pane_title_marker` ∨ `pane_id` ∨
//! `session_id`, in that order.

/// Pick the first present key among the three candidates, in priority order.
pub fn derive(
    pane_title_marker: Option<&str>,
    pane_id: Option<&str>,
    session_id: Option<&str>,
) -> Option<String> {
    [pane_title_marker, pane_id, session_id]
        .into_iter()
        .find_map(|c| c.filter(|s| !s.is_empty()))
        .map(String::from)
}
