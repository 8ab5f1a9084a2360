// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ccb_core::{CcbSessionId, ProviderBinding, TerminalKind};
use std::path::PathBuf;

fn sample() -> SessionDescriptor {
    SessionDescriptor {
        ccb_session_id: CcbSessionId::new("ccb-1"),
        terminal: TerminalKind::Tmux,
        pane_id: "%3".into(),
        pane_title_marker: None,
        work_dir: PathBuf::from("/proj"),
        runtime_dir: PathBuf::from("/proj/.ccb_config"),
        start_cmd: None,
        active: true,
        updated_at: 0,
        binding: ProviderBinding::Claude {
            claude_session_path: None,
            claude_session_id: Some("abc".into()),
        },
        extra: serde_json::Map::new(),
    }
}

#[test]
fn missing_descriptor_loads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".claude-session");
    assert!(load_descriptor(&path).unwrap().is_none());
}

#[test]
fn saved_descriptor_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".claude-session");

    let descriptor = sample();
    save_descriptor(&path, &descriptor).unwrap();

    let loaded = load_descriptor(&path).unwrap().unwrap();
    assert_eq!(loaded, descriptor);
}

#[test]
fn unknown_fields_survive_a_resave() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".claude-session");

    let mut descriptor = sample();
    descriptor
        .extra
        .insert("launcher_note".into(), serde_json::Value::String("keep me".into()));
    save_descriptor(&path, &descriptor).unwrap();

    let loaded = load_descriptor(&path).unwrap().unwrap();
    save_descriptor(&path, &loaded).unwrap();

    let reloaded = load_descriptor(&path).unwrap().unwrap();
    assert_eq!(reloaded.extra.get("launcher_note").unwrap(), "keep me");
}
