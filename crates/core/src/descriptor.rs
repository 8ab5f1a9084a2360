// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-project session descriptor (`SessionDescriptor`).
//!
//! Lives on disk at `<project>/.ccb_config/.<provider>-session`. Rewritten
//! atomically (see `ccb_storage::safe_write`); never partially observed by a
//! concurrent reader.
//!
//! The provider-specific transcript binding is a tagged variant so each
//! provider carries only the fields it needs, per the "closed schema" design
//! note — but unknown keys a launcher wrote that this binary doesn't know
//! about are preserved round-trip via `extra`, rather than clobbered on
//! rewrite.

use crate::session::CcbSessionId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which terminal multiplexer/emulator hosts the pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalKind {
    Tmux,
    WezTerm,
    ITerm2,
}

/// Provider-specific transcript binding, tagged by provider name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderBinding {
    Claude {
        #[serde(skip_serializing_if = "Option::is_none")]
        claude_session_path: Option<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        claude_session_id: Option<String>,
    },
    Codex {
        #[serde(skip_serializing_if = "Option::is_none")]
        codex_session_path: Option<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        codex_session_id: Option<String>,
    },
    Gemini {
        #[serde(skip_serializing_if = "Option::is_none")]
        gemini_session_path: Option<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        gemini_session_id: Option<String>,
    },
    OpenCode {
        #[serde(skip_serializing_if = "Option::is_none")]
        opencode_session_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        opencode_project_id: Option<String>,
    },
}

impl ProviderBinding {
    /// The session/transcript id this binding currently points at, if bound.
    pub fn bound_id(&self) -> Option<&str> {
        match self {
            ProviderBinding::Claude { claude_session_id, .. } => claude_session_id.as_deref(),
            ProviderBinding::Codex { codex_session_id, .. } => codex_session_id.as_deref(),
            ProviderBinding::Gemini { gemini_session_id, .. } => gemini_session_id.as_deref(),
            ProviderBinding::OpenCode { opencode_session_id, .. } => opencode_session_id.as_deref(),
        }
    }

    /// The transcript file path this binding points at, if the provider uses one.
    pub fn bound_path(&self) -> Option<&std::path::Path> {
        match self {
            ProviderBinding::Claude { claude_session_path, .. } => claude_session_path.as_deref(),
            ProviderBinding::Codex { codex_session_path, .. } => codex_session_path.as_deref(),
            ProviderBinding::Gemini { gemini_session_path, .. } => gemini_session_path.as_deref(),
            ProviderBinding::OpenCode { .. } => None,
        }
    }
}

/// The full on-disk session descriptor for one project/provider pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub ccb_session_id: CcbSessionId,
    pub terminal: TerminalKind,
    pub pane_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pane_title_marker: Option<String>,
    pub work_dir: PathBuf,
    pub runtime_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cmd: Option<String>,
    pub active: bool,
    pub updated_at: i64,
    #[serde(flatten)]
    pub binding: ProviderBinding,
    /// Fields neither this binary nor an earlier version recognizes;
    /// preserved verbatim across a rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionDescriptor {
    /// The session key used to route requests to a worker: `pane_title_marker`
    /// ∨ `pane_id` ∨ bound provider session id, in that order.
    pub fn session_key(&self) -> String {
        crate::session_key::derive(
            self.pane_title_marker.as_deref(),
            Some(&self.pane_id),
            self.binding.bound_id(),
        )
        .unwrap_or_else(|| self.ccb_session_id.to_string())
    }

    /// UUID embedded in `start_cmd` such as `claude resume <uuid>` / `codex resume <uuid>`,
    /// authoritative over any stored binding.
    pub fn start_cmd_uuid(&self) -> Option<String> {
        let cmd = self.start_cmd.as_ref()?;
        let idx = cmd.find("resume")?;
        let rest = cmd[idx + "resume".len()..].trim_start();
        let token: String = rest
            .chars()
            .take_while(|c| c.is_ascii_hexdigit() || *c == '-')
            .collect();
        if token.len() == 36 {
            Some(token)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionDescriptor {
        SessionDescriptor {
            ccb_session_id: CcbSessionId::new("ccb-1"),
            terminal: TerminalKind::Tmux,
            pane_id: "%3".into(),
            pane_title_marker: None,
            work_dir: PathBuf::from("/proj"),
            runtime_dir: PathBuf::from("/proj/.ccb_config"),
            start_cmd: Some("claude resume 123e4567-e89b-12d3-a456-426614174000".into()),
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
    fn session_key_prefers_pane_title_marker() {
        let mut d = sample();
        d.pane_title_marker = Some("marker-1".into());
        assert_eq!(d.session_key(), "marker-1");
    }

    #[test]
    fn session_key_falls_back_to_pane_id() {
        let d = sample();
        assert_eq!(d.session_key(), "%3");
    }

    #[test]
    fn start_cmd_uuid_extracted() {
        let d = sample();
        assert_eq!(
            d.start_cmd_uuid().as_deref(),
            Some("123e4567-e89b-12d3-a456-426614174000")
        );
    }

    #[test]
    fn start_cmd_uuid_absent_without_resume() {
        let mut d = sample();
        d.start_cmd = Some("claude".into());
        assert_eq!(d.start_cmd_uuid(), None);
    }

    #[test]
    fn unknown_fields_round_trip_through_extra() {
        let mut d = sample();
        d.extra.insert(
            "launcher_note".into(),
            serde_json::Value::String("do not remove".into()),
        );
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["launcher_note"], "do not remove");
        let back: SessionDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back.extra.get("launcher_note").unwrap(), "do not remove");
    }

    #[test]
    fn bound_id_reads_provider_specific_field() {
        let d = sample();
        assert_eq!(d.binding.bound_id(), Some("abc"));
    }
}
