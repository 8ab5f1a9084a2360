// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static per-provider identity: protocol prefix, file names, env var names.
//!
//! These are constants, not loaded configuration — the set of providers the
//! broker understands is fixed at compile time.

use std::fmt;

/// The four assistant CLIs the broker knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Claude,
    Codex,
    Gemini,
    OpenCode,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Claude,
        Provider::Codex,
        Provider::Gemini,
        Provider::OpenCode,
    ];

    pub fn spec(self) -> &'static ProviderSpec {
        match self {
            Provider::Claude => &CLAUDE,
            Provider::Codex => &CODEX,
            Provider::Gemini => &GEMINI,
            Provider::OpenCode => &OPENCODE,
        }
    }

    /// Parse from a CLI binary name or `--provider` argument (`lask`, `claude`, ...).
    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.spec().cli_tool_name == name || p.spec().prefix == name)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().prefix)
    }
}

/// Static facts about one provider: naming, file locations, defaults.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSpec {
    pub provider: Provider,
    /// Protocol prefix used in RPC message `type` fields and env var names (e.g. `lask`).
    pub prefix: &'static str,
    /// Name of the client CLI binary for this provider.
    pub cli_tool_name: &'static str,
    /// File name of the daemon's discovery state file under the run directory.
    pub state_file_name: &'static str,
    /// File name of the daemon's log file under the run directory.
    pub log_file_name: &'static str,
    /// File name of the per-project session descriptor (`.claude-session`, ...).
    pub descriptor_file_name: &'static str,
    /// Env var overriding the idle-timeout, in seconds (`0` disables).
    pub idle_timeout_env: &'static str,
    /// Name used for the daemon's PID lock file.
    pub lock_name: &'static str,
    /// Default idle timeout applied when `idle_timeout_env` is unset.
    pub default_idle_timeout_s: u64,
}

pub const CLAUDE: ProviderSpec = ProviderSpec {
    provider: Provider::Claude,
    prefix: "lask",
    cli_tool_name: "lask",
    state_file_name: "lask-state.json",
    log_file_name: "lask.log",
    descriptor_file_name: ".claude-session",
    idle_timeout_env: "CCB_LASK_IDLE_TIMEOUT_S",
    lock_name: "lask.lock",
    default_idle_timeout_s: 1800,
};

pub const CODEX: ProviderSpec = ProviderSpec {
    provider: Provider::Codex,
    prefix: "cask",
    cli_tool_name: "cask",
    state_file_name: "cask-state.json",
    log_file_name: "cask.log",
    descriptor_file_name: ".codex-session",
    idle_timeout_env: "CCB_CASK_IDLE_TIMEOUT_S",
    lock_name: "cask.lock",
    default_idle_timeout_s: 1800,
};

pub const GEMINI: ProviderSpec = ProviderSpec {
    provider: Provider::Gemini,
    prefix: "gask",
    cli_tool_name: "gask",
    state_file_name: "gask-state.json",
    log_file_name: "gask.log",
    descriptor_file_name: ".gemini-session",
    idle_timeout_env: "CCB_GASK_IDLE_TIMEOUT_S",
    lock_name: "gask.lock",
    default_idle_timeout_s: 1800,
};

pub const OPENCODE: ProviderSpec = ProviderSpec {
    provider: Provider::OpenCode,
    prefix: "oask",
    cli_tool_name: "oask",
    state_file_name: "oask-state.json",
    log_file_name: "oask.log",
    descriptor_file_name: ".opencode-session",
    idle_timeout_env: "CCB_OASK_IDLE_TIMEOUT_S",
    lock_name: "oask.lock",
    default_idle_timeout_s: 1800,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_tool_name_resolves_each_provider() {
        assert_eq!(Provider::from_tool_name("lask"), Some(Provider::Claude));
        assert_eq!(Provider::from_tool_name("cask"), Some(Provider::Codex));
        assert_eq!(Provider::from_tool_name("gask"), Some(Provider::Gemini));
        assert_eq!(Provider::from_tool_name("oask"), Some(Provider::OpenCode));
        assert_eq!(Provider::from_tool_name("nope"), None);
    }

    #[test]
    fn display_matches_prefix() {
        assert_eq!(Provider::Claude.to_string(), "lask");
    }

    #[test]
    fn all_specs_have_distinct_prefixes() {
        let mut prefixes: Vec<&str> = Provider::ALL.iter().map(|p| p.spec().prefix).collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), Provider::ALL.len());
    }
}
