// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Finding and, when allowed, launching this provider's `ccbd`.

use crate::client::ClientError;
use std::path::PathBuf;
use std::process::Command;

/// Locate the `ccbd` binary to spawn: an explicit override, a sibling of
/// the running CLI binary, or bare `ccbd` resolved via `PATH`.
fn find_ccbd_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary_override() {
        return PathBuf::from(path);
    }

    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(dir) = current_exe.parent() {
            let sibling = dir.join("ccbd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("ccbd")
}

/// Start `ccbd --provider <prefix>` detached in the background.
pub fn start_daemon_background(prefix: &str) -> Result<std::process::Child, ClientError> {
    let ccbd_path = find_ccbd_binary();
    Command::new(&ccbd_path)
        .arg("--provider")
        .arg(prefix)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(format!("{}: {e}", ccbd_path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_ccbd_binary_falls_back_to_bare_name() {
        std::env::remove_var("CCB_DAEMON_BINARY");
        assert_eq!(find_ccbd_binary(), PathBuf::from("ccbd"));
    }

    #[test]
    fn find_ccbd_binary_honors_override() {
        std::env::set_var("CCB_DAEMON_BINARY", "/opt/ccb/ccbd");
        assert_eq!(find_ccbd_binary(), PathBuf::from("/opt/ccb/ccbd"));
        std::env::remove_var("CCB_DAEMON_BINARY");
    }
}
