// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The client half of the RPC round trip: find or start the
//! matching `ccbd`, send one `CallRequest` line, read one `CallResponse`
//! line back.
//!
//! Follows the same connect/autostart/retry shape as
//! `DaemonClient::connect_or_start`/`connect_with_retry`, re-expressed
//! against a TCP+token discovery handshake instead of a Unix socket, and
//! against the newline-delimited JSON protocol in `ccb_daemon::wire` instead
//! of a length-prefixed binary one.

use ccb_core::{IdGen, Provider, ReqIdGen};
use ccb_daemon::wire::{CallRequest, CallResponse, ShutdownRequest, ShutdownTag};
use ccb_storage::{load_daemon_state, DaemonState};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon disabled via CCB_{0}=0")]
    Disabled(String),

    #[error("daemon not running and autostart is disabled")]
    DaemonNotRunning,

    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("timed out waiting for daemon to become reachable")]
    DaemonStartTimeout,

    #[error("no reply from daemon within timeout_s plus client grace period")]
    ResponseTimeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed response from daemon: {0}")]
    Json(#[from] serde_json::Error),

    #[error("daemon closed the connection without responding")]
    ConnectionClosed,

    #[error("could not determine a home directory for the state file")]
    NoStateDir,
}

/// A thin client bound to one provider's daemon.
pub struct BrokerClient {
    provider: Provider,
    id_gen: ReqIdGen,
}

impl BrokerClient {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            id_gen: ReqIdGen::new(),
        }
    }

    fn prefix_upper(&self) -> String {
        self.provider.spec().prefix.to_uppercase()
    }

    fn state_path(&self) -> Result<PathBuf, ClientError> {
        if let Some(path) = crate::env::state_file_override(&self.prefix_upper()) {
            return Ok(path);
        }
        let home = dirs::home_dir().ok_or(ClientError::NoStateDir)?;
        Ok(home.join(".ccb").join("run").join(self.provider.spec().state_file_name))
    }

    /// Load the current state file, if any, without checking reachability.
    fn read_state(&self) -> Result<Option<DaemonState>, ClientError> {
        let path = self.state_path()?;
        Ok(load_daemon_state(&path)?)
    }

    /// Connect to an already-known daemon and confirm it answers a ping.
    async fn probe(state: &DaemonState) -> bool {
        let Ok(mut stream) = TcpStream::connect((state.connect_host.as_str(), state.port)).await else {
            return false;
        };
        if stream.write_all(b"{\"type\":\"ping\"}\n").await.is_err() {
            return false;
        }
        let mut buf = vec![0u8; 64];
        matches!(tokio::io::AsyncReadExt::read(&mut stream, &mut buf).await, Ok(n) if n > 0)
    }

    /// Resolve a reachable daemon, autostarting one if allowed and none is found.
    async fn ensure_daemon(&self) -> Result<DaemonState, ClientError> {
        let prefix_upper = self.prefix_upper();
        if !crate::env::enabled(&prefix_upper) {
            return Err(ClientError::Disabled(prefix_upper));
        }

        if let Some(state) = self.read_state()? {
            if Self::probe(&state).await {
                return Ok(state);
            }
        }

        if !crate::env::autostart(&prefix_upper) {
            return Err(ClientError::DaemonNotRunning);
        }

        let prefix = self.provider.spec().prefix;
        let mut child = crate::daemon_process::start_daemon_background(prefix)?;
        let deadline = Instant::now() + crate::env::connect_timeout();
        loop {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(ClientError::DaemonStartFailed(format!("ccbd exited with {status}")));
            }
            if let Some(state) = self.read_state()? {
                if Self::probe(&state).await {
                    return Ok(state);
                }
            }
            if Instant::now() >= deadline {
                return Err(ClientError::DaemonStartTimeout);
            }
            tokio::time::sleep(crate::env::connect_poll_interval()).await;
        }
    }

    /// Send one message and wait for the reply.
    ///
    /// `sync` lifts the client's own read-grace ceiling entirely, required
    /// for `timeout_s < 0`, which waits indefinitely until the connection
    /// closes or the daemon shuts down.
    pub async fn call(
        &self,
        message: String,
        timeout_s: f64,
        quiet: bool,
        output_path: Option<PathBuf>,
        no_wrap: bool,
        sync: bool,
    ) -> Result<CallResponse, ClientError> {
        let state = self.ensure_daemon().await?;
        let work_dir = std::env::current_dir()?;
        let request = CallRequest {
            msg_type: format!("{}.request", self.provider.spec().prefix),
            v: 1,
            id: self.id_gen.next(),
            token: state.token.clone(),
            work_dir,
            timeout_s,
            message,
            quiet,
            output_path,
            no_wrap,
        };

        let mut stream = TcpStream::connect((state.connect_host.as_str(), state.port)).await?;
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        stream.write_all(line.as_bytes()).await?;

        let (read_half, _write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let read_fut = async {
            let mut raw = String::new();
            let n = reader.read_line(&mut raw).await?;
            if n == 0 {
                return Err(ClientError::ConnectionClosed);
            }
            Ok::<CallResponse, ClientError>(serde_json::from_str(raw.trim_end())?)
        };

        if sync || timeout_s < 0.0 {
            read_fut.await
        } else {
            let ceiling = Duration::from_secs_f64(timeout_s.max(0.0)) + crate::env::read_grace();
            match tokio::time::timeout(ceiling, read_fut).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::ResponseTimeout),
            }
        }
    }

    /// Ping the daemon without starting one (used by `ccb status`).
    pub async fn ping(&self) -> Result<bool, ClientError> {
        match self.read_state()? {
            Some(state) => Ok(Self::probe(&state).await),
            None => Ok(false),
        }
    }

    /// Ask a running daemon to shut down. Returns `false` if none was running.
    pub async fn shutdown(&self) -> Result<bool, ClientError> {
        let Some(state) = self.read_state()? else {
            return Ok(false);
        };
        if !Self::probe(&state).await {
            return Ok(false);
        }
        let mut stream = TcpStream::connect((state.connect_host.as_str(), state.port)).await?;
        let mut line = serde_json::to_string(&ShutdownRequest {
            msg_type: ShutdownTag::Shutdown,
            token: state.token,
        })?;
        line.push('\n');
        stream.write_all(line.as_bytes()).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_path_honors_override() {
        std::env::set_var("CCB_LASK_STATE_FILE", "/tmp/lask-custom-state.json");
        let client = BrokerClient::new(Provider::Claude);
        assert_eq!(client.state_path().unwrap(), PathBuf::from("/tmp/lask-custom-state.json"));
        std::env::remove_var("CCB_LASK_STATE_FILE");
    }

    #[test]
    fn state_path_defaults_under_home() {
        std::env::remove_var("CCB_LASK_STATE_FILE");
        let client = BrokerClient::new(Provider::Claude);
        let path = client.state_path().unwrap();
        assert!(path.ends_with(".ccb/run/lask-state.json"));
    }
}
