// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format for the RPC socket: one JSON object per line,
//! read/written over the accepted connection, following the same
//! encode/decode split as `protocol_wire.rs`, with the framing itself changed
//! from a 4-byte length prefix to newline-delimited JSON, which plays
//! nicer with a bare `nc`/`socat` probe than a binary frame would.

use ccb_core::Request;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed request: {0}")]
    Json(#[from] serde_json::Error),
}

/// One line-delimited request from a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireRequest {
    Call(CallRequest),
    Ping(PingRequest),
    Shutdown(ShutdownRequest),
}

/// `CallRequest`/`PingRequest`/`ShutdownRequest` also derive `Serialize` so
/// `ccb-cli` can build and emit the same wire types a client sends, rather
/// than hand-rolling a parallel JSON shape on the client side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub v: u32,
    pub id: String,
    pub token: String,
    pub work_dir: std::path::PathBuf,
    pub timeout_s: f64,
    pub message: String,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub output_path: Option<std::path::PathBuf>,
    #[serde(default)]
    pub no_wrap: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingRequest {
    #[serde(rename = "type")]
    pub msg_type: PingTag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PingTag {
    #[serde(rename = "ping")]
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownRequest {
    #[serde(rename = "type")]
    pub msg_type: ShutdownTag,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShutdownTag {
    #[serde(rename = "shutdown")]
    Shutdown,
}

impl CallRequest {
    pub fn into_request(self) -> Request {
        Request {
            id: self.id,
            work_dir: self.work_dir,
            timeout_s: self.timeout_s,
            message: self.message,
            quiet: self.quiet,
            output_path: self.output_path,
            no_wrap: self.no_wrap,
            caller: None,
            email_to: None,
            email_subject: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub session_key: String,
    pub done_seen: bool,
    pub done_ms: Option<u64>,
    pub anchor_seen: bool,
    pub anchor_ms: Option<u64>,
    pub fallback_scan: bool,
}

/// One line-delimited response sent back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResponse {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub v: u32,
    pub id: String,
    pub req_id: String,
    pub exit_code: i32,
    pub reply: String,
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongResponse {
    #[serde(rename = "type")]
    pub msg_type: String,
}

/// Read one line-delimited JSON request, failing with `ConnectionClosed` on EOF.
pub async fn read_request<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<WireRequest, WireError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(WireError::ConnectionClosed);
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

/// Write one line-delimited JSON response, flushing immediately.
pub async fn write_response<W: tokio::io::AsyncWrite + Unpin, T: Serialize>(
    writer: &mut W,
    response: &T,
) -> Result<(), WireError> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_a_call_request_line() {
        let raw = r#"{"type":"lask.request","v":1,"id":"r1","token":"tok","work_dir":"/proj","timeout_s":5.0,"message":"hi"}
"#;
        let mut reader = BufReader::new(raw.as_bytes());
        let parsed = read_request(&mut reader).await.unwrap();
        match parsed {
            WireRequest::Call(c) => {
                assert_eq!(c.id, "r1");
                assert_eq!(c.message, "hi");
            }
            _ => panic!("expected Call"),
        }
    }

    #[tokio::test]
    async fn reads_a_ping_request_line() {
        let raw = "{\"type\":\"ping\"}\n";
        let mut reader = BufReader::new(raw.as_bytes());
        assert!(matches!(read_request(&mut reader).await.unwrap(), WireRequest::Ping(_)));
    }

    #[tokio::test]
    async fn empty_stream_is_connection_closed() {
        let mut reader = BufReader::new(&b""[..]);
        assert!(matches!(read_request(&mut reader).await, Err(WireError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn write_response_appends_newline() {
        let mut buf = Vec::new();
        write_response(
            &mut buf,
            &PongResponse {
                msg_type: "lask.pong".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(buf.last(), Some(&b'\n'));
    }
}
