// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC server lifecycle: bind an ephemeral loopback port, publish
//! a discovery state file, accept one connection at a time per client, and
//! shut itself down after an idle period with no requests in flight.
//!
//! Follows `lifecycle.rs`'s startup/PID-lock shape (state
//! dir setup, `StorageError`-flavored failure reporting) and
//! `laskd_daemon.py`'s accept-loop/idle-timeout behavior from
//! `original_source/`; the framing itself is `wire.rs`'s newline-delimited
//! JSON rather than a length-prefixed binary protocol.

use crate::daemon_error::DaemonError;
use crate::handler::BrokerHandler;
use crate::wire::{self, CallResponse, PongResponse, ResponseMeta, WireError, WireRequest};
use ccb_adapters::NotifyAdapter;
use ccb_core::Provider;
use ccb_engine::{RequestHandler, WorkerPool};
use ccb_storage::{remove_if_owned_by, save_daemon_state, DaemonState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{info, warn};
use uuid::Uuid;

/// How often the idle-timeout watchdog wakes to check for inactivity.
/// Always shorter than any configured idle timeout so the shutdown lands
/// within one tick of it actually elapsing.
const WATCHDOG_TICK: Duration = Duration::from_secs(1);

/// Caps how many accepted connections are handled concurrently. Requests
/// are already serialized per session inside the `WorkerPool`; this only
/// bounds how many distinct clients can be mid-handshake at once.
const MAX_CONCURRENT_CONNECTIONS: usize = 32;

pub struct ServerConfig {
    pub provider: Provider,
    pub state_path: PathBuf,
    pub idle_timeout: Option<Duration>,
}

fn now_epoch_s() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// Bind the listener, publish the state file, and run the accept loop until
/// a `shutdown` request arrives or the idle timeout elapses. Removes the
/// state file (if it still names this process) before returning.
pub async fn run<N: NotifyAdapter>(
    handler: BrokerHandler<N>,
    config: ServerConfig,
) -> Result<(), DaemonError> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .map_err(|e| DaemonError::BindFailed("127.0.0.1:0".into(), e))?;
    let local_addr: SocketAddr = listener.local_addr().map_err(|e| DaemonError::BindFailed("local_addr".into(), e))?;

    let token = Uuid::new_v4().to_string();
    let pid = std::process::id();
    let state = DaemonState {
        pid,
        host: "127.0.0.1".into(),
        connect_host: "127.0.0.1".into(),
        port: local_addr.port(),
        token: token.clone(),
        started_at: now_epoch_s(),
    };
    save_daemon_state(&config.state_path, &state)?;
    let prefix = config.provider.spec().prefix;
    info!(port = local_addr.port(), prefix, "daemon listening");

    let pool = Arc::new(WorkerPool::new(Arc::new(handler)));
    let shutdown = Arc::new(Notify::new());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let last_activity = Arc::new(AtomicI64::new(now_epoch_s()));
    let connection_slots = Arc::new(tokio::sync::Semaphore::new(MAX_CONCURRENT_CONNECTIONS));

    if let Some(idle) = config.idle_timeout {
        let shutdown = shutdown.clone();
        let in_flight = in_flight.clone();
        let last_activity = last_activity.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(WATCHDOG_TICK).await;
                if in_flight.load(Ordering::SeqCst) > 0 {
                    continue;
                }
                let idle_for = now_epoch_s().saturating_sub(last_activity.load(Ordering::SeqCst));
                if idle_for >= idle.as_secs() as i64 {
                    info!(idle_for, "idle timeout elapsed, shutting down");
                    shutdown.notify_one();
                    break;
                }
            }
        });
    }

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("shutdown requested, stopping accept loop");
                break;
            }
            accepted = listener.accept() => {
                let (stream, _peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                let Ok(permit) = connection_slots.clone().try_acquire_owned() else {
                    warn!("connection slots exhausted, dropping client");
                    continue;
                };
                last_activity.store(now_epoch_s(), Ordering::SeqCst);
                let pool = pool.clone();
                let token = token.clone();
                let shutdown = shutdown.clone();
                let in_flight = in_flight.clone();
                let last_activity_conn = last_activity.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    in_flight.fetch_add(1, Ordering::SeqCst);
                    serve_connection(stream, &pool, &token, prefix, &shutdown).await;
                    last_activity_conn.store(now_epoch_s(), Ordering::SeqCst);
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                });
            }
        }
    }

    remove_if_owned_by(&config.state_path, pid)?;
    Ok(())
}

/// Handle exactly one request on an accepted connection, then close it.
async fn serve_connection<H: RequestHandler + 'static>(
    stream: TcpStream,
    pool: &Arc<WorkerPool<H>>,
    token: &str,
    prefix: &'static str,
    shutdown: &Arc<Notify>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = match wire::read_request(&mut reader).await {
        Ok(req) => req,
        Err(WireError::ConnectionClosed) => return,
        Err(e) => {
            warn!(error = %e, "malformed request");
            return;
        }
    };

    match request {
        WireRequest::Ping(_) => {
            let pong = PongResponse {
                msg_type: format!("{prefix}.pong"),
            };
            let _ = wire::write_response(&mut write_half, &pong).await;
        }
        WireRequest::Shutdown(shutdown_req) => {
            if shutdown_req.token == token {
                shutdown.notify_one();
            }
        }
        WireRequest::Call(call) => {
            if call.token != token {
                let response = CallResponse {
                    msg_type: format!("{prefix}.response"),
                    v: 1,
                    id: call.id.clone(),
                    req_id: String::new(),
                    exit_code: 1,
                    reply: "token mismatch".into(),
                    meta: ResponseMeta {
                        session_key: String::new(),
                        done_seen: false,
                        done_ms: None,
                        anchor_seen: false,
                        anchor_ms: None,
                        fallback_scan: false,
                    },
                };
                let _ = wire::write_response(&mut write_half, &response).await;
                return;
            }

            let id = call.id.clone();
            let timeout_s = call.timeout_s;
            let req = call.into_request();
            let session_key = pool.session_key_for(&req.work_dir).await;
            let rx = match pool.submit(req, session_key.clone()) {
                Ok(rx) => rx,
                Err(overflow) => {
                    let response = CallResponse {
                        msg_type: format!("{prefix}.response"),
                        v: 1,
                        id,
                        req_id: overflow.req_id,
                        exit_code: overflow.exit_code,
                        reply: overflow.reply,
                        meta: ResponseMeta {
                            session_key: overflow.session_key,
                            done_seen: overflow.done_seen,
                            done_ms: overflow.done_ms,
                            anchor_seen: overflow.anchor_seen,
                            anchor_ms: overflow.anchor_ms,
                            fallback_scan: overflow.fallback_scan,
                        },
                    };
                    let _ = wire::write_response(&mut write_half, &response).await;
                    return;
                }
            };

            let wait = if timeout_s < 0.0 {
                None
            } else {
                Some(Duration::from_secs_f64(timeout_s) + Duration::from_secs(5))
            };
            let outcome = match wait {
                Some(d) => tokio::time::timeout(d, rx).await.ok().and_then(|r| r.ok()),
                None => rx.await.ok(),
            };

            let response = match outcome {
                Some(result) => CallResponse {
                    msg_type: format!("{prefix}.response"),
                    v: 1,
                    id,
                    req_id: result.req_id,
                    exit_code: result.exit_code,
                    reply: result.reply,
                    meta: ResponseMeta {
                        session_key: result.session_key,
                        done_seen: result.done_seen,
                        done_ms: result.done_ms,
                        anchor_seen: result.anchor_seen,
                        anchor_ms: result.anchor_ms,
                        fallback_scan: result.fallback_scan,
                    },
                },
                None => CallResponse {
                    msg_type: format!("{prefix}.response"),
                    v: 1,
                    id,
                    req_id: String::new(),
                    exit_code: 2,
                    reply: String::new(),
                    meta: ResponseMeta {
                        session_key,
                        done_seen: false,
                        done_ms: None,
                        anchor_seen: false,
                        anchor_ms: None,
                        fallback_scan: false,
                    },
                },
            };
            let _ = wire::write_response(&mut write_half, &response).await;
        }
    }
}
