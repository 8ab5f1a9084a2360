// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `BrokerHandler`: the `ccb_engine::RequestHandler` wired to a real pane
//! and a real transcript. Ties together the Session Resolver, the Terminal
//! Backend, the Transcript Reader selection, and the Provider Adapter for
//! one provider. One handler instance is shared (behind an `Arc`) by every
//! worker the pool spawns.

use async_trait::async_trait;
use ccb_adapters::reader::{JsonlFormat, OpenCodeReader};
use ccb_adapters::{
    FileNotifyAdapter, NotifyAdapter, PaneLogReader, StructuredReader, TerminalBackend, TmuxBackend,
};
use ccb_core::{IdGen, Provider, ProviderResult, ReqIdGen, Request, ResultKind};
use ccb_engine::resolver::{resolve_jsonl_binding, resolve_opencode_binding, TranscriptLocations};
use ccb_engine::{run_request, AdapterTiming, FlavorState, RequestHandler};
use ccb_storage::{load_descriptor, save_descriptor};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Wiring a handler needs beyond the provider identity itself: where a
/// JSONL-backed provider's transcripts live, and (for OpenCode) where its
/// SQLite session database lives.
pub struct HandlerLocations {
    pub jsonl: Option<TranscriptLocations>,
    pub opencode_db: Option<PathBuf>,
}

pub struct BrokerHandler<N> {
    provider: Provider,
    terminal: TmuxBackend,
    locations: HandlerLocations,
    scan_limit: usize,
    timing: AdapterTiming,
    notifier: N,
    req_ids: ReqIdGen,
}

impl<N: NotifyAdapter> BrokerHandler<N> {
    pub fn new(
        provider: Provider,
        terminal: TmuxBackend,
        locations: HandlerLocations,
        scan_limit: usize,
        timing: AdapterTiming,
        notifier: N,
    ) -> Self {
        Self {
            provider,
            terminal,
            locations,
            scan_limit,
            timing,
            notifier,
            req_ids: ReqIdGen::new(),
        }
    }

    fn descriptor_path(&self, work_dir: &std::path::Path) -> PathBuf {
        work_dir.join(".ccb_config").join(self.provider.spec().descriptor_file_name)
    }
}

#[async_trait]
impl<N: NotifyAdapter> RequestHandler for BrokerHandler<N> {
    async fn session_key_for(&self, work_dir: &std::path::Path) -> String {
        let desc_path = self.descriptor_path(work_dir);
        match load_descriptor(&desc_path) {
            Ok(Some(d)) => d.session_key(),
            _ => work_dir.to_string_lossy().into_owned(),
        }
    }

    async fn handle(&self, req: Request, session_key: &str) -> ProviderResult {
        let req_id = self.req_ids.next();
        let info_span = tracing::info_span!("request", req_id = %req_id, session_key = %session_key);
        let _enter = info_span.enter();
        info!("dispatching request");

        let desc_path = self.descriptor_path(&req.work_dir);
        let descriptor = match load_descriptor(&desc_path) {
            Ok(Some(d)) if d.active => d,
            Ok(Some(_)) => {
                let r = ProviderResult::from_kind(req_id.clone(), session_key, ResultKind::Config, "session inactive");
                warn!(exit_code = r.exit_code, "session inactive");
                return r;
            }
            Ok(None) => {
                let r = ProviderResult::from_kind(req_id.clone(), session_key, ResultKind::Config, "no session descriptor");
                warn!(exit_code = r.exit_code, "no session descriptor");
                return r;
            }
            Err(e) => {
                let r = ProviderResult::from_kind(req_id.clone(), session_key, ResultKind::Config, format!("descriptor error: {e}"));
                warn!(exit_code = r.exit_code, "descriptor load failed");
                return r;
            }
        };

        match self.terminal.is_alive(&descriptor.pane_id).await {
            Ok(true) => {}
            Ok(false) => {
                let r = ProviderResult::from_kind(req_id.clone(), session_key, ResultKind::Pane, "pane not alive");
                warn!(exit_code = r.exit_code, "pane not alive");
                return r;
            }
            Err(e) => {
                let r = ProviderResult::from_kind(req_id.clone(), session_key, ResultKind::Pane, format!("pane error: {e}"));
                warn!(exit_code = r.exit_code, "pane liveness check failed");
                return r;
            }
        }

        let mut state = match self.bind(&descriptor, &req_id).await {
            Some(state) => state,
            None => {
                let r = ProviderResult::from_kind(req_id.clone(), session_key, ResultKind::Binding, "");
                warn!(exit_code = r.exit_code, "no transcript binding found");
                return r;
            }
        };

        let mut updated = descriptor.clone();
        updated.updated_at = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0);
        let _ = save_descriptor(&desc_path, &updated);

        let result = match &mut state {
            BoundState::Structured(reader, log) => {
                run_request(
                    &self.terminal,
                    reader,
                    &descriptor.pane_id,
                    log.clone(),
                    &req,
                    &req_id,
                    session_key,
                    FlavorState::structured(req_id.clone()),
                    self.timing,
                )
                .await
            }
            BoundState::OpenCode(reader, db) => {
                run_request(
                    &self.terminal,
                    reader,
                    &descriptor.pane_id,
                    db.clone(),
                    &req,
                    &req_id,
                    session_key,
                    FlavorState::structured(req_id.clone()),
                    self.timing,
                )
                .await
            }
            BoundState::PaneLog(reader, log) => {
                run_request(
                    &self.terminal,
                    reader,
                    &descriptor.pane_id,
                    log.clone(),
                    &req,
                    &req_id,
                    session_key,
                    FlavorState::pane_log(req_id.clone()),
                    self.timing,
                )
                .await
            }
        };

        if result.exit_code == 0 {
            info!(exit_code = result.exit_code, done_ms = ?result.done_ms, "request completed");
        } else {
            warn!(exit_code = result.exit_code, "request failed");
        }

        if !req.quiet {
            let success = result.exit_code == 0;
            if let Some(path) = &req.output_path {
                let _ = FileNotifyAdapter::new(path.clone())
                    .notify_completion(&req_id, &result.reply, success)
                    .await;
            } else {
                let _ = self.notifier.notify_completion(&req_id, &result.reply, success).await;
            }
        }

        result
    }
}

/// The resolved transcript + reader pair a request will drive against.
enum BoundState {
    Structured(StructuredReader, PathBuf),
    OpenCode(OpenCodeReader, PathBuf),
    PaneLog(PaneLogReader, PathBuf),
}

impl<N: NotifyAdapter> BrokerHandler<N> {
    async fn bind(&self, descriptor: &ccb_core::SessionDescriptor, _req_id: &str) -> Option<BoundState> {
        if self.provider == Provider::OpenCode {
            let db = self.locations.opencode_db.as_ref()?;
            let session_id = resolve_opencode_binding(db, descriptor)?;
            let reader = OpenCodeReader::new(db.clone(), session_id, self.timing.poll_chunk);
            return Some(BoundState::OpenCode(reader, db.clone()));
        }

        let locations = self.locations.jsonl.as_ref();
        if let Some(locations) = locations {
            if let Some(path) = resolve_jsonl_binding(locations, descriptor, self.scan_limit) {
                let format = match self.provider {
                    Provider::Claude => JsonlFormat::Claude,
                    _ => JsonlFormat::Codex,
                };
                let reader = StructuredReader::new(format, self.timing.poll_chunk);
                return Some(BoundState::Structured(reader, path));
            }
        }

        if self.provider == Provider::Claude {
            let log_path = self.terminal.ensure_pane_log(&descriptor.pane_id).await.ok().flatten()?;
            let reader = PaneLogReader::new(self.timing.poll_chunk);
            return Some(BoundState::PaneLog(reader, log_path));
        }

        None
    }
}
