// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider Adapter: the request lifecycle from prompt framing
//! through reply extraction, reshaping, and the completion side-channel.
//!
//! The state machine runs identically regardless of which `TranscriptReader`
//! flavor is bound to it — `TranscriptEvent::Line` drives the pane-log
//! classifier, `User`/`Assistant` drive the structured-reader classifier —
//! so `run_request` is written once against the shared event enum rather
//! than duplicated per provider.
//!
//! Reader selection itself (which flavor a given request uses) is the
//! caller's decision: the structured reader is tried first when a provider
//! has one, with the pane-log reader as the universal fallback for Claude
//! when no structured transcript is bound yet — see `DESIGN.md` for why
//! this is the opposite order from the original Python adapter.

pub mod pane_log;
pub mod reshape;
pub mod state;

use ccb_adapters::{TerminalBackend, TerminalError, TranscriptEvent, TranscriptReader};
use ccb_core::cursor::ReaderCursor;
use ccb_core::markers::wrap_prompt;
use ccb_core::{ProviderResult, Request, ResultKind};
use state::{PaneLogState, StructuredState};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Which flavor of state machine is driving a request, wrapping the two
/// pure trackers of `state.rs` behind one event-feeding interface.
pub enum FlavorState {
    Structured(StructuredState),
    PaneLog(PaneLogState),
}

impl FlavorState {
    pub fn structured(req_id: impl Into<String>) -> Self {
        FlavorState::Structured(StructuredState::new(req_id, 0))
    }

    pub fn pane_log(req_id: impl Into<String>) -> Self {
        FlavorState::PaneLog(PaneLogState::new(req_id, 0))
    }

    fn feed(&mut self, event: &TranscriptEvent, now_ms: u64) {
        match (self, event) {
            (FlavorState::Structured(s), TranscriptEvent::User(t)) => s.feed_user(t, now_ms),
            (FlavorState::Structured(s), TranscriptEvent::Assistant(t)) => s.feed_assistant(t, now_ms),
            (FlavorState::PaneLog(s), TranscriptEvent::Line(t)) => s.feed_line(t, now_ms),
            _ => {}
        }
    }

    fn anchor_seen(&self) -> bool {
        match self {
            FlavorState::Structured(s) => s.anchor_seen(),
            FlavorState::PaneLog(s) => s.anchor_seen(),
        }
    }

    fn anchor_ms(&self) -> Option<u64> {
        match self {
            FlavorState::Structured(s) => s.anchor_ms(),
            FlavorState::PaneLog(s) => s.anchor_ms(),
        }
    }

    fn is_done(&self) -> bool {
        match self {
            FlavorState::Structured(s) => s.is_done(),
            FlavorState::PaneLog(s) => s.is_done(),
        }
    }

    fn done_ms(&self) -> Option<u64> {
        match self {
            FlavorState::Structured(s) => s.done_ms(),
            FlavorState::PaneLog(s) => s.done_ms(),
        }
    }

    fn reply(&self) -> String {
        match self {
            FlavorState::Structured(s) => s.reply(),
            FlavorState::PaneLog(s) => s.reply(),
        }
    }

    fn interrupted(&self) -> bool {
        match self {
            FlavorState::Structured(_) => false,
            FlavorState::PaneLog(s) => s.interrupted(),
        }
    }
}

/// Timing knobs for the request driver loop.
#[derive(Debug, Clone, Copy)]
pub struct AdapterTiming {
    /// Wall-clock with no anchor observed before rebinding in fallback
    /// (tail-last-N-bytes) mode.
    pub anchor_grace: Duration,
    /// How often pane liveness is rechecked.
    pub pane_check_interval: Duration,
    /// How far back a fallback rebind tails when no anchor has appeared.
    pub rebind_tail_bytes: u64,
    /// Granularity of each `wait_for_events` poll.
    pub poll_chunk: Duration,
}

impl Default for AdapterTiming {
    fn default() -> Self {
        Self {
            anchor_grace: Duration::from_millis(1500),
            pane_check_interval: Duration::from_secs(2),
            rebind_tail_bytes: 2 * 1024 * 1024,
            poll_chunk: Duration::from_millis(200),
        }
    }
}

async fn rebind_tail(log_path: PathBuf, tail_bytes: u64) -> ReaderCursor {
    let size = tokio::fs::metadata(&log_path).await.map(|m| m.len()).unwrap_or(0);
    let mut cursor = ReaderCursor::new(log_path);
    cursor.byte_offset = size.saturating_sub(tail_bytes);
    cursor
}

/// Drive one request to completion: inject the wrapped prompt, tail
/// `reader` until the DONE anchor resolves (or a deadline/pane-death/
/// interrupt aborts it), reshape the extracted reply, and return the
/// outcome. Does not itself notify completion — that's the caller's job,
/// since it also owns picking the right notifier for quiet/output_path
/// requests.
pub async fn run_request<T, R>(
    terminal: &T,
    reader: &mut R,
    pane_id: &str,
    log_path: PathBuf,
    req: &Request,
    req_id: &str,
    session_key: &str,
    mut state: FlavorState,
    timing: AdapterTiming,
) -> ProviderResult
where
    T: TerminalBackend,
    R: TranscriptReader,
{
    let wrapped = if req.no_wrap {
        req.message.clone()
    } else {
        wrap_prompt(&req.message, req_id)
    };
    if let Err(e) = terminal.send_text(pane_id, &wrapped).await {
        return pane_failure(req_id, session_key, &e);
    }

    let start = Instant::now();
    let deadline = if req.is_unbounded() {
        None
    } else {
        Some(start + Duration::from_secs_f64(req.timeout_s.max(0.0)))
    };

    let mut cursor = reader.capture_state(log_path.clone()).await;
    let mut last_pane_check = start;
    let mut fallback_scan = false;

    loop {
        if let Some(dl) = deadline {
            if Instant::now() >= dl {
                return ProviderResult::from_kind(req_id, session_key, ResultKind::Timeout, String::new());
            }
        }

        let (events, new_cursor) = match reader.wait_for_events(cursor, timing.poll_chunk).await {
            Ok(pair) => pair,
            Err(_) => (Vec::new(), ReaderCursor::new(log_path.clone())),
        };
        cursor = new_cursor;

        let now_ms = Instant::now().duration_since(start).as_millis() as u64;
        for event in &events {
            state.feed(event, now_ms);
        }

        if state.is_done() {
            let reply = reshape::reshape_reply(&req.message, &state.reply());
            let mut result = ProviderResult::from_kind(req_id, session_key, ResultKind::Ok, reply);
            result.anchor_seen = state.anchor_seen();
            result.anchor_ms = state.anchor_ms();
            result.done_ms = state.done_ms();
            result.fallback_scan = fallback_scan;
            return result;
        }

        if state.interrupted() {
            let mut result = ProviderResult::from_kind(req_id, session_key, ResultKind::Pane, "conversation interrupted");
            result.anchor_seen = state.anchor_seen();
            result.anchor_ms = state.anchor_ms();
            return result;
        }

        if !fallback_scan && !state.anchor_seen() && Instant::now().duration_since(start) >= timing.anchor_grace {
            fallback_scan = true;
            cursor = rebind_tail(log_path.clone(), timing.rebind_tail_bytes).await;
        }

        if Instant::now().duration_since(last_pane_check) >= timing.pane_check_interval {
            last_pane_check = Instant::now();
            match terminal.is_alive(pane_id).await {
                Ok(true) => {}
                Ok(false) => {
                    return ProviderResult::from_kind(req_id, session_key, ResultKind::Pane, "pane died");
                }
                Err(e) => return pane_failure(req_id, session_key, &e),
            }
        }
    }
}

fn pane_failure(req_id: &str, session_key: &str, e: &TerminalError) -> ProviderResult {
    ProviderResult::from_kind(req_id, session_key, ResultKind::Pane, format!("pane error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccb_adapters::FakeTerminalBackend;
    use ccb_core::ReaderCursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedReader {
        batches: Vec<Vec<TranscriptEvent>>,
        idx: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TranscriptReader for ScriptedReader {
        async fn capture_state(&self, log_path: PathBuf) -> ReaderCursor {
            ReaderCursor::new(log_path)
        }

        async fn wait_for_events(
            &mut self,
            cursor: ReaderCursor,
            _timeout: Duration,
        ) -> Result<(Vec<TranscriptEvent>, ReaderCursor), ccb_adapters::ReaderError> {
            let i = self.idx.fetch_add(1, Ordering::SeqCst);
            Ok((self.batches.get(i).cloned().unwrap_or_default(), cursor))
        }
    }

    fn req(timeout_s: f64) -> Request {
        Request {
            id: "r1".into(),
            work_dir: PathBuf::from("/proj"),
            timeout_s,
            message: "hi".into(),
            quiet: false,
            output_path: None,
            no_wrap: false,
            caller: None,
            email_to: None,
            email_subject: None,
        }
    }

    #[tokio::test]
    async fn structured_happy_path_returns_ok_with_reshaped_reply() {
        let terminal = FakeTerminalBackend::new();
        terminal.add_pane("%1", "pane");
        let mut reader = ScriptedReader {
            batches: vec![
                vec![TranscriptEvent::User("CCB_REQ_ID: r1\nCCB_BEGIN: r1\nhi".into())],
                vec![TranscriptEvent::Assistant("the answer\nCCB_DONE: r1\n".into())],
            ],
            idx: AtomicUsize::new(0),
        };

        let result = run_request(
            &terminal,
            &mut reader,
            "%1",
            PathBuf::from("/proj/log.jsonl"),
            &req(5.0),
            "r1",
            "key1",
            FlavorState::structured("r1"),
            AdapterTiming::default(),
        )
        .await;

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.reply, "the answer");
        assert!(result.anchor_seen);
    }

    #[tokio::test]
    async fn dead_pane_aborts_with_pane_result() {
        let terminal = FakeTerminalBackend::new();
        terminal.add_pane("%1", "pane");
        terminal.set_alive("%1", false);
        let mut reader = ScriptedReader {
            batches: vec![],
            idx: AtomicUsize::new(0),
        };

        let mut timing = AdapterTiming::default();
        timing.pane_check_interval = Duration::from_millis(1);
        timing.poll_chunk = Duration::from_millis(1);

        let result = run_request(
            &terminal,
            &mut reader,
            "%1",
            PathBuf::from("/proj/log.jsonl"),
            &req(5.0),
            "r1",
            "key1",
            FlavorState::structured("r1"),
            timing,
        )
        .await;

        assert_eq!(result.exit_code, 1);
        assert_eq!(result.reply, "pane died");
    }

    #[tokio::test]
    async fn timeout_without_done_returns_exit_code_two() {
        let terminal = FakeTerminalBackend::new();
        terminal.add_pane("%1", "pane");
        let mut reader = ScriptedReader {
            batches: vec![],
            idx: AtomicUsize::new(0),
        };

        let mut timing = AdapterTiming::default();
        timing.poll_chunk = Duration::from_millis(5);
        timing.pane_check_interval = Duration::from_secs(60);

        let result = run_request(
            &terminal,
            &mut reader,
            "%1",
            PathBuf::from("/proj/log.jsonl"),
            &req(0.02),
            "r1",
            "key1",
            FlavorState::structured("r1"),
            timing,
        )
        .await;

        assert_eq!(result.exit_code, 2);
    }
}
