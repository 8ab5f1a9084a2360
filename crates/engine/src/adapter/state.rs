// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-flavor reply-detection state machines, kept pure and
//! synchronous (fed one event at a time) so the transition table is
//! unit-testable without any async plumbing. The driver loop in
//! `adapter::mod` owns the timing/rebind side of the table; these structs
//! own the anchor/begin/done classification.

use super::pane_log::is_noise_line;
use ccb_core::markers::{is_begin_line, is_done_line, is_done_text, is_req_id_line, strip_trailing_done};

const INTERRUPT_MARKER: &str = "Conversation interrupted";

fn is_protocol_marker_line(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("CCB_REQ_ID:") || t.starts_with("CCB_BEGIN:") || t.starts_with("CCB_DONE:")
}

fn is_recent_instruction_line(line: &str) -> bool {
    line.contains("IMPORTANT:") || line.contains("End your reply with this exact final line")
}

/// Structured-reader (JSONL) state machine: runs at event granularity over
/// `User`/`Assistant` transcript events.
#[derive(Debug)]
pub struct StructuredState {
    req_id: String,
    anchor_seen: bool,
    anchor_ms: Option<u64>,
    bound_at_ms: u64,
    buffer: String,
    done: bool,
    done_ms: Option<u64>,
}

impl StructuredState {
    pub fn new(req_id: impl Into<String>, bound_at_ms: u64) -> Self {
        Self {
            req_id: req_id.into(),
            anchor_seen: false,
            anchor_ms: None,
            bound_at_ms,
            buffer: String::new(),
            done: false,
            done_ms: None,
        }
    }

    /// Feed one user-role event; only the anchor is derived from these.
    pub fn feed_user(&mut self, text: &str, now_ms: u64) {
        if !self.anchor_seen && text.lines().any(|l| is_req_id_line(l, &self.req_id)) {
            self.anchor_seen = true;
            self.anchor_ms = Some(now_ms.saturating_sub(self.bound_at_ms));
        }
    }

    /// Feed one assistant-role event. Chunks arriving before the anchor is
    /// seen are dropped — they belong to a prior turn's reply, not ours
    /// (the anchor collect grace).
    pub fn feed_assistant(&mut self, text: &str, now_ms: u64) {
        if !self.anchor_seen || self.done {
            return;
        }
        self.buffer.push_str(text);
        self.buffer.push('\n');
        if is_done_text(&self.buffer, &self.req_id) {
            self.done = true;
            self.done_ms = Some(now_ms.saturating_sub(self.bound_at_ms));
        }
    }

    pub fn anchor_seen(&self) -> bool {
        self.anchor_seen
    }

    pub fn anchor_ms(&self) -> Option<u64> {
        self.anchor_ms
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn done_ms(&self) -> Option<u64> {
        self.done_ms
    }

    pub fn reply(&self) -> String {
        strip_trailing_done(&self.buffer, &self.req_id)
    }
}

/// Pane-log-reader state machine: runs line-by-line over raw, ANSI-stripped
/// scrollback text, classifying noise and the prompt echo itself along the
/// way to the COLLECTING state.
#[derive(Debug)]
pub struct PaneLogState {
    req_id: String,
    bound_at_ms: u64,
    anchor_seen: bool,
    anchor_ms: Option<u64>,
    prompt_echo_done: bool,
    recent_instruction: bool,
    saw_begin_tag: bool,
    response_seen: bool,
    done: bool,
    done_ms: Option<u64>,
    lines: Vec<String>,
}

impl PaneLogState {
    pub fn new(req_id: impl Into<String>, bound_at_ms: u64) -> Self {
        Self {
            req_id: req_id.into(),
            bound_at_ms,
            anchor_seen: false,
            anchor_ms: None,
            prompt_echo_done: false,
            recent_instruction: false,
            saw_begin_tag: false,
            response_seen: false,
            done: false,
            done_ms: None,
            lines: Vec::new(),
        }
    }

    pub fn feed_line(&mut self, line: &str, now_ms: u64) {
        self.lines.push(line.to_string());
        if self.done {
            return;
        }

        if !self.anchor_seen {
            if is_req_id_line(line, &self.req_id) {
                self.anchor_seen = true;
                self.anchor_ms = Some(now_ms.saturating_sub(self.bound_at_ms));
            }
            return;
        }

        if is_recent_instruction_line(line) {
            self.recent_instruction = true;
            return;
        }

        if is_done_line(line, &self.req_id) {
            if !self.prompt_echo_done && self.recent_instruction {
                self.prompt_echo_done = true;
                self.recent_instruction = false;
            } else if self.response_seen {
                self.done = true;
                self.done_ms = Some(now_ms.saturating_sub(self.bound_at_ms));
            }
            return;
        }

        if is_begin_line(line, &self.req_id) {
            // The prompt's own CCB_BEGIN echo arrives as its 2nd line, well
            // before the echoed IMPORTANT/CCB_DONE trailer sets
            // prompt_echo_done — so this flag just means "a BEGIN line has
            // gone by", independent of which echo pass it belongs to.
            self.saw_begin_tag = true;
            return;
        }

        if self.prompt_echo_done
            && self.saw_begin_tag
            && !is_noise_line(line)
            && !is_protocol_marker_line(line)
            && line.chars().any(|c| c.is_alphanumeric())
        {
            self.response_seen = true;
        }
    }

    /// `■ Conversation interrupted` appearing after our anchor (or with no
    /// anchor ever observed) means the terminal session ended mid-reply.
    pub fn interrupted(&self) -> bool {
        let anchor_idx = self.lines.iter().position(|l| is_req_id_line(l, &self.req_id));
        self.lines
            .iter()
            .enumerate()
            .any(|(i, l)| l.contains(INTERRUPT_MARKER) && anchor_idx.map_or(true, |a| i > a))
    }

    pub fn anchor_seen(&self) -> bool {
        self.anchor_seen
    }

    pub fn anchor_ms(&self) -> Option<u64> {
        self.anchor_ms
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn done_ms(&self) -> Option<u64> {
        self.done_ms
    }

    pub fn reply(&self) -> String {
        super::pane_log::extract_reply_from_pane(&self.lines, &self.req_id)
    }
}
