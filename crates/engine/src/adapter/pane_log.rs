// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reply extraction from a raw pane-log transcript.
//!
//! The pane-log reader only tails and ANSI-strips; classifying spinner
//! frames, banner chatter, and the prompt echo as noise — and walking
//! backward from the DONE anchor to recover just the reply body — happens
//! here.

const SPINNER_CHARS: &[char] = &[
    '·', '.', '*', '✶', '✻', '✽', '✢', '✣', '✤', '✥', '✦', '✧', '✩', '✪', '✫', '✬', '✭', '✮', '✯',
];
const NOISE_PREFIXES: &[&str] = &["❯", "🤖"];
const NOISE_CONTAINS: &[&str] = &[
    "Bootstrapping",
    "thinking",
    "Frolicking",
    "Claude Code",
    "tokens",
    "bypass permissions",
    "CCB_REQ_ID:",
    "IMPORTANT:",
    "End your reply",
];

/// Is `line` banner/spinner/prompt-echo chatter rather than reply text?
pub fn is_noise_line(line: &str) -> bool {
    let stripped = line.trim();
    if stripped.is_empty() {
        return true;
    }
    if NOISE_PREFIXES.iter().any(|p| stripped.starts_with(p)) {
        return true;
    }
    if NOISE_CONTAINS.iter().any(|needle| stripped.contains(needle)) {
        return true;
    }
    if stripped.chars().count() <= 2 && stripped.chars().all(|c| SPINNER_CHARS.contains(&c)) {
        return true;
    }
    let has_alnum = stripped.chars().any(|c| c.is_alphanumeric());
    if !has_alnum
        && stripped
            .chars()
            .all(|c| "─-_=·*•".contains(c) || c.is_whitespace())
    {
        return true;
    }
    false
}

/// Strip a single leading bullet marker (`●`/`•`) the assistant's box
/// drawing adds to each reply paragraph.
pub fn strip_leading_marker(line: &str) -> &str {
    let trimmed = line.trim_start();
    trimmed
        .strip_prefix('●')
        .or_else(|| trimmed.strip_prefix('•'))
        .map(str::trim_start)
        .unwrap_or(trimmed)
}

/// Walk backward from the line carrying `CCB_DONE: <req_id>` collecting
/// non-noise lines until `max_gap` consecutive noise lines are hit or
/// `max_lines` of reply have been collected, then re-reverse and trim.
pub fn extract_reply_from_pane(lines: &[String], req_id: &str) -> String {
    const MAX_GAP: usize = 2;
    const MAX_LINES: usize = 200;

    let needle = format!("CCB_DONE: {req_id}");
    let Some(done_i) = lines.iter().rposition(|l| l.contains(&needle)) else {
        return String::new();
    };

    let mut out_rev: Vec<String> = Vec::new();
    let mut gaps = 0usize;
    for raw in lines[..done_i].iter().rev() {
        if is_noise_line(raw) {
            if !out_rev.is_empty() {
                gaps += 1;
                if gaps >= MAX_GAP {
                    break;
                }
            }
            continue;
        }
        gaps = 0;
        let cleaned = strip_leading_marker(raw);
        if cleaned.trim().is_empty() {
            continue;
        }
        out_rev.push(cleaned.trim_end().to_string());
        if out_rev.len() >= MAX_LINES {
            break;
        }
    }

    out_rev.reverse();
    while out_rev.first().is_some_and(|l| l.trim().is_empty()) {
        out_rev.remove(0);
    }
    while out_rev.last().is_some_and(|l| l.trim().is_empty()) {
        out_rev.pop();
    }
    out_rev.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn noise_prefixes_are_detected() {
        assert!(is_noise_line("❯ something"));
        assert!(is_noise_line("🤖 assistant banner"));
    }

    #[test]
    fn noise_contains_markers_are_detected() {
        assert!(is_noise_line("Bootstrapping the session..."));
        assert!(is_noise_line("CCB_REQ_ID: r1"));
    }

    #[test]
    fn spinner_only_lines_are_noise() {
        assert!(is_noise_line("·"));
        assert!(is_noise_line(".."));
    }

    #[test]
    fn plain_reply_text_is_not_noise() {
        assert!(!is_noise_line("Here is the fix you asked for."));
    }

    #[test]
    fn leading_bullet_marker_is_stripped() {
        assert_eq!(strip_leading_marker("● Done."), "Done.");
        assert_eq!(strip_leading_marker("no bullet"), "no bullet");
    }

    #[test]
    fn extracts_reply_body_between_noise_and_done_anchor() {
        let lines = lines(&[
            "CCB_REQ_ID: r1",
            "❯ Bootstrapping session",
            "● Here is the answer.",
            "It has two lines.",
            "·",
            "CCB_DONE: r1",
        ]);
        assert_eq!(
            extract_reply_from_pane(&lines, "r1"),
            "Here is the answer.\nIt has two lines."
        );
    }

    #[test]
    fn stops_after_max_gap_consecutive_noise_lines() {
        let lines = lines(&[
            "Real earlier content that should not appear.",
            "·",
            "·",
            "the reply",
            "CCB_DONE: r1",
        ]);
        assert_eq!(extract_reply_from_pane(&lines, "r1"), "the reply");
    }

    #[test]
    fn missing_done_anchor_yields_empty_reply() {
        let lines = lines(&["some text", "more text"]);
        assert_eq!(extract_reply_from_pane(&lines, "r1"), "");
    }
}
