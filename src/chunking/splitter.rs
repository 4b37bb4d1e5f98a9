//! Boundary-aware text splitting.
//!
//! Produces overlapping spans over a transcript, preferring paragraph
//! breaks, then sentence breaks, then whitespace, and only cutting
//! mid-word when the text offers no boundary at all.

use crate::error::{GjenlydError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// A half-open byte span `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    /// Set when a single sentence exceeded the target size and was kept whole.
    pub oversized: bool,
}

/// Sentence terminator optionally followed by closing quotes/brackets,
/// then whitespace or the end of the haystack.
fn sentence_end_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[.!?]["')\]]*(?:\s|$)"#).expect("static regex"))
}

/// Split `text` into overlapping spans of at most `target_size` bytes.
///
/// Boundary priority: paragraph break, sentence break, whitespace, hard cut.
/// A sentence longer than `target_size` is emitted whole and flagged
/// oversized rather than cut mid-thought. Consecutive spans overlap by
/// `overlap` bytes of the previous span's tail, snapped forward so no span
/// starts mid-word.
pub fn split_spans(text: &str, target_size: usize, overlap: usize) -> Result<Vec<Span>> {
    if text.trim().is_empty() {
        return Err(GjenlydError::Chunking(
            "transcript text is empty".to_string(),
        ));
    }
    if target_size == 0 || overlap >= target_size {
        return Err(GjenlydError::Chunking(format!(
            "overlap ({}) must be smaller than target size ({})",
            overlap, target_size
        )));
    }

    let len = text.len();
    let mut spans: Vec<Span> = Vec::new();
    let mut start = 0usize;

    loop {
        if len - start <= target_size {
            spans.push(Span {
                start,
                end: len,
                oversized: false,
            });
            break;
        }

        let window_end = floor_char_boundary(text, start + target_size);
        let window = &text[start..window_end];

        let (cut, oversized) = if let Some(pos) = window.rfind("\n\n") {
            (start + pos + 2, false)
        } else if let Some(pos) = last_sentence_end(window) {
            (start + pos, false)
        } else if let Some(pos) = next_unit_end(text, window_end) {
            // the running sentence outgrew the budget: keep it whole
            (pos, true)
        } else if let Some(pos) = last_whitespace_end(window) {
            (start + pos, false)
        } else {
            // a single unbroken run longer than the budget
            (window_end, false)
        };

        spans.push(Span {
            start,
            end: cut,
            oversized,
        });

        if cut >= len {
            break;
        }

        // Overlap comes out of this span's tail only; snapping forward keeps
        // the next span off a word interior and never behind this span.
        let candidate = cut.saturating_sub(overlap).max(start + 1);
        start = snap_to_word_start(text, candidate, cut);
    }

    Ok(spans)
}

/// End offset (exclusive) of the last sentence boundary inside `window`.
fn last_sentence_end(window: &str) -> Option<usize> {
    sentence_end_re()
        .find_iter(window)
        .last()
        .map(|m| m.end())
}

/// End offset (exclusive) of the last whitespace run inside `window`.
fn last_whitespace_end(window: &str) -> Option<usize> {
    window
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
}

/// Absolute end of the semantic unit that is still open at `from`: the
/// nearest sentence end or paragraph break after it, whichever comes first.
fn next_unit_end(text: &str, from: usize) -> Option<usize> {
    let tail = &text[from..];
    let sentence = sentence_end_re().find(tail).map(|m| from + m.end());
    let paragraph = tail.find("\n\n").map(|p| from + p + 2);

    match (sentence, paragraph) {
        (Some(s), Some(p)) => Some(s.min(p)),
        (Some(s), None) => Some(s),
        (None, Some(p)) => Some(p),
        (None, None) => None,
    }
}

/// Largest char boundary not exceeding `pos`.
fn floor_char_boundary(text: &str, mut pos: usize) -> usize {
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Move `pos` forward to the start of the next word, but never past `limit`.
fn snap_to_word_start(text: &str, mut pos: usize, limit: usize) -> usize {
    while pos < limit && !text.is_char_boundary(pos) {
        pos += 1;
    }
    if pos >= limit {
        return limit;
    }

    let prev_is_ws = text[..pos]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_whitespace());
    if prev_is_ws {
        return pos;
    }

    match text[pos..limit].find(char::is_whitespace) {
        Some(off) => {
            let mut p = pos + off;
            while p < limit {
                match text[p..].chars().next() {
                    Some(c) if c.is_whitespace() => p += c.len_utf8(),
                    _ => break,
                }
            }
            p
        }
        None => limit,
    }
}
