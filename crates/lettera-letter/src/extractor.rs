//! Letter body extraction from noisy assistant replies.
//!
//! Strategies run in order and the first one producing non-empty cleaned
//! text wins: sentinel span, opening anchor, closing anchor, whole-text
//! fallback. The single pass is then repeated on its own output until
//! nothing changes, so `extract` is idempotent by construction.

use std::sync::LazyLock;

use regex::Regex;

use crate::detector::sentinel_span;
use crate::patterns::{
    strip_sentinels, CHAT_CLOSING_LINE, CLOSER_LINE, OPENER_LINE, PREFACE_LINE, SUBJECT_LINE,
    SUMMARY_INTRO_LINE,
};

/// Default length the cleaned text must exceed for the whole-text fallback.
pub const DEFAULT_FALLBACK_MIN_CHARS: usize = 200;

/// Bullet recaps shorter than this are treated as bookkeeping, not letters.
const SUMMARY_MAX_CHARS: usize = 800;
/// Salutation and closing lines are short; longer lines are prose.
const ANCHOR_LINE_MAX_CHARS: usize = 120;
const NAME_LINE_MAX_CHARS: usize = 60;

static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*_]\s*){3,}$").expect("rule regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)#{1,6}\s+").expect("heading regex"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•‣◦·]|\d{1,2}[.)])\s+\S").expect("bullet regex"));
static LABELED_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]\s*)?(?:\*\*)?\p{L}[\p{L} '’/]{0,30}(?:\*\*)?\s*:(?:\*\*)?\s*\S")
        .expect("labeled field regex")
});
static PROPER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\p{Lu}[\p{L}'’.\-]*(?:\s+(?:\p{Lu}[\p{L}'’.\-]*|de|di|da|del|della|van|von|der|dos|la|le))*$",
    )
    .expect("name regex")
});
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\[(<][^\n]{1,58}[\])>]$").expect("placeholder regex"));

#[derive(Clone, Copy, Debug)]
pub struct LetterExtractor {
    fallback_min_len: usize,
}

impl Default for LetterExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_MIN_CHARS)
    }
}

impl LetterExtractor {
    pub fn new(fallback_min_len: usize) -> Self {
        Self { fallback_min_len }
    }

    /// Clean letter body, or `None` when nothing letter-shaped is found.
    ///
    /// The minimum acceptable draft length is left to the caller.
    pub fn extract(&self, text: &str) -> Option<String> {
        let mut current = self.extract_once(text)?;
        loop {
            let next = self.extract_once(&current)?;
            // Each pass only removes text, so equal length means a fixpoint.
            if next.len() >= current.len() {
                return Some(current);
            }
            current = next;
        }
    }

    fn extract_once(&self, text: &str) -> Option<String> {
        let candidates = [
            sentinel_span(text).map(|(start, end)| &text[start..end]),
            opening_anchor(text),
            closing_anchor(text),
        ];
        for raw in candidates.into_iter().flatten() {
            if looks_like_summary(raw) {
                return None;
            }
            let cleaned = post_process(raw);
            if cleaned.is_empty() {
                continue;
            }
            return (!looks_like_summary(&cleaned)).then_some(cleaned);
        }

        if looks_like_summary(text) {
            return None;
        }
        let cleaned = post_process(text);
        if cleaned.chars().count() > self.fallback_min_len && !looks_like_summary(&cleaned) {
            Some(cleaned)
        } else {
            None
        }
    }
}

/// Lines with their byte offsets, without line terminators.
fn line_spans(text: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n')
        .map(|raw| {
            let start = offset;
            offset += raw.len();
            (start, raw.trim_end_matches(['\n', '\r']))
        })
        .collect()
}

fn is_short(line: &str, max: usize) -> bool {
    line.chars().count() <= max
}

fn is_anchor_line(line: &str) -> bool {
    is_short(line, ANCHOR_LINE_MAX_CHARS) && (OPENER_LINE.is_match(line) || SUBJECT_LINE.is_match(line))
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Lines that belong to the conversation around a letter rather than to it.
fn is_chat_line(line: &str) -> bool {
    PREFACE_LINE.is_match(line)
        || CHAT_CLOSING_LINE.is_match(line)
        || BULLET.is_match(line)
        || is_fence(line)
        || HORIZONTAL_RULE.is_match(line)
        || line.trim_end().ends_with(':')
}

/// From the earliest salutation or subject line to the end, keeping the
/// header block (sender, addressee, date) directly above it.
fn opening_anchor(text: &str) -> Option<&str> {
    let lines = line_spans(text);
    let anchor = lines.iter().position(|(_, line)| is_anchor_line(line))?;

    let mut start = anchor;
    for i in (0..anchor).rev() {
        if is_chat_line(lines[i].1) {
            break;
        }
        start = i;
    }
    while start < anchor && lines[start].1.trim().is_empty() {
        start += 1;
    }
    Some(&text[lines[start].0..])
}

/// From the start through the last closing phrase and the signature name.
fn closing_anchor(text: &str) -> Option<&str> {
    let lines = line_spans(text);
    let closer = lines
        .iter()
        .rposition(|(_, line)| is_short(line, ANCHOR_LINE_MAX_CHARS) && CLOSER_LINE.is_match(line))?;
    let line_end = |i: usize| lines[i].0 + lines[i].1.len();

    let mut end = line_end(closer);
    let signature = (closer + 1..lines.len()).find(|&i| !lines[i].1.trim().is_empty());
    if let Some(next) = signature {
        if next <= closer + 2 && looks_like_name(lines[next].1) {
            end = line_end(next);
        }
    }
    Some(&text[..end])
}

fn looks_like_name(line: &str) -> bool {
    let bare = line.trim().trim_matches(['*', '_']).trim();
    if bare.is_empty() || !is_short(bare, NAME_LINE_MAX_CHARS) {
        return false;
    }
    PROPER_NAME.is_match(bare) || PLACEHOLDER.is_match(bare)
}

fn clean_line(line: &str) -> String {
    let unheaded = HEADING.replace(line, "$1");
    unheaded.replace("**", "").trim_end().to_string()
}

/// Strip markers, markdown furniture and conversational lead-ins/sign-offs.
fn post_process(text: &str) -> String {
    let text = strip_sentinels(text);
    let mut lines: Vec<String> = text
        .lines()
        .filter(|line| !is_fence(line) && !HORIZONTAL_RULE.is_match(line))
        .map(clean_line)
        .collect();

    let mut head = 0;
    while head < lines.len() && (lines[head].trim().is_empty() || PREFACE_LINE.is_match(&lines[head])) {
        head += 1;
    }
    lines.drain(..head);

    while let Some(last) = lines.last() {
        if last.trim().is_empty() || CHAT_CLOSING_LINE.is_match(last) {
            lines.pop();
        } else {
            break;
        }
    }

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let blank = line.trim().is_empty();
        if blank && out.last().is_some_and(|prev| prev.trim().is_empty()) {
            continue;
        }
        out.push(if blank { String::new() } else { line });
    }
    out.join("\n").trim().to_string()
}

/// A short bullet recap, or a "here is a summary" lead-in followed by
/// labeled fields. Text with a formal closing is never a summary.
pub fn looks_like_summary(text: &str) -> bool {
    let bullets = text.lines().filter(|line| BULLET.is_match(line)).count();
    let signed = text.lines().any(|line| CLOSER_LINE.is_match(line));
    if bullets >= 3 && text.chars().count() < SUMMARY_MAX_CHARS && !signed {
        return true;
    }

    let Some(first) = text.lines().find(|line| !line.trim().is_empty()) else {
        return false;
    };
    if !SUMMARY_INTRO_LINE.is_match(first) {
        return false;
    }
    text.lines().skip(1).filter(|line| LABELED_FIELD.is_match(line)).count() >= 2
}
