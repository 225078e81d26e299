//! Rule-based candidate narrowing applied ahead of the judge.
//!
//! Heuristics are keyed on query patterns. Today there is one: spacing
//! questions ("espaçamento entre plantas…") only accept candidates whose
//! text carries a spacing, distance or numeric-measurement marker. A query
//! matching no heuristic passes every candidate through untouched.

use std::sync::LazyLock;

use regex::Regex;

use agroqa_core::types::SearchResult;

const SPACING_MARKER: &str = "espaç";

static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<table.*?</table>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static SPACING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"espaç",
        r"distân",
        r"entre\s+fil",
        r"entre\s+plant",
        r"\b\d+([,\.]\d+)?\s*x\s*\d+([,\.]\d+)?(\s*x\s*\d+([,\.]\d+)?)?\b",
        r"\b\d+\s*cm\b",
        r"\b\d+([,\.]\d+)?\s*m\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static MEASURE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b\d+([,\.]\d+)?\s*x\s*\d+([,\.]\d+)?(\s*x\s*\d+([,\.]\d+)?)?\b",
        r"\b\d+\s*cm\b",
        r"\b\d+([,\.]\d+)?\s*m\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Replaces HTML tables with a `[TABELA]` placeholder, strips remaining
/// tags and collapses whitespace.
pub fn strip_html(s: &str) -> String {
    let s = TABLE_RE.replace_all(s, " [TABELA] ");
    let s = TAG_RE.replace_all(&s, " ");
    WS_RE.replace_all(&s, " ").trim().to_string()
}

/// Applies the query-keyed heuristics; a no-op for queries none of them
/// match.
pub fn rule_filter(query: &str, candidates: &[SearchResult]) -> Vec<SearchResult> {
    if !query.to_lowercase().contains(SPACING_MARKER) {
        return candidates.to_vec();
    }
    candidates
        .iter()
        .filter(|r| {
            let text =
                strip_html(&format!("{} {}", r.meta.question, r.meta.answer)).to_lowercase();
            SPACING_PATTERNS.iter().any(|p| p.is_match(&text))
        })
        .cloned()
        .collect()
}

/// Candidate text as sent to the judge: HTML-stripped, capped at `limit`
/// chars, and for spacing queries recentered around the first measurement
/// found.
pub fn relevant_excerpt(query: &str, text: &str, limit: usize) -> String {
    let clean = strip_html(text);
    if query.to_lowercase().contains(SPACING_MARKER) {
        let low = clean.to_lowercase();
        for pattern in MEASURE_PATTERNS.iter() {
            if let Some(m) = pattern.find(&low) {
                let start = clamp_floor(&clean, m.start().saturating_sub(500));
                let end = clamp_ceil(&clean, m.end() + 800);
                return take_chars(&clean[start..end], limit);
            }
        }
    }
    take_chars(&clean, limit)
}

fn clamp_floor(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn clamp_ceil(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn take_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}
