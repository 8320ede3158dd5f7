// src/extraction/mod.rs

//! Locates the JSON object or array inside raw model output.

use crate::config::RecoveryConfig;
use std::iter;

const THINK_CLOSE: &str = "</think>";

/// Marker positions tried before falling back to the whole text.
const MARKER_ATTEMPTS: usize = 2;

/// Returns the most plausible JSON substring of `raw`, or `None` when the
/// text holds no balanced `{...}` / `[...]` span.
pub fn extract_candidate(raw: &str, config: &RecoveryConfig) -> Option<String> {
    let trimmed = raw.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        let region = strip_sentinels(trimmed, &config.sentinels);
        let region = region.trim();
        // Truncated output still goes to the parser so the error carries a position.
        return Some(match balanced_span(region) {
            Some((0, end)) => region[..end].to_string(),
            _ => region.to_string(),
        });
    }

    search_regions(trimmed, &config.response_markers)
        .into_iter()
        .find_map(|region| {
            let region = strip_sentinels(region, &config.sentinels);
            first_balanced_span(&region).map(str::to_string)
        })
}

/// Candidate regions in order: after the last response marker, after the
/// one before it, then the whole text. Everything before a closed
/// reasoning block is dropped first.
///
/// A marker can show up inside a string value or in a prompt echo after the
/// answer, so the last one alone is not trusted.
fn search_regions<'a>(text: &'a str, markers: &[String]) -> Vec<&'a str> {
    let text = match text.rfind(THINK_CLOSE) {
        Some(pos) => &text[pos + THINK_CLOSE.len()..],
        None => text,
    };

    let mut starts: Vec<usize> = markers
        .iter()
        .flat_map(|marker| {
            text.match_indices(marker.as_str())
                .map(move |(pos, _)| pos + marker.len())
        })
        .collect();
    starts.sort_unstable_by(|a, b| b.cmp(a));
    starts.dedup();

    starts
        .into_iter()
        .take(MARKER_ATTEMPTS)
        .map(|start| &text[start..])
        .chain(iter::once(text))
        .collect()
}

fn strip_sentinels(text: &str, sentinels: &[String]) -> String {
    sentinels
        .iter()
        .fold(text.to_string(), |acc, sentinel| acc.replace(sentinel.as_str(), ""))
}

/// First span, scanning left to right, that opens with `{` or `[` and closes
/// with its matching delimiter.
pub fn first_balanced_span(text: &str) -> Option<&str> {
    balanced_span(text).map(|(start, end)| &text[start..end])
}

/// Byte range of the earliest-starting balanced span, in one pass.
///
/// Delimiters inside JSON string literals are ignored once a span is open.
/// A mismatched closer abandons every open delimiter; stray closers outside
/// a span are skipped.
fn balanced_span(text: &str) -> Option<(usize, usize)> {
    let mut stack: Vec<(usize, char)> = Vec::new();
    let mut best: Option<(usize, usize)> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if !stack.is_empty() => in_string = true,
            '{' => stack.push((idx, '}')),
            '[' => stack.push((idx, ']')),
            '}' | ']' => match stack.pop() {
                Some((start, closer)) if closer == ch => {
                    if best.is_none_or(|(earliest, _)| start < earliest) {
                        best = Some((start, idx + ch.len_utf8()));
                    }
                    // Nothing still open can start earlier than `best`.
                    if stack.is_empty() {
                        return best;
                    }
                }
                Some(_) => stack.clear(),
                None => {}
            },
            _ => {}
        }
    }

    best
}
