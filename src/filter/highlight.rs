//! Highlight spans for an external renderer.
//!
//! The core only reports byte ranges and what they matched; the renderer
//! decides how to present them (HTML, ANSI, nothing at all).

use super::criteria::FilterCriteria;
use super::pipeline::{in_bucket, APACHE_STATUS};
use crate::parser::timing::{EXECUTION_PROFILE_HEADER, LONG_EXECUTION_MARKER, PROFILE_ROOT_TOKEN};
use log::warn;
use regex::RegexBuilder;

/// What a highlighted span matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    /// The user's identifier filter text
    Identifier,
    /// A status code inside an enabled bucket
    HttpStatus,
    /// A profiler token (root request, long execution, execution profile)
    ProfileRoot,
}

/// Byte range `start..end` of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub kind: HighlightKind,
}

impl HighlightSpan {
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.start..self.end]
    }
}

/// Compute highlight spans for one line, sorted by position
///
/// The identifier is escaped before it is compiled, so any user text is safe.
pub fn highlight_spans(line: &str, criteria: &FilterCriteria) -> Vec<HighlightSpan> {
    let mut spans = Vec::new();

    if let Some(identifier) = criteria.identifier() {
        match RegexBuilder::new(&regex::escape(identifier))
            .case_insensitive(true)
            .build()
        {
            Ok(regex) => spans.extend(regex.find_iter(line).map(|m| HighlightSpan {
                start: m.start(),
                end: m.end(),
                kind: HighlightKind::Identifier,
            })),
            Err(e) => warn!("Cannot highlight identifier '{}': {}", identifier, e),
        }
    }

    if !criteria.status_buckets.is_empty() {
        for caps in APACHE_STATUS.captures_iter(line) {
            let Some(code) = caps.get(1) else {
                continue;
            };
            let in_enabled_bucket = code
                .as_str()
                .parse::<u16>()
                .is_ok_and(|c| criteria.status_buckets.iter().any(|&b| in_bucket(c, b)));
            if in_enabled_bucket {
                spans.push(HighlightSpan {
                    start: code.start(),
                    end: code.end(),
                    kind: HighlightKind::HttpStatus,
                });
            }
        }
    }

    for token in [&*PROFILE_ROOT_TOKEN, &*LONG_EXECUTION_MARKER, &*EXECUTION_PROFILE_HEADER] {
        if let Some(m) = token.find(line) {
            spans.push(HighlightSpan {
                start: m.start(),
                end: m.end(),
                kind: HighlightKind::ProfileRoot,
            });
        }
    }

    spans.sort_by_key(|s| (s.start, s.end));
    spans
}

/// Rebuild a line with each span wrapped by `wrap`
///
/// Spans overlapping an earlier one are skipped.
pub fn render_spans(
    line: &str,
    spans: &[HighlightSpan],
    mut wrap: impl FnMut(HighlightKind, &str) -> String,
) -> String {
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;

    for span in spans {
        if span.start < cursor {
            continue;
        }
        out.push_str(&line[cursor..span.start]);
        out.push_str(&wrap(span.kind, span.text(line)));
        cursor = span.end;
    }
    out.push_str(&line[cursor..]);
    out
}
