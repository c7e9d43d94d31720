//! Location extraction from generated answer text.
//!
//! Scans text with the ordered pattern families, attaches a context window
//! to every hit, and collapses duplicates in a single pass where the first
//! occurrence wins.

pub mod filter;
pub mod patterns;
pub mod severity;

use std::collections::HashSet;

use crate::location::LocationCandidate;

pub use patterns::{Matcher, PatternFamily};
pub use severity::{classify_kind, infer_severity, Severity};

/// Default width of the context window, in characters.
pub const DEFAULT_CONTEXT_WINDOW: usize = 100;

/// Extracts location candidates from free text.
#[derive(Debug, Clone)]
pub struct Extractor {
    context_window: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_WINDOW)
    }
}

impl Extractor {
    pub fn new(context_window: usize) -> Self {
        Self { context_window }
    }

    pub fn context_window(&self) -> usize {
        self.context_window
    }

    /// Candidates in first-match order across pattern families.
    ///
    /// Duplicates (by [`LocationCandidate::dedup_key`]) are dropped; the
    /// candidate kept is the first one emitted, together with its context.
    pub fn extract(&self, text: &str) -> Vec<LocationCandidate> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let raw = patterns::matchers().iter().flat_map(|matcher| {
            let family = matcher.family();
            matcher.scan(text).into_iter().map(move |hit| LocationCandidate {
                target: hit.target,
                context: context_window(text, hit.start, self.context_window).to_string(),
                family,
            })
        });

        let mut seen = HashSet::new();
        raw.filter(|c| seen.insert(c.dedup_key())).collect()
    }
}

/// Extract with the default context window.
pub fn extract(text: &str) -> Vec<LocationCandidate> {
    Extractor::default().extract(text)
}

/// A window of `width` characters centred on byte offset `at`, half before
/// and half after, clipped to the text.
pub fn context_window(text: &str, at: usize, width: usize) -> &str {
    let half = width / 2;
    let mut at = at.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }

    let start = text[..at]
        .char_indices()
        .rev()
        .take(half)
        .last()
        .map_or(at, |(i, _)| i);
    let end = text[at..]
        .char_indices()
        .nth(half)
        .map_or(text.len(), |(i, _)| at + i);
    &text[start..end]
}
