//! Locating stored highlight text in an index.
//!
//! Matching is by first occurrence of the normalized text. Highlights carry
//! no positional data, so repeated phrases always bind to the earliest match.

use std::ops::Range;

use crate::highlight::HighlightId;
use crate::index::TextIndex;
use crate::normalize::normalize_text;

/// A char range inside one text node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextSpan<N> {
    pub node: N,
    pub range: Range<usize>,
}

/// Where a highlight's text lives in the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Location<N> {
    /// Match in normalized chars.
    pub normalized: Range<usize>,
    /// Every raw char that contributed to the match.
    pub raw: Range<usize>,
    /// Unmarked spans to wrap, in document order.
    pub spans: Vec<TextSpan<N>>,
    /// Existing markers the match ran through. Their text is left alone.
    pub clipped: Vec<HighlightId>,
}

impl<N> Location<N> {
    /// The match ran entirely through existing markers.
    pub fn is_fully_marked(&self) -> bool {
        self.spans.is_empty() && !self.clipped.is_empty()
    }
}

/// Locate the first occurrence of `text` in `index`.
///
/// Returns `None` when the text normalizes to nothing or does not occur.
/// Spans inside existing markers are clipped, never wrapped a second time.
pub fn locate<N: Clone + PartialEq>(index: &TextIndex<N>, text: &str) -> Option<Location<N>> {
    let needle = normalize_text(text);
    let normalized = index.find(&needle)?;
    let raw = index.raw_range(&normalized)?;

    let mut spans = Vec::new();
    let mut clipped = Vec::new();
    for (span, marker) in index.spans(&raw) {
        match marker {
            Some(id) => {
                if !clipped.contains(&id) {
                    clipped.push(id);
                }
            }
            None => spans.push(span),
        }
    }

    Some(Location {
        normalized,
        raw,
        spans,
        clipped,
    })
}
