//! Virtual document index over a content tree.
//!
//! Walking the passage container yields three things:
//!
//! - the raw concatenation of every indexed text node,
//! - the normalized form of that text, with one synthesized separator space
//!   at each block boundary (the way a visual selection reads across `<p>`s),
//! - a table mapping each normalized char back to the raw char it came from.
//!
//! Raw chars are stored as per-node runs, so any raw index resolves to its
//! originating (node, offset) pair.
//!
//! An index is only valid until the tree is mutated. The render pass builds
//! a fresh one before locating each highlight and drops it afterwards.

use std::ops::Range;

use crate::highlight::HighlightId;
use crate::locate::TextSpan;
use crate::normalize::is_collapsible;
use crate::tree::{ContentTree, NodeKind, is_block_tag, is_line_break_tag, is_non_content_tag};

/// Stands in for the contents of a skipped marker. Normalized needles never
/// contain it, so no match can run across a marker the filter left out.
pub const MARKER_BARRIER: char = '\u{FFFC}';

/// Traversal filter deciding which element subtrees are indexed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndexFilter {
    /// Every content element, marker contents included.
    #[default]
    Content,
    /// Content elements, skipping the contents of rendered markers.
    Unmarked,
}

impl IndexFilter {
    /// Whether an element's subtree should be indexed.
    pub fn descend(&self, kind: &NodeKind) -> bool {
        match kind {
            NodeKind::Element { tag, marker } => {
                if is_non_content_tag(tag) {
                    return false;
                }
                match self {
                    IndexFilter::Content => true,
                    IndexFilter::Unmarked => marker.is_none(),
                }
            }
            NodeKind::Text(_) => true,
            NodeKind::Other => false,
        }
    }
}

/// A contiguous run of raw chars contributed by one text node.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun<N> {
    pub node: N,
    /// Raw index of the node's first char.
    pub raw_start: usize,
    /// Length in chars.
    pub len: usize,
    /// Enclosing marker, if the node sits inside one.
    pub marker: Option<HighlightId>,
}

impl<N> TextRun<N> {
    pub fn raw_range(&self) -> Range<usize> {
        self.raw_start..self.raw_start + self.len
    }
}

/// Concrete location of one raw char.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawPosition<'a, N> {
    pub node: &'a N,
    /// Char offset inside the node's text.
    pub offset: usize,
    pub marker: Option<HighlightId>,
}

/// Index of a content tree's text.
#[derive(Clone, Debug)]
pub struct TextIndex<N> {
    raw: String,
    raw_len: usize,
    runs: Vec<TextRun<N>>,
    normalized: String,
    /// Raw index for each normalized char.
    norm_to_raw: Vec<usize>,
}

impl<N: Clone + PartialEq> TextIndex<N> {
    /// Raw concatenated text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Length of the raw text in chars.
    pub fn raw_len(&self) -> usize {
        self.raw_len
    }

    /// Normalized text used for matching.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Length of the normalized text in chars.
    pub fn normalized_len(&self) -> usize {
        self.norm_to_raw.len()
    }

    /// Per-node runs in document order.
    pub fn runs(&self) -> &[TextRun<N>] {
        &self.runs
    }

    /// Raw index that produced the normalized char at `norm_idx`.
    ///
    /// Synthesized block separators map to the raw index of the next raw
    /// char.
    pub fn raw_index(&self, norm_idx: usize) -> Option<usize> {
        self.norm_to_raw.get(norm_idx).copied()
    }

    /// Resolve a raw index to its node and in-node offset.
    pub fn position(&self, raw_idx: usize) -> Option<RawPosition<'_, N>> {
        let run_idx = self.runs.partition_point(|run| run.raw_start + run.len <= raw_idx);
        let run = self.runs.get(run_idx)?;
        if !run.raw_range().contains(&raw_idx) {
            return None;
        }
        Some(RawPosition {
            node: &run.node,
            offset: raw_idx - run.raw_start,
            marker: run.marker,
        })
    }

    /// Raw index of a (node, offset) point, if the node was indexed.
    ///
    /// `offset` may equal the node length (a point just after its last char).
    pub fn raw_offset_of(&self, node: &N, offset: usize) -> Option<usize> {
        self.runs
            .iter()
            .find(|run| &run.node == node)
            .map(|run| run.raw_start + offset.min(run.len))
    }

    /// First occurrence of already-normalized `needle`, as a normalized char
    /// range.
    pub fn find(&self, needle: &str) -> Option<Range<usize>> {
        if needle.is_empty() {
            return None;
        }
        let byte_start = self.normalized.find(needle)?;
        let start = self.normalized[..byte_start].chars().count();
        Some(start..start + needle.chars().count())
    }

    /// Translate a non-empty normalized range into the raw range spanning
    /// every raw char that contributed to it.
    pub fn raw_range(&self, normalized: &Range<usize>) -> Option<Range<usize>> {
        if normalized.is_empty() {
            return None;
        }
        let start = self.raw_index(normalized.start)?;
        let end = self.raw_index(normalized.end - 1)? + 1;
        Some(start..end)
    }

    /// Normalized char range covering a raw range.
    pub fn normalized_range(&self, raw: &Range<usize>) -> Range<usize> {
        let start = self.norm_to_raw.partition_point(|&r| r < raw.start);
        let end = self.norm_to_raw.partition_point(|&r| r < raw.end);
        start..end.max(start)
    }

    /// Slice of the normalized text by char range.
    pub fn normalized_slice(&self, range: Range<usize>) -> &str {
        let mut indices = self
            .normalized
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(self.normalized.len()));
        let start = indices.nth(range.start).unwrap_or(self.normalized.len());
        let end = if range.end > range.start {
            indices
                .nth(range.end - range.start - 1)
                .unwrap_or(self.normalized.len())
        } else {
            start
        };
        &self.normalized[start..end]
    }

    /// Split a raw range into per-node spans, in document order.
    ///
    /// Each span carries the marker enclosing its node, if any.
    pub fn spans(&self, raw: &Range<usize>) -> Vec<(TextSpan<N>, Option<HighlightId>)> {
        let first = self.runs.partition_point(|run| run.raw_start + run.len <= raw.start);
        self.runs[first..]
            .iter()
            .take_while(|run| run.raw_start < raw.end)
            .filter_map(|run| {
                let start = raw.start.max(run.raw_start);
                let end = raw.end.min(run.raw_start + run.len);
                (start < end).then(|| {
                    let span = TextSpan {
                        node: run.node.clone(),
                        range: start - run.raw_start..end - run.raw_start,
                    };
                    (span, run.marker)
                })
            })
            .collect()
    }
}

/// Build an index of `root` with one of the stock filters.
pub fn build_index<T: ContentTree>(
    tree: &T,
    root: &T::Node,
    filter: IndexFilter,
) -> TextIndex<T::Node> {
    build_index_with(tree, root, |kind| filter.descend(kind))
}

/// Build an index of `root`, descending only into elements accepted by
/// `descend`.
pub fn build_index_with<T, F>(tree: &T, root: &T::Node, descend: F) -> TextIndex<T::Node>
where
    T: ContentTree,
    F: Fn(&NodeKind) -> bool,
{
    let mut builder = IndexBuilder::new();
    builder.walk(tree, root, tree.kind(root).marker(), &descend);
    let index = builder.finish();

    tracing::trace!(
        target: "lectio::index",
        raw_len = index.raw_len,
        normalized_len = index.normalized_len(),
        runs = index.runs.len(),
        "built text index"
    );

    index
}

struct IndexBuilder<N> {
    raw: String,
    raw_len: usize,
    runs: Vec<TextRun<N>>,
    normalized: String,
    norm_to_raw: Vec<usize>,
    /// Last normalized char is a space (or nothing was emitted yet).
    at_space: bool,
}

impl<N: Clone + PartialEq> IndexBuilder<N> {
    fn new() -> Self {
        Self {
            raw: String::new(),
            raw_len: 0,
            runs: Vec::new(),
            normalized: String::new(),
            norm_to_raw: Vec::new(),
            at_space: true,
        }
    }

    fn walk<T, F>(&mut self, tree: &T, node: &N, marker: Option<HighlightId>, descend: &F)
    where
        T: ContentTree<Node = N>,
        F: Fn(&NodeKind) -> bool,
    {
        for child in tree.children(node) {
            let kind = tree.kind(&child);
            match &kind {
                NodeKind::Text(text) => self.push_text(child, text, marker),
                NodeKind::Element {
                    tag,
                    marker: child_marker,
                } => {
                    if !descend(&kind) {
                        if child_marker.is_some() {
                            self.barrier();
                        }
                        continue;
                    }
                    if is_line_break_tag(tag) {
                        self.boundary();
                        continue;
                    }
                    let block = is_block_tag(tag);
                    if block {
                        self.boundary();
                    }
                    self.walk(tree, &child, child_marker.or(marker), descend);
                    if block {
                        self.boundary();
                    }
                }
                NodeKind::Other => {}
            }
        }
    }

    fn push_text(&mut self, node: N, text: &str, marker: Option<HighlightId>) {
        let mut len = 0;
        for (i, c) in text.chars().enumerate() {
            let raw_idx = self.raw_len + i;
            if is_collapsible(c) {
                if !self.at_space {
                    self.normalized.push(' ');
                    self.norm_to_raw.push(raw_idx);
                    self.at_space = true;
                }
            } else {
                self.normalized.push(c);
                self.norm_to_raw.push(raw_idx);
                self.at_space = false;
            }
            len += 1;
        }

        if len == 0 {
            return;
        }
        self.raw.push_str(text);
        self.runs.push(TextRun {
            node,
            raw_start: self.raw_len,
            len,
            marker,
        });
        self.raw_len += len;
    }

    /// Synthesize a separator at a block boundary.
    fn boundary(&mut self) {
        if !self.at_space {
            self.normalized.push(' ');
            self.norm_to_raw.push(self.raw_len);
            self.at_space = true;
        }
    }

    /// Mark the place of a skipped marker subtree.
    fn barrier(&mut self) {
        if self.normalized.is_empty() || self.normalized.ends_with(MARKER_BARRIER) {
            return;
        }
        self.normalized.push(MARKER_BARRIER);
        self.norm_to_raw.push(self.raw_len);
        self.at_space = true;
    }

    fn finish(mut self) -> TextIndex<N> {
        while self.normalized.ends_with(' ') || self.normalized.ends_with(MARKER_BARRIER) {
            self.normalized.pop();
            self.norm_to_raw.pop();
        }
        TextIndex {
            raw: self.raw,
            raw_len: self.raw_len,
            runs: self.runs,
            normalized: self.normalized,
            norm_to_raw: self.norm_to_raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder_with(parts: &[(&'static str, Option<HighlightId>)]) -> TextIndex<&'static str> {
        let mut builder = IndexBuilder::new();
        for (text, marker) in parts {
            if *text == "|" {
                builder.boundary();
            } else if *text == "#" {
                builder.barrier();
            } else {
                builder.push_text(*text, text, *marker);
            }
        }
        builder.finish()
    }

    #[test]
    fn test_normalizes_across_runs() {
        let index = builder_with(&[("  In the\n", None), ("\u{a0}beginning ", None)]);
        assert_eq!(index.raw(), "  In the\n\u{a0}beginning ");
        assert_eq!(index.normalized(), "In the beginning");
        assert_eq!(index.raw_index(0), Some(2));
        // Collapsed run maps to its first raw char.
        assert_eq!(index.raw_index(6), Some(8));
    }

    #[test]
    fn test_boundary_inserts_single_separator() {
        let index = builder_with(&[("grace.", None), ("|", None), ("|", None), ("The law", None)]);
        assert_eq!(index.normalized(), "grace. The law");
        // Separator maps to the next raw char.
        assert_eq!(index.raw_index(6), Some(6));
        assert_eq!(index.raw_index(7), Some(6));
    }

    #[test]
    fn test_skipped_marker_blocks_matches() {
        let index = builder_with(&[("In the ", None), ("#", None), (" was the Word", None), ("#", None)]);
        assert_eq!(index.normalized(), "In the \u{FFFC}was the Word");
        assert_eq!(index.find("the was"), None);
        assert_eq!(index.find("was the"), Some(8..15));
        // Barrier maps to the raw char after the skipped marker.
        assert_eq!(index.raw_index(7), Some(7));
    }

    #[test]
    fn test_boundary_after_space_is_noop() {
        let index = builder_with(&[("word ", None), ("|", None), ("next", None)]);
        assert_eq!(index.normalized(), "word next");
    }

    #[test]
    fn test_mapping_is_monotonic() {
        let index = builder_with(&[
            ("\n  1 ", None),
            ("In the beginning", None),
            ("|", None),
            ("  \n", None),
            ("|", None),
            ("was the Word.", None),
        ]);
        let mapping: Vec<_> = (0..index.normalized_len())
            .map(|i| index.raw_index(i).unwrap())
            .collect();
        assert!(mapping.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(index.normalized(), "1 In the beginning was the Word.");
    }

    #[test]
    fn test_position_lookup() {
        let index = builder_with(&[("abc", None), ("de", Some(HighlightId(4)))]);
        let pos = index.position(3).unwrap();
        assert_eq!(*pos.node, "de");
        assert_eq!(pos.offset, 0);
        assert_eq!(pos.marker, Some(HighlightId(4)));
        assert_eq!(index.position(2).unwrap().offset, 2);
        assert!(index.position(5).is_none());
    }

    #[test]
    fn test_find_first_occurrence() {
        let index = builder_with(&[("the Word and the Word", None)]);
        assert_eq!(index.find("the Word"), Some(0..8));
        assert_eq!(index.find("Word and"), Some(4..12));
        assert_eq!(index.find("missing"), None);
        assert_eq!(index.find(""), None);
    }

    #[test]
    fn test_find_with_multibyte_chars() {
        let index = builder_with(&[("\u{201c}Word\u{201d} was", None)]);
        assert_eq!(index.find("was"), Some(7..10));
        assert_eq!(index.normalized_slice(0..6), "\u{201c}Word\u{201d}");
    }

    #[test]
    fn test_spans_split_by_node() {
        let index = builder_with(&[("In the ", None), ("beginning", None), (" was", None)]);
        let spans = index.spans(&(3..16));
        let got: Vec<_> = spans.iter().map(|(s, _)| (s.node, s.range.clone())).collect();
        assert_eq!(got, vec![("In the ", 3..7), ("beginning", 0..9)]);
    }

    #[test]
    fn test_normalized_range_roundtrip() {
        let index = builder_with(&[("one", None), ("|", None), ("two", None)]);
        assert_eq!(index.normalized(), "one two");
        // Raw "onetwo": selecting "two" includes the separator before it.
        let range = index.normalized_range(&(3..6));
        assert_eq!(index.normalized_slice(range), " two");
    }

    #[test]
    fn test_filter_skips_markers_only_when_unmarked() {
        let marker = NodeKind::Element {
            tag: "mark".into(),
            marker: Some(HighlightId(1)),
        };
        let script = NodeKind::Element {
            tag: "script".into(),
            marker: None,
        };
        assert!(IndexFilter::Content.descend(&marker));
        assert!(!IndexFilter::Unmarked.descend(&marker));
        assert!(!IndexFilter::Content.descend(&script));
    }
}
