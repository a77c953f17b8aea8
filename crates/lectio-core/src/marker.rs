//! Rendered markers: the view-side wrapper for one highlight's text.
//!
//! A marker is `<mark class="highlight highlight-{color}" data-highlight-id="{id}">`.
//! Markers are never a source of truth; every pass derives them fresh from
//! the store's list.

use std::ops::Range;

use crate::highlight::{HighlightColor, HighlightId};
use crate::locate::TextSpan;
use crate::tree::{ContentTree, NodeKind, is_block_tag, is_line_break_tag};

/// Tag name of marker elements.
pub const MARKER_TAG: &str = "mark";

/// Class shared by every marker regardless of color.
pub const MARKER_CLASS: &str = "highlight";

/// Attribute carrying the owning highlight's id.
pub const MARKER_ID_ATTR: &str = "data-highlight-id";

/// CSS selector matching any marker.
pub const MARKER_SELECTOR: &str = "[data-highlight-id]";

/// Everything a tree needs to build a marker element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerSpec {
    pub id: HighlightId,
    pub color: HighlightColor,
}

impl MarkerSpec {
    pub fn new(id: HighlightId, color: HighlightColor) -> Self {
        Self { id, color }
    }

    /// Value of the `class` attribute.
    pub fn class_attr(&self) -> String {
        format!("{} {}", MARKER_CLASS, self.color.css_class())
    }

    /// Value of the id attribute.
    pub fn id_attr(&self) -> String {
        self.id.to_string()
    }
}

/// Parse the id attribute of a potential marker element.
pub fn parse_marker_id(attr: Option<&str>) -> Option<HighlightId> {
    attr?.trim().parse().ok()
}

/// Outcome of wrapping one highlight's spans.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WrapOutcome {
    /// Spans wrapped in a marker.
    pub wrapped: usize,
    /// Inter-block whitespace spans left alone.
    pub skipped_whitespace: usize,
    /// Spans the tree refused to wrap.
    pub failed: usize,
}

/// Wrap every span of one highlight.
///
/// Spans arrive in document order and are applied last-first, so splitting a
/// node never shifts an offset that is still pending. Spans that only cover
/// formatting whitespace between blocks are left alone, and spans the tree
/// refuses are logged and skipped.
pub fn wrap_spans<T: ContentTree>(
    tree: &mut T,
    spans: &[TextSpan<T::Node>],
    marker: &MarkerSpec,
) -> WrapOutcome {
    let mut outcome = WrapOutcome::default();

    for span in spans.iter().rev() {
        if is_structural_whitespace(tree, &span.node, span.range.clone()) {
            outcome.skipped_whitespace += 1;
            continue;
        }

        match tree.wrap_text(&span.node, span.range.clone(), marker) {
            Ok(_) => outcome.wrapped += 1,
            Err(e) => {
                tracing::warn!(
                    target: "lectio::marker",
                    highlight = %marker.id,
                    range = ?span.range,
                    error = %e,
                    "skipping span that could not be wrapped"
                );
                outcome.failed += 1;
            }
        }
    }

    outcome
}

/// Whitespace-only text directly inside a block element that touches a
/// block boundary (newlines between `<p>`s, indentation before the first
/// child). A space between two inline siblings is reading content.
fn is_structural_whitespace<T: ContentTree>(tree: &T, node: &T::Node, range: Range<usize>) -> bool {
    let Some(text) = tree.text(node) else {
        return false;
    };
    let all_whitespace = text
        .chars()
        .skip(range.start)
        .take(range.len())
        .all(char::is_whitespace);
    if !all_whitespace {
        return false;
    }

    let Some(parent) = tree.parent(node) else {
        return true;
    };
    if let Some(tag) = tree.kind(&parent).tag() {
        if !is_block_tag(tag) {
            return false;
        }
    }

    let siblings = tree.children(&parent);
    let Some(pos) = siblings.iter().position(|n| n == node) else {
        return false;
    };
    breaks_line(tree, siblings[..pos].iter().rev()) || breaks_line(tree, siblings[pos + 1..].iter())
}

/// Whether the nearest non-whitespace sibling is a block or line break, or
/// there is none.
fn breaks_line<'a, T, I>(tree: &T, siblings: I) -> bool
where
    T: ContentTree,
    T::Node: 'a,
    I: Iterator<Item = &'a T::Node>,
{
    for sibling in siblings {
        match tree.kind(sibling) {
            NodeKind::Text(text) if text.chars().all(char::is_whitespace) => continue,
            NodeKind::Text(_) => return false,
            NodeKind::Element { tag, .. } => return is_block_tag(&tag) || is_line_break_tag(&tag),
            NodeKind::Other => continue,
        }
    }
    true
}
