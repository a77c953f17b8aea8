//! Content tree abstraction.
//!
//! The anchoring engine never touches a concrete DOM. It walks and mutates
//! the passage container through `ContentTree`, implemented by the native
//! `HtmlTree` (feature `html`) and by the browser crate over `web_sys::Node`.
//!
//! All text offsets crossing this boundary are in chars (Unicode scalar
//! values). Platforms with other native units (UTF-16 in browsers) convert
//! at the edge.

use std::fmt;
use std::ops::Range;

use smol_str::SmolStr;

use crate::error::TreeError;
use crate::highlight::HighlightId;
use crate::marker::MarkerSpec;

/// What a node is, as far as indexing is concerned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Text leaf with its content.
    Text(String),
    /// Element with a lowercase tag name. `marker` is set when the element
    /// is a rendered highlight marker.
    Element {
        tag: SmolStr,
        marker: Option<HighlightId>,
    },
    /// Comments, processing instructions, doctypes.
    Other,
}

impl NodeKind {
    pub fn is_text(&self) -> bool {
        matches!(self, NodeKind::Text(_))
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn marker(&self) -> Option<HighlightId> {
        match self {
            NodeKind::Element { marker, .. } => *marker,
            _ => None,
        }
    }
}

/// A rendered content tree the engine can index and mark.
pub trait ContentTree {
    /// Cheap node handle. Equality is node identity.
    type Node: Clone + PartialEq + fmt::Debug;

    /// Classify a node.
    fn kind(&self, node: &Self::Node) -> NodeKind;

    /// Child nodes in document order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Parent node, if attached.
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Split the text node around `range` (char offsets) and wrap the middle
    /// in a marker element described by `marker`.
    ///
    /// On success the parent holds (optional pre-text, marker, optional
    /// post-text) where the text node was. Implementations may reuse the
    /// original node for any of the three. Returns the marker.
    fn wrap_text(
        &mut self,
        node: &Self::Node,
        range: Range<usize>,
        marker: &MarkerSpec,
    ) -> Result<Self::Node, TreeError>;

    /// Replace every child of `root` with the nodes parsed from `html`.
    fn reset_content(&mut self, root: &Self::Node, html: &str) -> Result<(), TreeError>;

    /// Text content of a text node.
    fn text(&self, node: &Self::Node) -> Option<String> {
        match self.kind(node) {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Check whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            if &n == ancestor {
                return true;
            }
            current = self.parent(&n);
        }
        false
    }
}

/// Structural block elements. A visual selection reads a line break across
/// each of their boundaries, and a valid selection never leaves one.
pub fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "body"
            | "main"
            | "nav"
            | "aside"
            | "figure"
            | "dl"
            | "dt"
            | "dd"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "div"
            | "li"
            | "ul"
            | "ol"
            | "blockquote"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "pre"
            | "table"
            | "tr"
            | "td"
            | "th"
    )
}

/// Elements rendered as a line break without being containers.
pub fn is_line_break_tag(tag: &str) -> bool {
    matches!(tag, "br" | "hr")
}

/// Elements whose text is never reading content.
pub fn is_non_content_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "template" | "noscript")
}

/// Nearest structural block ancestor of `node` inside `root`.
///
/// Returns `root` itself when no block element sits between the node and
/// the container (inline content directly in the container), and `None`
/// when the node is not inside `root` at all.
pub fn block_ancestor<T: ContentTree>(tree: &T, root: &T::Node, node: &T::Node) -> Option<T::Node> {
    let mut current = node.clone();
    loop {
        if &current == root {
            return Some(current);
        }
        if let Some(tag) = tree.kind(&current).tag() {
            if is_block_tag(tag) {
                // A block outside the container means the node is outside too.
                return tree.contains(root, &current).then_some(current);
            }
        }
        current = tree.parent(&current)?;
    }
}

/// Nearest enclosing marker of `node` (the node itself included).
pub fn enclosing_marker<T: ContentTree>(tree: &T, node: &T::Node) -> Option<HighlightId> {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if let Some(id) = tree.kind(&n).marker() {
            return Some(id);
        }
        current = tree.parent(&n);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_tags() {
        for tag in ["p", "h3", "h4", "div", "li", "blockquote"] {
            assert!(is_block_tag(tag), "{tag}");
        }
        for tag in ["span", "sup", "mark", "a", "em", "br"] {
            assert!(!is_block_tag(tag), "{tag}");
        }
    }

    #[test]
    fn test_node_kind_accessors() {
        let marker = NodeKind::Element {
            tag: "mark".into(),
            marker: Some(HighlightId(3)),
        };
        assert_eq!(marker.tag(), Some("mark"));
        assert_eq!(marker.marker(), Some(HighlightId(3)));
        assert!(!marker.is_text());

        let text = NodeKind::Text("x".into());
        assert!(text.is_text());
        assert_eq!(text.tag(), None);
        assert_eq!(text.marker(), None);
    }
}
