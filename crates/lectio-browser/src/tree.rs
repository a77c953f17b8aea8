//! `ContentTree` over the live DOM.
//!
//! The engine counts chars; the DOM counts UTF-16 code units. Conversion
//! happens here and in `selection`, nowhere else.

use std::ops::Range;

use lectio_core::{
    ContentTree, MARKER_ID_ATTR, MARKER_TAG, MarkerSpec, NodeKind, SmolStr, TreeError,
    parse_marker_id,
};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Node, Text};

/// Live DOM tree rooted wherever the caller says.
#[derive(Clone, Debug)]
pub struct BrowserTree {
    document: Document,
}

impl BrowserTree {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// Tree over the window's document.
    pub fn from_window() -> Result<Self, TreeError> {
        let document = web_sys::window()
            .ok_or("no window")?
            .document()
            .ok_or("no document")?;
        Ok(Self::new(document))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

/// UTF-16 length of the first `chars` chars of `text`.
pub fn char_to_utf16(text: &str, chars: usize) -> usize {
    text.chars().take(chars).map(char::len_utf16).sum()
}

/// Number of chars covered by the first `units` UTF-16 code units of `text`.
///
/// An offset inside a surrogate pair rounds up to the end of that char.
pub fn utf16_to_char(text: &str, units: usize) -> usize {
    let mut seen = 0;
    for (i, c) in text.chars().enumerate() {
        if seen >= units {
            return i;
        }
        seen += c.len_utf16();
    }
    text.chars().count()
}

impl ContentTree for BrowserTree {
    type Node = Node;

    fn kind(&self, node: &Node) -> NodeKind {
        match node.node_type() {
            Node::TEXT_NODE => NodeKind::Text(node.text_content().unwrap_or_default()),
            Node::ELEMENT_NODE => match node.dyn_ref::<Element>() {
                Some(element) => NodeKind::Element {
                    tag: SmolStr::new(element.tag_name().to_ascii_lowercase()),
                    marker: parse_marker_id(element.get_attribute(MARKER_ID_ATTR).as_deref()),
                },
                None => NodeKind::Other,
            },
            _ => NodeKind::Other,
        }
    }

    fn children(&self, node: &Node) -> Vec<Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.get(i)).collect()
    }

    fn parent(&self, node: &Node) -> Option<Node> {
        node.parent_node()
    }

    fn contains(&self, ancestor: &Node, node: &Node) -> bool {
        ancestor.contains(Some(node))
    }

    fn wrap_text(
        &mut self,
        node: &Node,
        range: Range<usize>,
        marker: &MarkerSpec,
    ) -> Result<Node, TreeError> {
        let text_node = node.dyn_ref::<Text>().ok_or(TreeError::NotText)?;
        let text = text_node.data();
        let len = text.chars().count();
        if range.start >= range.end {
            return Err(TreeError::EmptyRange);
        }
        if range.end > len {
            return Err(TreeError::OutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }
        let parent = node.parent_node().ok_or(TreeError::Detached)?;

        let start = char_to_utf16(&text, range.start);
        let end = char_to_utf16(&text, range.end);
        let total = char_to_utf16(&text, len);

        // split_text keeps the head in place and returns the tail.
        let middle = if start > 0 {
            text_node
                .split_text(start as u32)
                .map_err(|e| format!("split_text failed: {:?}", e))?
        } else {
            text_node.clone()
        };
        if end < total {
            middle
                .split_text((end - start) as u32)
                .map_err(|e| format!("split_text failed: {:?}", e))?;
        }

        let mark = self
            .document
            .create_element(MARKER_TAG)
            .map_err(|e| format!("create_element failed: {:?}", e))?;
        mark.set_attribute("class", &marker.class_attr())
            .map_err(|e| format!("set_attribute failed: {:?}", e))?;
        mark.set_attribute(MARKER_ID_ATTR, &marker.id_attr())
            .map_err(|e| format!("set_attribute failed: {:?}", e))?;

        parent
            .replace_child(&mark, &middle)
            .map_err(|e| format!("replace_child failed: {:?}", e))?;
        mark.append_child(&middle)
            .map_err(|e| format!("append_child failed: {:?}", e))?;

        tracing::trace!(
            target: "lectio::browser",
            id = %marker.id,
            utf16_start = start,
            utf16_end = end,
            "wrapped text span"
        );

        Ok(mark.into())
    }

    fn reset_content(&mut self, root: &Node, html: &str) -> Result<(), TreeError> {
        let element = root
            .dyn_ref::<Element>()
            .ok_or("passage container is not an element")?;
        element.set_inner_html(html);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_conversion_ascii() {
        assert_eq!(char_to_utf16("the Word", 4), 4);
        assert_eq!(utf16_to_char("the Word", 4), 4);
    }

    #[test]
    fn test_utf16_conversion_astral() {
        // U+1D4DB is two code units.
        let text = "a\u{1d4db}b";
        assert_eq!(char_to_utf16(text, 2), 3);
        assert_eq!(utf16_to_char(text, 3), 2);
        assert_eq!(utf16_to_char(text, 2), 2);
        assert_eq!(utf16_to_char(text, 9), 3);
    }
}
