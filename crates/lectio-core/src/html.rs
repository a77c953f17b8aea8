//! Native content tree over html5ever's reference DOM.
//!
//! Used outside the browser: server-side rendering of highlighted passages,
//! the command line tool, and tests of the anchoring engine.

use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{Attribute, LocalName, Namespace, QualName, parse_document};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use smol_str::SmolStr;

use crate::error::TreeError;
use crate::highlight::HighlightId;
use crate::marker::{MARKER_ID_ATTR, MARKER_TAG, MarkerSpec, parse_marker_id};
use crate::tree::{ContentTree, NodeKind};

const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Handle to a node of an [`HtmlTree`]. Equality is identity.
#[derive(Clone)]
pub struct HtmlNode(Handle);

impl HtmlNode {
    pub fn handle(&self) -> &Handle {
        &self.0
    }
}

impl PartialEq for HtmlNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for HtmlNode {}

impl fmt::Debug for HtmlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.data {
            NodeData::Element { name, .. } => write!(f, "<{}>", &*name.local),
            NodeData::Text { contents } => write!(f, "#text({:?})", &**contents.borrow()),
            NodeData::Document => f.write_str("#document"),
            _ => f.write_str("#other"),
        }
    }
}

/// A parsed passage. The root is the document body.
pub struct HtmlTree {
    // Dropping an rcdom node empties every descendant, so the document must
    // outlive the body handle.
    _dom: RcDom,
    root: HtmlNode,
}

impl HtmlTree {
    /// Parse passage markup.
    pub fn parse(html: &str) -> Result<Self, TreeError> {
        let (dom, body) = parse_body(html)?;
        Ok(Self {
            _dom: dom,
            root: HtmlNode(body),
        })
    }

    /// The passage container.
    pub fn root(&self) -> &HtmlNode {
        &self.root
    }

    /// Serialize the container's children.
    pub fn to_html(&self) -> Result<String, TreeError> {
        let mut out = Vec::new();
        let handle: SerializableHandle = self.root.0.clone().into();
        serialize(
            &mut out,
            &handle,
            SerializeOpts {
                traversal_scope: TraversalScope::ChildrenOnly(None),
                ..Default::default()
            },
        )
        .map_err(|e| TreeError::Platform(e.to_string()))?;
        String::from_utf8(out).map_err(|e| TreeError::Platform(e.to_string()))
    }

    /// Concatenated text of the container.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.root.0, &mut out);
        out
    }

    /// Every text node in document order.
    pub fn text_nodes(&self) -> Vec<HtmlNode> {
        let mut out = Vec::new();
        collect_text_nodes(&self.root.0, &mut out);
        out
    }

    /// Rendered markers in document order, with their text.
    ///
    /// A highlight split across nodes shows up once per marker element.
    pub fn markers(&self) -> Vec<(HighlightId, String)> {
        let mut out = Vec::new();
        collect_markers(&self.root.0, &mut out);
        out
    }

    /// First text node containing `needle`, with the char offset where it
    /// starts.
    pub fn find_text(&self, needle: &str) -> Option<(HtmlNode, usize)> {
        self.text_nodes().into_iter().find_map(|node| {
            let offset = match &node.0.data {
                NodeData::Text { contents } => {
                    let text = contents.borrow();
                    let text: &str = &text;
                    text.find(needle).map(|b| text[..b].chars().count())
                }
                _ => None,
            };
            offset.map(|o| (node, o))
        })
    }
}

fn parse_body(html: &str) -> Result<(RcDom, Handle), TreeError> {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    let body = find_element(&dom.document, "body")
        .ok_or_else(|| TreeError::Platform("parsed document has no body".to_string()))?;
    Ok((dom, body))
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &handle.data {
        if &*name.local == tag {
            return Some(handle.clone());
        }
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

fn collect_text(handle: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &handle.data {
        out.push_str(&contents.borrow());
    }
    for child in handle.children.borrow().iter() {
        collect_text(child, out);
    }
}

fn collect_text_nodes(handle: &Handle, out: &mut Vec<HtmlNode>) {
    if let NodeData::Text { .. } = &handle.data {
        out.push(HtmlNode(handle.clone()));
    }
    for child in handle.children.borrow().iter() {
        collect_text_nodes(child, out);
    }
}

fn collect_markers(handle: &Handle, out: &mut Vec<(HighlightId, String)>) {
    if let Some(id) = element_marker(handle) {
        let mut text = String::new();
        collect_text(handle, &mut text);
        out.push((id, text));
    }
    for child in handle.children.borrow().iter() {
        collect_markers(child, out);
    }
}

fn element_marker(handle: &Handle) -> Option<HighlightId> {
    let NodeData::Element { attrs, .. } = &handle.data else {
        return None;
    };
    let attrs = attrs.borrow();
    parse_marker_id(
        attrs
            .iter()
            .find(|a| &*a.name.local == MARKER_ID_ATTR)
            .map(|a| &*a.value),
    )
}

fn attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
        value: StrTendril::from_slice(value),
    }
}

fn new_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

fn new_marker(marker: &MarkerSpec) -> Handle {
    Node::new(NodeData::Element {
        name: QualName::new(None, Namespace::from(XHTML_NS), LocalName::from(MARKER_TAG)),
        attrs: RefCell::new(vec![
            attribute("class", &marker.class_attr()),
            attribute(MARKER_ID_ATTR, &marker.id_attr()),
        ]),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

fn parent_of(handle: &Handle) -> Option<Handle> {
    let weak = handle.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    handle.parent.set(weak);
    parent
}

fn adopt(parent: &Handle, child: &Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
}

/// Byte offset of char index `idx`, or the end of the string.
fn byte_at(text: &str, idx: usize) -> usize {
    text.char_indices()
        .nth(idx)
        .map_or(text.len(), |(b, _)| b)
}

impl ContentTree for HtmlTree {
    type Node = HtmlNode;

    fn kind(&self, node: &HtmlNode) -> NodeKind {
        match &node.0.data {
            NodeData::Text { contents } => NodeKind::Text(contents.borrow().to_string()),
            NodeData::Element { name, .. } => NodeKind::Element {
                tag: SmolStr::new(&*name.local),
                marker: element_marker(&node.0),
            },
            _ => NodeKind::Other,
        }
    }

    fn children(&self, node: &HtmlNode) -> Vec<HtmlNode> {
        node.0
            .children
            .borrow()
            .iter()
            .cloned()
            .map(HtmlNode)
            .collect()
    }

    fn parent(&self, node: &HtmlNode) -> Option<HtmlNode> {
        parent_of(&node.0).map(HtmlNode)
    }

    fn wrap_text(
        &mut self,
        node: &HtmlNode,
        range: Range<usize>,
        marker: &MarkerSpec,
    ) -> Result<HtmlNode, TreeError> {
        let NodeData::Text { contents } = &node.0.data else {
            return Err(TreeError::NotText);
        };
        let text = contents.borrow().to_string();
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

        let parent = parent_of(&node.0).ok_or(TreeError::Detached)?;
        let start = byte_at(&text, range.start);
        let end = byte_at(&text, range.end);

        let mark = new_marker(marker);
        let inner = new_text(&text[start..end]);
        adopt(&mark, &inner);
        mark.children.borrow_mut().push(inner);

        let mut replacement = Vec::with_capacity(3);
        if start > 0 {
            replacement.push(new_text(&text[..start]));
        }
        replacement.push(mark.clone());
        if end < text.len() {
            replacement.push(new_text(&text[end..]));
        }

        let mut children = parent.children.borrow_mut();
        let idx = children
            .iter()
            .position(|c| Rc::ptr_eq(c, &node.0))
            .ok_or(TreeError::Detached)?;
        for new in &replacement {
            adopt(&parent, new);
        }
        children.splice(idx..idx + 1, replacement);
        node.0.parent.set(None);

        Ok(HtmlNode(mark))
    }

    fn reset_content(&mut self, root: &HtmlNode, html: &str) -> Result<(), TreeError> {
        let (_dom, body) = parse_body(html)?;
        let fresh: Vec<Handle> = body.children.take();

        let mut children = root.0.children.borrow_mut();
        for old in children.drain(..) {
            old.parent.set(None);
        }
        for new in &fresh {
            adopt(&root.0, new);
        }
        children.extend(fresh);
        Ok(())
    }
}
