//! Reading the live selection.
//!
//! Turns the window's Selection into a `SelectionSnapshot` for the capture
//! state machine: endpoints resolved to text points, text read through the
//! engine's index, and a document-relative anchor for the color menu.

use lectio_core::{
    AnchorPoint, Boundary, BoundarySide, ContentTree, SelectionSnapshot, block_ancestor,
    resolve_boundary, snapshot_selection,
};
use web_sys::{Node, Range, Selection};

use crate::tree::{BrowserTree, utf16_to_char};

fn window_selection() -> Option<Selection> {
    web_sys::window()?.get_selection().ok().flatten()
}

/// Whether the window currently has no selected text.
pub fn selection_is_collapsed() -> bool {
    window_selection().is_none_or(|s| s.is_collapsed())
}

/// Collapse the live selection.
pub fn clear_selection() {
    if let Some(selection) = window_selection() {
        if let Err(e) = selection.remove_all_ranges() {
            tracing::debug!(target: "lectio::browser", "remove_all_ranges failed: {:?}", e);
        }
    }
}

/// Horizontal center and top edge of the range, in document coordinates.
pub fn anchor_point(range: &Range) -> AnchorPoint {
    let rect = range.get_bounding_client_rect();
    let (scroll_x, scroll_y) = web_sys::window()
        .map(|w| (w.scroll_x().unwrap_or(0.0), w.scroll_y().unwrap_or(0.0)))
        .unwrap_or((0.0, 0.0));
    AnchorPoint {
        x: rect.left() + rect.width() / 2.0 + scroll_x,
        y: rect.top() + scroll_y,
    }
}

/// Convert a DOM range boundary (UTF-16 offsets for text containers) into an
/// engine boundary.
pub fn dom_boundary(tree: &BrowserTree, container: Node, offset: u32) -> Boundary<Node> {
    match tree.text(&container) {
        Some(text) => Boundary::Text {
            offset: utf16_to_char(&text, offset as usize),
            node: container,
        },
        None => Boundary::Element {
            node: container,
            child: offset as usize,
        },
    }
}

/// Snapshot the window's selection relative to `root`.
///
/// Returns `None` when there is no range at all.
pub fn read_selection(tree: &BrowserTree, root: &Node) -> Option<SelectionSnapshot<Range>> {
    let selection = window_selection()?;
    if selection.range_count() == 0 {
        return None;
    }
    let range = selection.get_range_at(0).ok()?;
    let anchor = anchor_point(&range);

    let start_container = range.start_container().ok()?;
    let end_container = range.end_container().ok()?;
    let start_offset = range.start_offset().ok()?;
    let end_offset = range.end_offset().ok()?;

    let start = resolve_boundary(
        tree,
        &dom_boundary(tree, start_container.clone(), start_offset),
        BoundarySide::Start,
    );
    let end = resolve_boundary(
        tree,
        &dom_boundary(tree, end_container.clone(), end_offset),
        BoundarySide::End,
    );

    match (start, end) {
        (Some(start), Some(end)) if !range.collapsed() => {
            Some(snapshot_selection(tree, root, &start, &end, range, anchor))
        }
        _ => Some(fallback_snapshot(
            tree,
            root,
            &selection,
            &start_container,
            &end_container,
            range,
            anchor,
        )),
    }
}

/// Snapshot built from the containers alone, for selections whose endpoints
/// do not resolve to text.
fn fallback_snapshot(
    tree: &BrowserTree,
    root: &Node,
    selection: &Selection,
    start: &Node,
    end: &Node,
    range: Range,
    anchor: AnchorPoint,
) -> SelectionSnapshot<Range> {
    let within_container = tree.contains(root, start) && tree.contains(root, end);
    let single_block = within_container
        && matches!(
            (block_ancestor(tree, root, start), block_ancestor(tree, root, end)),
            (Some(a), Some(b)) if a == b
        );
    let text = selection.to_string().as_string().unwrap_or_default();

    SelectionSnapshot {
        collapsed: range.collapsed() || text.is_empty(),
        range,
        text,
        anchor,
        within_container,
        single_block,
    }
}
