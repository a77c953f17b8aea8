//! Selection capture.
//!
//! A small state machine between the reader's pointer and the store:
//!
//! ```text
//! Idle --pointer down--> Selecting --pointer up, valid--> PendingChoice
//!  ^                         |                                |
//!  +------ rejected ---------+---- color chosen / dismissed --+
//! ```
//!
//! Transitions return commands (create, delete) and UI effects (show or hide
//! the color menu, clear the selection) as values. Platforms perform the
//! effects and hand commands to the store flow. The state machine never
//! touches the tree.
//!
//! Platform ranges are kept opaque (`R`); what the machine needs to judge a
//! selection is extracted up front into a [`SelectionSnapshot`].

use serde::{Deserialize, Serialize};

use crate::highlight::{HighlightColor, HighlightId};
use crate::index::{IndexFilter, build_index};
use crate::normalize::normalize_text;
use crate::tree::{ContentTree, block_ancestor};

/// Viewport-independent position for the color menu: the horizontal center
/// and top edge of the selection, in document coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub x: f64,
    pub y: f64,
}

/// A char position inside a text node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextPoint<N> {
    pub node: N,
    pub offset: usize,
}

/// A selection boundary as platforms report it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Boundary<N> {
    /// Char offset inside a text node.
    Text { node: N, offset: usize },
    /// Position between an element's children.
    Element { node: N, child: usize },
}

/// Everything the capture machine needs to know about a live selection.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionSnapshot<R> {
    /// Opaque platform range, kept for clearing or restoring the selection.
    pub range: R,
    /// Selected text as read, before normalization.
    pub text: String,
    pub anchor: AnchorPoint,
    pub collapsed: bool,
    /// Both ends are inside the passage container.
    pub within_container: bool,
    /// Both ends share the same nearest block ancestor.
    pub single_block: bool,
}

impl<R> SelectionSnapshot<R> {
    fn rejection(&self) -> Option<Rejection> {
        if self.collapsed {
            Some(Rejection::Collapsed)
        } else if !self.within_container {
            Some(Rejection::OutsideContainer)
        } else if !self.single_block {
            Some(Rejection::CrossesBlocks)
        } else {
            None
        }
    }
}

/// Why a pointer release did not produce a pending choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    NoSelection,
    Collapsed,
    OutsideContainer,
    CrossesBlocks,
}

/// Store operation requested by the reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureCommand {
    Create {
        color: HighlightColor,
        /// Normalized, never empty.
        text: String,
    },
    Delete(HighlightId),
}

/// UI side effect for the platform to perform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CaptureEffect {
    ShowMenu(AnchorPoint),
    HideMenu,
    ClearSelection,
}

/// Result of one transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub command: Option<CaptureCommand>,
    pub effects: Vec<CaptureEffect>,
    pub rejection: Option<Rejection>,
}

impl Transition {
    fn none() -> Self {
        Self {
            command: None,
            effects: Vec::new(),
            rejection: None,
        }
    }

    fn effects(effects: Vec<CaptureEffect>) -> Self {
        Self {
            effects,
            ..Self::none()
        }
    }
}

/// Capture state.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureState<R> {
    Idle,
    /// Pointer is down inside the container.
    Selecting,
    /// A valid selection waits for a color.
    PendingChoice {
        range: R,
        text: String,
        anchor: AnchorPoint,
    },
}

/// The selection capture state machine.
#[derive(Clone, Debug)]
pub struct SelectionCapture<R> {
    state: CaptureState<R>,
}

impl<R> Default for SelectionCapture<R> {
    fn default() -> Self {
        Self {
            state: CaptureState::Idle,
        }
    }
}

impl<R> SelectionCapture<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CaptureState<R> {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, CaptureState::PendingChoice { .. })
    }

    /// Where the color menu should be, if it is showing.
    pub fn menu_anchor(&self) -> Option<AnchorPoint> {
        match &self.state {
            CaptureState::PendingChoice { anchor, .. } => Some(*anchor),
            _ => None,
        }
    }

    /// Platform range of the pending selection.
    pub fn pending_range(&self) -> Option<&R> {
        match &self.state {
            CaptureState::PendingChoice { range, .. } => Some(range),
            _ => None,
        }
    }

    /// Pointer pressed inside the container. A pending menu is abandoned.
    pub fn pointer_pressed(&mut self) -> Transition {
        let was_pending = self.is_pending();
        self.state = CaptureState::Selecting;
        if was_pending {
            Transition::effects(vec![CaptureEffect::HideMenu])
        } else {
            Transition::none()
        }
    }

    /// Pointer released, with whatever selection the platform now sees.
    pub fn pointer_released(&mut self, snapshot: Option<SelectionSnapshot<R>>) -> Transition {
        let was_pending = self.is_pending();
        let hide = if was_pending {
            vec![CaptureEffect::HideMenu]
        } else {
            Vec::new()
        };

        let Some(snapshot) = snapshot else {
            self.state = CaptureState::Idle;
            return Transition {
                rejection: Some(Rejection::NoSelection),
                ..Transition::effects(hide)
            };
        };

        if let Some(rejection) = snapshot.rejection() {
            tracing::trace!(target: "lectio::selection", ?rejection, "selection rejected");
            self.state = CaptureState::Idle;
            return Transition {
                rejection: Some(rejection),
                ..Transition::effects(hide)
            };
        }

        let anchor = snapshot.anchor;
        self.state = CaptureState::PendingChoice {
            range: snapshot.range,
            text: snapshot.text,
            anchor,
        };
        Transition::effects(vec![CaptureEffect::ShowMenu(anchor)])
    }

    /// A color was picked from the menu.
    ///
    /// Emits a create command when the pending text normalizes to something,
    /// and always returns to idle.
    pub fn choose_color(&mut self, color: HighlightColor) -> Transition {
        let state = std::mem::replace(&mut self.state, CaptureState::Idle);
        let CaptureState::PendingChoice { text, .. } = state else {
            return Transition::none();
        };

        let text = normalize_text(&text);
        let command = (!text.is_empty()).then_some(CaptureCommand::Create { color, text });
        Transition {
            command,
            effects: vec![CaptureEffect::HideMenu, CaptureEffect::ClearSelection],
            rejection: None,
        }
    }

    /// A rendered marker was clicked and the reader answered the delete
    /// prompt. Declining leaves the state untouched.
    pub fn marker_clicked(&mut self, id: HighlightId, confirmed: bool) -> Transition {
        if !confirmed {
            return Transition::none();
        }

        let was_pending = self.is_pending();
        self.state = CaptureState::Idle;
        Transition {
            command: Some(CaptureCommand::Delete(id)),
            effects: if was_pending {
                vec![CaptureEffect::HideMenu]
            } else {
                Vec::new()
            },
            rejection: None,
        }
    }

    /// Menu dismissed without a choice.
    pub fn dismiss(&mut self) -> Transition {
        let was_pending = self.is_pending();
        self.state = CaptureState::Idle;
        if was_pending {
            Transition::effects(vec![CaptureEffect::HideMenu, CaptureEffect::ClearSelection])
        } else {
            Transition::none()
        }
    }
}

/// Which end of a selection a boundary belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundarySide {
    Start,
    End,
}

/// Resolve a platform boundary to a point in a text node.
///
/// A start boundary snaps forward to the start of the next text and an end
/// boundary snaps back to the end of the previous text, so a selection that
/// stops at a block edge stays inside the block it covers. Each side falls
/// back to the other direction when nothing lies that way.
pub fn resolve_boundary<T: ContentTree>(
    tree: &T,
    boundary: &Boundary<T::Node>,
    side: BoundarySide,
) -> Option<TextPoint<T::Node>> {
    match boundary {
        Boundary::Text { node, offset } => {
            let len = tree.text(node).map_or(0, |t| t.chars().count());
            let moved = match side {
                BoundarySide::Start if *offset >= len => {
                    adjacent_text(tree, node, true).map(text_start)
                }
                BoundarySide::End if *offset == 0 => {
                    adjacent_text(tree, node, false).map(|n| text_end(tree, n))
                }
                _ => None,
            };
            Some(moved.unwrap_or_else(|| TextPoint {
                node: node.clone(),
                offset: *offset,
            }))
        }
        Boundary::Element { node, child } => {
            let children = tree.children(node);
            let split = (*child).min(children.len());
            let (before, after) = children.split_at(split);
            let next = || after.iter().find_map(|c| first_text(tree, c)).map(text_start);
            let previous = || {
                before
                    .iter()
                    .rev()
                    .find_map(|c| last_text(tree, c))
                    .map(|n| text_end(tree, n))
            };
            match side {
                BoundarySide::Start => next().or_else(previous),
                BoundarySide::End => previous().or_else(next),
            }
        }
    }
}

fn text_start<N>(node: N) -> TextPoint<N> {
    TextPoint { node, offset: 0 }
}

fn text_end<T: ContentTree>(tree: &T, node: T::Node) -> TextPoint<T::Node> {
    let offset = tree.text(&node).map_or(0, |t| t.chars().count());
    TextPoint { node, offset }
}

/// Nearest text node after (or before) `node` in document order.
fn adjacent_text<T: ContentTree>(tree: &T, node: &T::Node, forward: bool) -> Option<T::Node> {
    let mut current = node.clone();
    while let Some(parent) = tree.parent(&current) {
        let siblings = tree.children(&parent);
        let pos = siblings.iter().position(|s| s == &current)?;
        let found = if forward {
            siblings[pos + 1..].iter().find_map(|c| first_text(tree, c))
        } else {
            siblings[..pos].iter().rev().find_map(|c| last_text(tree, c))
        };
        if found.is_some() {
            return found;
        }
        current = parent;
    }
    None
}

fn first_text<T: ContentTree>(tree: &T, node: &T::Node) -> Option<T::Node> {
    if tree.kind(node).is_text() {
        return Some(node.clone());
    }
    tree.children(node).iter().find_map(|c| first_text(tree, c))
}

fn last_text<T: ContentTree>(tree: &T, node: &T::Node) -> Option<T::Node> {
    if tree.kind(node).is_text() {
        return Some(node.clone());
    }
    tree.children(node).iter().rev().find_map(|c| last_text(tree, c))
}

/// Judge a selection between two text points of `root`.
///
/// The text is read through the same index the render pass uses, so a
/// captured selection normalizes exactly the way it will be matched later.
pub fn snapshot_selection<T: ContentTree, R>(
    tree: &T,
    root: &T::Node,
    start: &TextPoint<T::Node>,
    end: &TextPoint<T::Node>,
    range: R,
    anchor: AnchorPoint,
) -> SelectionSnapshot<R> {
    let within_container = tree.contains(root, &start.node) && tree.contains(root, &end.node);
    let single_block = within_container
        && match (
            block_ancestor(tree, root, &start.node),
            block_ancestor(tree, root, &end.node),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
    let text = if within_container {
        selected_text(tree, root, start, end).unwrap_or_default()
    } else {
        String::new()
    };
    let collapsed = start == end;

    SelectionSnapshot {
        range,
        text,
        anchor,
        collapsed,
        within_container,
        single_block,
    }
}

/// Normalized text between two points of `root`, in either order.
pub fn selected_text<T: ContentTree>(
    tree: &T,
    root: &T::Node,
    start: &TextPoint<T::Node>,
    end: &TextPoint<T::Node>,
) -> Option<String> {
    let index = build_index(tree, root, IndexFilter::Content);
    let a = index.raw_offset_of(&start.node, start.offset)?;
    let b = index.raw_offset_of(&end.node, end.offset)?;
    let raw = a.min(b)..a.max(b);
    let normalized = index.normalized_range(&raw);
    Some(normalize_text(index.normalized_slice(normalized)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(text: &str) -> SelectionSnapshot<u32> {
        SelectionSnapshot {
            range: 1,
            text: text.to_string(),
            anchor: AnchorPoint { x: 120.0, y: 48.0 },
            collapsed: false,
            within_container: true,
            single_block: true,
        }
    }

    #[test]
    fn test_valid_release_shows_menu() {
        let mut capture = SelectionCapture::new();
        capture.pointer_pressed();
        assert_eq!(capture.state(), &CaptureState::Selecting);

        let t = capture.pointer_released(Some(snapshot("the Word")));
        assert_eq!(
            t.effects,
            vec![CaptureEffect::ShowMenu(AnchorPoint { x: 120.0, y: 48.0 })]
        );
        assert!(capture.is_pending());
        assert_eq!(capture.pending_range(), Some(&1));
    }

    #[test]
    fn test_rejections_return_to_idle() {
        let cases = [
            (
                SelectionSnapshot {
                    collapsed: true,
                    ..snapshot("")
                },
                Rejection::Collapsed,
            ),
            (
                SelectionSnapshot {
                    within_container: false,
                    ..snapshot("menu")
                },
                Rejection::OutsideContainer,
            ),
            (
                SelectionSnapshot {
                    single_block: false,
                    ..snapshot("grace. The")
                },
                Rejection::CrossesBlocks,
            ),
        ];

        for (snap, expected) in cases {
            let mut capture = SelectionCapture::new();
            let t = capture.pointer_released(Some(snap));
            assert_eq!(t.rejection, Some(expected));
            assert!(t.effects.is_empty());
            assert_eq!(capture.state(), &CaptureState::Idle);
        }

        let mut capture = SelectionCapture::<u32>::new();
        let t = capture.pointer_released(None);
        assert_eq!(t.rejection, Some(Rejection::NoSelection));
    }

    #[test]
    fn test_choose_color_creates_normalized() {
        let mut capture = SelectionCapture::new();
        capture.pointer_released(Some(snapshot("  the\n   Word ")));
        let t = capture.choose_color(HighlightColor::Blue);
        assert_eq!(
            t.command,
            Some(CaptureCommand::Create {
                color: HighlightColor::Blue,
                text: "the Word".into(),
            })
        );
        assert_eq!(
            t.effects,
            vec![CaptureEffect::HideMenu, CaptureEffect::ClearSelection]
        );
        assert_eq!(capture.state(), &CaptureState::Idle);
    }

    #[test]
    fn test_whitespace_selection_creates_nothing() {
        let mut capture = SelectionCapture::new();
        capture.pointer_released(Some(snapshot(" \n\t ")));
        let t = capture.choose_color(HighlightColor::Green);
        assert_eq!(t.command, None);
        assert_eq!(capture.state(), &CaptureState::Idle);
    }

    #[test]
    fn test_choose_without_pending_is_noop() {
        let mut capture = SelectionCapture::<u32>::new();
        let t = capture.choose_color(HighlightColor::Pink);
        assert_eq!(t, Transition::none());
    }

    #[test]
    fn test_marker_click_deletes_when_confirmed() {
        let mut capture = SelectionCapture::new();
        capture.pointer_released(Some(snapshot("light")));

        let declined = capture.marker_clicked(HighlightId(5), false);
        assert_eq!(declined.command, None);
        assert!(capture.is_pending());

        let confirmed = capture.marker_clicked(HighlightId(5), true);
        assert_eq!(confirmed.command, Some(CaptureCommand::Delete(HighlightId(5))));
        assert_eq!(confirmed.effects, vec![CaptureEffect::HideMenu]);
        assert_eq!(capture.state(), &CaptureState::Idle);
    }

    #[test]
    fn test_dismiss_and_repress_hide_menu() {
        let mut capture = SelectionCapture::new();
        capture.pointer_released(Some(snapshot("light")));
        let t = capture.pointer_pressed();
        assert_eq!(t.effects, vec![CaptureEffect::HideMenu]);

        capture.pointer_released(Some(snapshot("light")));
        let t = capture.dismiss();
        assert_eq!(
            t.effects,
            vec![CaptureEffect::HideMenu, CaptureEffect::ClearSelection]
        );
        assert_eq!(capture.menu_anchor(), None);
    }

    #[cfg(feature = "html")]
    fn blocks() -> crate::HtmlTree {
        crate::HtmlTree::parse("<p>full of grace.</p><p>The law</p>").unwrap()
    }

    #[cfg(feature = "html")]
    #[test]
    fn test_element_boundary_snaps_by_side() {
        let tree = blocks();
        let root = tree.root().clone();
        let (grace, _) = tree.find_text("grace").unwrap();
        let (law, _) = tree.find_text("law").unwrap();
        let between = Boundary::Element {
            node: root.clone(),
            child: 1,
        };

        let end = resolve_boundary(&tree, &between, BoundarySide::End).unwrap();
        assert_eq!(
            end,
            TextPoint {
                node: grace.clone(),
                offset: 14,
            }
        );
        let start = resolve_boundary(&tree, &between, BoundarySide::Start).unwrap();
        assert_eq!(
            start,
            TextPoint {
                node: law,
                offset: 0,
            }
        );

        let from = TextPoint {
            node: grace,
            offset: 8,
        };
        let snapshot = snapshot_selection(&tree, &root, &from, &end, (), AnchorPoint::default());
        assert!(snapshot.single_block);
        assert_eq!(snapshot.text, "grace.");
    }

    #[cfg(feature = "html")]
    #[test]
    fn test_element_boundary_falls_back_when_nothing_lies_that_way() {
        let tree = blocks();
        let root = tree.root().clone();
        let (grace, _) = tree.find_text("grace").unwrap();
        let (law, _) = tree.find_text("law").unwrap();

        let first = Boundary::Element {
            node: root.clone(),
            child: 0,
        };
        assert_eq!(
            resolve_boundary(&tree, &first, BoundarySide::End),
            Some(TextPoint {
                node: grace,
                offset: 0,
            })
        );
        let past_end = Boundary::Element {
            node: root,
            child: 9,
        };
        assert_eq!(
            resolve_boundary(&tree, &past_end, BoundarySide::Start),
            Some(TextPoint {
                node: law,
                offset: 7,
            })
        );
    }

    #[cfg(feature = "html")]
    #[test]
    fn test_text_boundary_at_block_edge_moves_inward() {
        let tree = blocks();
        let root = tree.root().clone();
        let (grace, g) = tree.find_text("grace").unwrap();
        let (law, _) = tree.find_text("law").unwrap();

        let end = resolve_boundary(
            &tree,
            &Boundary::Text {
                node: law.clone(),
                offset: 0,
            },
            BoundarySide::End,
        )
        .unwrap();
        assert_eq!(
            end,
            TextPoint {
                node: grace.clone(),
                offset: 14,
            }
        );
        let from = TextPoint {
            node: grace.clone(),
            offset: g,
        };
        let snapshot = snapshot_selection(&tree, &root, &from, &end, (), AnchorPoint::default());
        assert!(snapshot.single_block);

        let start = resolve_boundary(
            &tree,
            &Boundary::Text {
                node: grace.clone(),
                offset: 14,
            },
            BoundarySide::Start,
        )
        .unwrap();
        assert_eq!(
            start,
            TextPoint {
                node: law.clone(),
                offset: 0,
            }
        );

        // Interior offsets stay put on either side.
        let inside = Boundary::Text {
            node: law.clone(),
            offset: 3,
        };
        for side in [BoundarySide::Start, BoundarySide::End] {
            assert_eq!(
                resolve_boundary(&tree, &inside, side),
                Some(TextPoint {
                    node: law.clone(),
                    offset: 3,
                })
            );
        }
    }
}
