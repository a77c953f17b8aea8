//! WASM browser tests for lectio-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use lectio_browser::{
    AnchorPoint, BrowserTree, ContentTree, DayKey, Highlight, HighlightColor, HighlightId,
    NewHighlight, Passage, PassOptions, ReaderController, ReaderHost, read_selection, render_pass,
};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, EventTarget, HtmlElement, MouseEvent, Node};

fn container(html: &str) -> Element {
    let document = web_sys::window().unwrap().document().unwrap();
    let div = document.create_element("div").unwrap();
    div.set_inner_html(html);
    document.body().unwrap().append_child(&div).unwrap();
    div
}

fn highlight(id: i64, color: HighlightColor, text: &str) -> Highlight {
    NewHighlight::new(DayKey::new("11-12").unwrap(), color, text)
        .unwrap()
        .into_highlight(HighlightId(id))
}

fn select(start: &Node, start_offset: u32, end: &Node, end_offset: u32) {
    let window = web_sys::window().unwrap();
    let range = window.document().unwrap().create_range().unwrap();
    range.set_start(start, start_offset).unwrap();
    range.set_end(end, end_offset).unwrap();
    let selection = window.get_selection().unwrap().unwrap();
    selection.remove_all_ranges().unwrap();
    selection.add_range(&range).unwrap();
}

fn first_text(element: &Element) -> Node {
    let mut node: Node = element.clone().into();
    while let Some(child) = node.first_child() {
        node = child;
    }
    node
}

// === Render pass ===

#[wasm_bindgen_test]
fn test_render_pass_wraps_in_dom() {
    let div = container("");
    let root: Node = div.clone().into();
    let mut tree = BrowserTree::from_window().unwrap();

    let report = render_pass(
        &mut tree,
        &root,
        "<p>In the beginning was the Word</p>",
        &[highlight(1, HighlightColor::Green, "the beginning")],
        PassOptions::default(),
    )
    .unwrap();

    assert_eq!(report.applied, vec![HighlightId(1)]);
    assert_eq!(
        div.inner_html(),
        r#"<p>In <mark class="highlight highlight-green" data-highlight-id="1">the beginning</mark> was the Word</p>"#
    );
}

#[wasm_bindgen_test]
fn test_wrap_counts_chars_not_code_units() {
    let div = container("");
    let root: Node = div.clone().into();
    let mut tree = BrowserTree::from_window().unwrap();

    render_pass(
        &mut tree,
        &root,
        "<p>\u{1d4db} the Word</p>",
        &[highlight(2, HighlightColor::Blue, "Word")],
        PassOptions::default(),
    )
    .unwrap();

    let marker = div.query_selector("mark").unwrap().unwrap();
    assert_eq!(marker.text_content().unwrap(), "Word");
}

#[wasm_bindgen_test]
fn test_reset_discards_previous_markers() {
    let div = container("");
    let root: Node = div.clone().into();
    let mut tree = BrowserTree::from_window().unwrap();
    let html = "<p>grace and truth</p>";

    render_pass(
        &mut tree,
        &root,
        html,
        &[highlight(3, HighlightColor::Pink, "grace")],
        PassOptions::default(),
    )
    .unwrap();
    render_pass(&mut tree, &root, html, &[], PassOptions::default()).unwrap();

    assert_eq!(div.inner_html(), html);
}

// === Selection reading ===

#[wasm_bindgen_test]
fn test_read_selection_inside_block() {
    let div = container("<p>In the <em>beginning</em>\n   was the Word</p>");
    let root: Node = div.clone().into();
    let tree = BrowserTree::from_window().unwrap();

    let em = div.query_selector("em").unwrap().unwrap();
    let em_text = first_text(&em);
    let tail = em.next_sibling().unwrap();
    select(&em_text, 0, &tail, 7);

    let snapshot = read_selection(&tree, &root).unwrap();
    assert!(!snapshot.collapsed);
    assert!(snapshot.within_container);
    assert!(snapshot.single_block);
    assert_eq!(snapshot.text, "beginning was");
}

#[wasm_bindgen_test]
fn test_read_selection_across_blocks() {
    let div = container("<p>full of grace.</p><p>The law</p>");
    let root: Node = div.clone().into();
    let tree = BrowserTree::from_window().unwrap();

    let paragraphs = div.query_selector_all("p").unwrap();
    let first = paragraphs.get(0).unwrap().dyn_into::<Element>().unwrap();
    let second = paragraphs.get(1).unwrap().dyn_into::<Element>().unwrap();
    select(&first_text(&first), 8, &first_text(&second), 3);

    let snapshot = read_selection(&tree, &root).unwrap();
    assert!(snapshot.within_container);
    assert!(!snapshot.single_block);
}

#[wasm_bindgen_test]
fn test_read_selection_ending_at_block_edge() {
    let div = container("<p>full of grace.</p><p>The law</p>");
    let root: Node = div.clone().into();
    let tree = BrowserTree::from_window().unwrap();

    let first = div.query_selector("p").unwrap().unwrap();
    // Triple-click style range: ends before the second paragraph.
    select(&first_text(&first), 8, &root, 1);

    let snapshot = read_selection(&tree, &root).unwrap();
    assert!(snapshot.single_block);
    assert_eq!(snapshot.text, "grace.");
}

// === Controller ===

#[derive(Clone, Default)]
struct RecordingHost {
    created: Rc<RefCell<Vec<NewHighlight>>>,
    deleted: Rc<RefCell<Vec<HighlightId>>>,
    menus: Rc<RefCell<Vec<Option<AnchorPoint>>>>,
}

impl ReaderHost for RecordingHost {
    fn create(&self, highlight: NewHighlight) {
        self.created.borrow_mut().push(highlight);
    }

    fn delete(&self, id: HighlightId) {
        self.deleted.borrow_mut().push(id);
    }

    fn menu(&self, anchor: Option<AnchorPoint>) {
        self.menus.borrow_mut().push(anchor);
    }

    fn confirm_delete(&self, _id: HighlightId) -> bool {
        true
    }
}

fn dispatch(target: &EventTarget, event: &str) {
    let event = MouseEvent::new(event).unwrap();
    target.dispatch_event(&event).unwrap();
}

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

#[wasm_bindgen_test]
fn test_controller_create_flow() {
    let div = container("");
    let host = RecordingHost::default();
    let reader = ReaderController::mount(
        BrowserTree::from_window().unwrap(),
        div.clone(),
        host.clone(),
        PassOptions::default(),
    );
    let day = DayKey::new("11-12").unwrap();
    reader
        .show(
            Passage::new(day.clone(), "<p>The light shines in the darkness</p>"),
            Vec::new(),
        )
        .unwrap();

    let p = div.query_selector("p").unwrap().unwrap();
    let text = first_text(&p);
    select(&text, 4, &text, 16);
    dispatch(&div, "mousedown");
    dispatch(&document(), "mouseup");

    assert!(reader.is_pending());
    assert!(matches!(host.menus.borrow().last(), Some(Some(_))));

    reader.choose_color(HighlightColor::Pink);
    assert!(!reader.is_pending());
    let created = host.created.borrow();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].selected_text(), "light shines");
    assert_eq!(created[0].day_key(), &day);
}

#[wasm_bindgen_test]
fn test_controller_ignores_release_without_press() {
    let div = container("");
    let host = RecordingHost::default();
    let reader = ReaderController::mount(
        BrowserTree::from_window().unwrap(),
        div.clone(),
        host.clone(),
        PassOptions::default(),
    );
    reader
        .show(
            Passage::new(DayKey::new("11-12").unwrap(), "<p>grace and truth</p>"),
            Vec::new(),
        )
        .unwrap();
    let menus_before = host.menus.borrow().len();

    let p = div.query_selector("p").unwrap().unwrap();
    let text = first_text(&p);
    select(&text, 0, &text, 5);
    dispatch(&document(), "mouseup");

    assert!(!reader.is_pending());
    assert_eq!(host.menus.borrow().len(), menus_before);
}

#[wasm_bindgen_test]
fn test_controller_marker_click_requests_delete() {
    let div = container("");
    let host = RecordingHost::default();
    let reader = ReaderController::mount(
        BrowserTree::from_window().unwrap(),
        div.clone(),
        host.clone(),
        PassOptions::default(),
    );
    reader
        .show(
            Passage::new(DayKey::new("11-12").unwrap(), "<p>grace and truth</p>"),
            vec![highlight(5, HighlightColor::Green, "truth")],
        )
        .unwrap();

    let marker = div
        .query_selector("mark")
        .unwrap()
        .unwrap()
        .dyn_into::<HtmlElement>()
        .unwrap();
    web_sys::window()
        .unwrap()
        .get_selection()
        .unwrap()
        .unwrap()
        .remove_all_ranges()
        .unwrap();
    // Bubbles up to the container listener.
    marker.click();

    assert_eq!(*host.deleted.borrow(), vec![HighlightId(5)]);

    reader.set_highlights(Vec::new()).unwrap();
    assert!(div.query_selector("mark").unwrap().is_none());
}

#[wasm_bindgen_test]
fn test_tree_reports_marker_ids() {
    let div = container(r#"<p><mark data-highlight-id="9">x</mark></p>"#);
    let tree = BrowserTree::from_window().unwrap();
    let mark: Node = div.query_selector("mark").unwrap().unwrap().into();
    assert_eq!(tree.kind(&mark).marker(), Some(HighlightId(9)));
}
