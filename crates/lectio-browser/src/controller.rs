//! Mounted reader: DOM listeners wired to the capture state machine.
//!
//! The controller owns the passage container's rendering. It never talks to
//! a store; commands go to the host, which persists them and pushes the
//! refreshed highlight list back with [`ReaderController::set_highlights`].
//!
//! State lives in an `Rc<RefCell<_>>` shared with the listeners. Borrows are
//! released before any host callback runs, so hosts may call back into the
//! controller synchronously.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::EventListener;
use lectio_core::{
    AnchorPoint, CaptureCommand, CaptureEffect, CaptureState, Highlight, HighlightColor, HighlightId,
    MARKER_ID_ATTR, MARKER_SELECTOR, NewHighlight, Passage, PassOptions, PassReport,
    ReadingSession, SelectionCapture, StoreStatus, Transition, TreeError, parse_marker_id,
};
use wasm_bindgen::JsCast;
use web_sys::{Element, KeyboardEvent, Node, Range};

use crate::selection::{clear_selection, read_selection, selection_is_collapsed};
use crate::tree::BrowserTree;

/// What the page hosting a reader provides.
pub trait ReaderHost {
    /// Persist a new highlight. Call `set_highlights` once the store confirms.
    fn create(&self, highlight: NewHighlight);

    /// Delete a highlight. Call `set_highlights` once the store confirms.
    fn delete(&self, id: HighlightId);

    /// Show the color menu at `anchor`, or hide it with `None`.
    fn menu(&self, anchor: Option<AnchorPoint>);

    /// Ask the reader to confirm deleting a highlight.
    fn confirm_delete(&self, id: HighlightId) -> bool {
        let message = format!("Delete highlight {}?", id);
        web_sys::window()
            .and_then(|w| w.confirm_with_message(&message).ok())
            .unwrap_or(false)
    }
}

struct ReaderState {
    session: ReadingSession<BrowserTree>,
    capture: SelectionCapture<Range>,
}

/// A reader mounted on one passage container.
pub struct ReaderController<H: ReaderHost + 'static> {
    state: Rc<RefCell<ReaderState>>,
    host: Rc<H>,
    container: Element,
    _listeners: Vec<EventListener>,
}

impl<H: ReaderHost + 'static> ReaderController<H> {
    /// Mount on the element with id `container_id`.
    pub fn mount_by_id(container_id: &str, host: H) -> Result<Self, TreeError> {
        let tree = BrowserTree::from_window()?;
        let container = tree
            .document()
            .get_element_by_id(container_id)
            .ok_or_else(|| format!("element not found: {}", container_id))?;
        Ok(Self::mount(tree, container, host, PassOptions::default()))
    }

    /// Mount on `container` and start listening for pointer input.
    pub fn mount(tree: BrowserTree, container: Element, host: H, options: PassOptions) -> Self {
        let root: Node = container.clone().into();
        let state = Rc::new(RefCell::new(ReaderState {
            session: ReadingSession::new(tree, root).with_options(options),
            capture: SelectionCapture::new(),
        }));
        let host = Rc::new(host);

        let mut listeners = Vec::with_capacity(4);

        {
            let state = state.clone();
            let host = host.clone();
            listeners.push(EventListener::new(&container, "mousedown", move |_| {
                let transition = state.borrow_mut().capture.pointer_pressed();
                perform(&state, host.as_ref(), transition);
            }));
        }

        {
            let state = state.clone();
            let host = host.clone();
            listeners.push(EventListener::new(&container, "click", move |event| {
                // A drag that ends on a marker also fires click.
                if !selection_is_collapsed() {
                    return;
                }
                let Some(id) = event
                    .target()
                    .and_then(|t| t.dyn_into::<Element>().ok())
                    .and_then(|el| el.closest(MARKER_SELECTOR).ok().flatten())
                    .and_then(|marker| {
                        parse_marker_id(marker.get_attribute(MARKER_ID_ATTR).as_deref())
                    })
                else {
                    return;
                };
                let confirmed = host.confirm_delete(id);
                let transition = state.borrow_mut().capture.marker_clicked(id, confirmed);
                perform(&state, host.as_ref(), transition);
            }));
        }

        let document = container.owner_document();

        // Drags may end outside the container. Only presses that began
        // inside it are judged.
        if let Some(document) = &document {
            let state = state.clone();
            let host = host.clone();
            listeners.push(EventListener::new(document, "mouseup", move |_| {
                let transition = {
                    let mut state = state.borrow_mut();
                    if !matches!(state.capture.state(), CaptureState::Selecting) {
                        return;
                    }
                    let snapshot =
                        read_selection(state.session.tree(), state.session.root());
                    state.capture.pointer_released(snapshot)
                };
                perform(&state, host.as_ref(), transition);
            }));
        }

        if let Some(document) = &document {
            let state = state.clone();
            let host = host.clone();
            listeners.push(EventListener::new(document, "keydown", move |event| {
                let escape = event
                    .dyn_ref::<KeyboardEvent>()
                    .is_some_and(|e| e.key() == "Escape");
                if escape {
                    let transition = state.borrow_mut().capture.dismiss();
                    perform(&state, host.as_ref(), transition);
                }
            }));
        }

        tracing::debug!(target: "lectio::browser", id = %container.id(), "reader mounted");

        Self {
            state,
            host,
            container,
            _listeners: listeners,
        }
    }

    pub fn container(&self) -> &Element {
        &self.container
    }

    /// Show a passage with its highlights.
    pub fn show(
        &self,
        passage: Passage,
        highlights: Vec<Highlight>,
    ) -> Result<PassReport, TreeError> {
        let (transition, report) = {
            let mut state = self.state.borrow_mut();
            let report = state.session.show(passage, highlights)?;
            state.session.set_status(StoreStatus::Ready);
            (state.capture.dismiss(), report)
        };
        perform(&self.state, self.host.as_ref(), transition);
        Ok(report)
    }

    /// Replace the highlights with a store-confirmed list and re-render.
    pub fn set_highlights(&self, highlights: Vec<Highlight>) -> Result<PassReport, TreeError> {
        let mut state = self.state.borrow_mut();
        let report = state.session.set_highlights(highlights)?;
        state.session.set_status(StoreStatus::Saved);
        Ok(report)
    }

    /// The color menu reported a choice.
    pub fn choose_color(&self, color: HighlightColor) {
        let transition = self.state.borrow_mut().capture.choose_color(color);
        perform(&self.state, self.host.as_ref(), transition);
    }

    /// The color menu was dismissed.
    pub fn dismiss(&self) {
        let transition = self.state.borrow_mut().capture.dismiss();
        perform(&self.state, self.host.as_ref(), transition);
    }

    /// Record a failed store round trip reported by the host.
    pub fn report_failure(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: "lectio::browser", %message, "host reported store failure");
        self.state
            .borrow_mut()
            .session
            .set_status(StoreStatus::Failed(message));
    }

    pub fn status(&self) -> StoreStatus {
        self.state.borrow().session.status().clone()
    }

    pub fn highlights(&self) -> Vec<Highlight> {
        self.state.borrow().session.highlights().to_vec()
    }

    pub fn last_report(&self) -> PassReport {
        self.state.borrow().session.last_report().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().capture.is_pending()
    }
}

/// Apply a transition's effects, then hand its command to the host.
fn perform<H: ReaderHost>(state: &Rc<RefCell<ReaderState>>, host: &H, transition: Transition) {
    for effect in transition.effects {
        match effect {
            CaptureEffect::ShowMenu(anchor) => host.menu(Some(anchor)),
            CaptureEffect::HideMenu => host.menu(None),
            CaptureEffect::ClearSelection => clear_selection(),
        }
    }

    match transition.command {
        Some(CaptureCommand::Create { color, text }) => {
            let new = {
                let mut state = state.borrow_mut();
                let new = state.session.new_highlight(color, &text);
                if new.is_ok() {
                    state.session.set_status(StoreStatus::Saving);
                }
                new
            };
            match new {
                Ok(new) => host.create(new),
                Err(e) => {
                    tracing::warn!(target: "lectio::browser", error = %e, "highlight not created")
                }
            }
        }
        Some(CaptureCommand::Delete(id)) => {
            state
                .borrow_mut()
                .session
                .set_status(StoreStatus::Deleting);
            host.delete(id);
        }
        None => {}
    }
}
