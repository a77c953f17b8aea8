//! lectio-core: highlight anchoring for rendered reading passages.
//!
//! Highlights are stored as plain normalized text, with no offsets. Every
//! time a passage is shown the engine rebuilds it from raw markup and
//! re-locates each highlight by first occurrence, wrapping the matching
//! text in marker elements.
//!
//! This crate provides:
//! - `ContentTree` trait for the rendered passage container
//! - `TextIndex` - raw/normalized text index with a position map
//! - `render_pass` - reset and re-apply every highlight, returning a report
//! - `SelectionCapture` - selection to color choice to store command
//! - `ReadingSession` - passage, records and store flows for one container
//! - `HtmlTree` (feature `html`) - native tree over html5ever

pub mod day;
pub mod error;
pub mod highlight;
#[cfg(feature = "html")]
pub mod html;
pub mod index;
pub mod locate;
pub mod marker;
pub mod normalize;
pub mod pass;
pub mod selection;
pub mod session;
pub mod store;
pub mod tree;

pub use day::DayKey;
pub use error::{HighlightError, SessionError, StoreError, TreeError};
pub use highlight::{
    ColorGroups, Highlight, HighlightColor, HighlightId, NewHighlight, NewReflection, Reflection,
    ReflectionId,
};
#[cfg(feature = "html")]
pub use html::{HtmlNode, HtmlTree};
pub use index::{
    IndexFilter, MARKER_BARRIER, RawPosition, TextIndex, TextRun, build_index, build_index_with,
};
pub use locate::{Location, TextSpan, locate};
pub use marker::{
    MARKER_CLASS, MARKER_ID_ATTR, MARKER_SELECTOR, MARKER_TAG, MarkerSpec, WrapOutcome,
    parse_marker_id, wrap_spans,
};
pub use normalize::{is_normalized, normalize_text};
pub use pass::{
    HighlightOutcome, OverlapPolicy, PassOptions, PassReport, apply_highlight, apply_highlights,
    render_pass,
};
pub use selection::{
    AnchorPoint, Boundary, BoundarySide, CaptureCommand, CaptureEffect, CaptureState, Rejection,
    SelectionCapture, SelectionSnapshot, TextPoint, Transition, resolve_boundary, selected_text,
    snapshot_selection,
};
pub use session::{ReadingSession, StoreStatus};
pub use smol_str::SmolStr;
pub use store::{
    HighlightStore, MemoryPassages, MemoryStore, Passage, PassageProvider, ReflectionStore,
};
pub use tree::{ContentTree, NodeKind, block_ancestor, enclosing_marker, is_block_tag};
