//! Browser DOM layer for lectio.
//!
//! Implements the engine's `ContentTree` over `web_sys::Node` and wires the
//! selection capture state machine to pointer events on a passage
//! container. It assumes a `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `tree`: live DOM tree, UTF-16 offset conversion
//! - `selection`: window Selection to engine snapshot, menu anchor geometry
//! - `controller`: mounted reader, event listeners, host callbacks
//!
//! # Re-exports
//!
//! This crate re-exports `lectio-core` for convenience, so consumers only
//! need to depend on `lectio-browser`.

pub use lectio_core;
pub use lectio_core::*;

pub mod controller;
pub mod selection;
pub mod tree;

pub use controller::{ReaderController, ReaderHost};
pub use selection::{anchor_point, clear_selection, read_selection};
pub use tree::{BrowserTree, char_to_utf16, utf16_to_char};
