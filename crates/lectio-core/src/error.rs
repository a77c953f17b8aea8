//! Error types for the anchoring engine and its store contracts.
//!
//! None of these are fatal to a render pass: wrap failures are counted and
//! skipped, store failures become a status value on the session.

use miette::Diagnostic;

use crate::highlight::HighlightId;

/// Failure while mutating or reading a content tree.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum TreeError {
    /// Wrap target is not a text node.
    #[error("node is not a text node")]
    #[diagnostic(code(lectio::tree::not_text))]
    NotText,

    /// Wrap range falls outside the text node's content.
    #[error("range {start}..{end} out of bounds for text of {len} chars")]
    #[diagnostic(code(lectio::tree::out_of_bounds))]
    OutOfBounds { start: usize, end: usize, len: usize },

    /// Wrap range is empty.
    #[error("cannot wrap an empty range")]
    #[diagnostic(code(lectio::tree::empty_range))]
    EmptyRange,

    /// Text node has no parent to splice the marker into.
    #[error("text node is detached from the tree")]
    #[diagnostic(code(lectio::tree::detached))]
    Detached,

    /// Platform DOM call failed.
    #[error("dom operation failed: {0}")]
    #[diagnostic(code(lectio::tree::platform))]
    Platform(String),
}

impl From<&str> for TreeError {
    fn from(s: &str) -> Self {
        TreeError::Platform(s.to_string())
    }
}

impl From<String> for TreeError {
    fn from(s: String) -> Self {
        TreeError::Platform(s)
    }
}

/// Invalid highlight or reflection input, rejected before reaching a store.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum HighlightError {
    #[error("selected text is empty after normalization")]
    #[diagnostic(
        code(lectio::highlight::empty_text),
        help("select some non-whitespace text before choosing a color")
    )]
    EmptyText,

    #[error("unknown highlight color: {0}")]
    #[diagnostic(
        code(lectio::highlight::unknown_color),
        help("expected one of: green, pink, blue")
    )]
    UnknownColor(String),

    #[error("day key must not be blank")]
    #[diagnostic(code(lectio::highlight::blank_day_key))]
    BlankDayKey,

    #[error("reflection content must not be blank")]
    #[diagnostic(code(lectio::highlight::blank_reflection))]
    BlankReflection,

    #[error("invalid highlight id: {0}")]
    #[diagnostic(code(lectio::highlight::invalid_id))]
    InvalidId(String),

    #[error("no passage is loaded")]
    #[diagnostic(
        code(lectio::highlight::no_passage),
        help("load a day's passage before adding highlights or reflections")
    )]
    NoPassage,
}

/// Failure talking to a highlight/reflection store or passage provider.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum StoreError {
    /// Network or IO failure.
    #[error("store request failed: {0}")]
    #[diagnostic(code(lectio::store::transport))]
    Transport(String),

    /// A required record field was absent.
    #[error("missing required field: {0}")]
    #[diagnostic(code(lectio::store::missing_field))]
    MissingField(&'static str),

    /// Delete target does not exist.
    #[error("highlight {0} not found")]
    #[diagnostic(code(lectio::store::not_found))]
    NotFound(HighlightId),

    /// No passage is available for the requested day.
    #[error("no passage for day {0}")]
    #[diagnostic(code(lectio::store::no_passage))]
    PassageNotFound(String),

    /// Input rejected by validation.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Invalid(#[from] HighlightError),

    /// Backend reported an error or returned malformed data.
    #[error("store backend error: {0}")]
    #[diagnostic(code(lectio::store::backend))]
    Backend(String),
}

/// Failure of a session flow: either the store or the content tree refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SessionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Invalid(#[from] HighlightError),
}
