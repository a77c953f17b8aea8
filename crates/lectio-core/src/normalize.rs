//! Text normalization shared by selection capture and document matching.
//!
//! Stored highlight text and live document text must go through exactly the
//! same canonicalization, otherwise formatting whitespace in the passage HTML
//! (newlines between verses, `&nbsp;` after verse numbers) makes otherwise
//! identical text fail to match.

/// Check whether a char collapses into a single separator space.
///
/// Covers ASCII space, tab, newlines, non-breaking space and every other
/// Unicode `White_Space` character.
#[inline]
pub fn is_collapsible(c: char) -> bool {
    c.is_whitespace()
}

/// Normalize raw text: collapse whitespace runs to one ASCII space and trim.
///
/// Idempotent: `normalize_text(&normalize_text(s)) == normalize_text(s)`.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.chars() {
        if is_collapsible(c) {
            // Leading whitespace never produces a separator.
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }

    out
}

/// Check whether text is already in normalized form.
pub fn is_normalized(text: &str) -> bool {
    normalize_text(text) == text
}
