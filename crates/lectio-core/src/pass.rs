//! The render pass: rebuild the passage and re-apply every highlight.
//!
//! Each pass starts from the raw passage markup so markers never survive from
//! one pass to the next. Highlights are applied one at a time in list order,
//! re-indexing after each because wrapping invalidates the previous index.

use serde::Serialize;

use crate::error::TreeError;
use crate::highlight::{Highlight, HighlightId};
use crate::index::{IndexFilter, build_index};
use crate::locate::locate;
use crate::marker::{MarkerSpec, wrap_spans};
use crate::normalize::normalize_text;
use crate::tree::ContentTree;

/// How a highlight binds when its first occurrence already carries markers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Bind to the first occurrence in the full text and wrap only the parts
    /// not already marked. Re-running a pass always lands in the same place.
    #[default]
    ClipToUnmarked,
    /// Search only text outside existing markers, so a repeated phrase can
    /// bind to a later, unmarked occurrence.
    NextUnmarked,
}

impl OverlapPolicy {
    fn filter(self) -> IndexFilter {
        match self {
            OverlapPolicy::ClipToUnmarked => IndexFilter::Content,
            OverlapPolicy::NextUnmarked => IndexFilter::Unmarked,
        }
    }
}

/// Options for a render pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassOptions {
    pub overlap: OverlapPolicy,
}

/// What happened to one highlight during a pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HighlightOutcome {
    /// At least one span was wrapped.
    Applied {
        wrapped: usize,
        /// Earlier markers the match ran through.
        clipped: Vec<HighlightId>,
        failed: usize,
    },
    /// Stored text normalizes to nothing.
    Empty,
    /// Text does not occur in the passage.
    Unmatched,
    /// Every char of the match is already inside earlier markers.
    Overlapped,
    /// Spans were found but the tree refused all of them.
    Failed { failed: usize },
}

/// Summary of a render pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Highlights with at least one marker in the tree.
    pub applied: Vec<HighlightId>,
    /// Applied highlights that lost part of their range to earlier markers.
    pub clipped: Vec<HighlightId>,
    /// Highlights whose text was not found.
    pub unmatched: Vec<HighlightId>,
    /// Highlights whose text normalized to nothing.
    pub empty: Vec<HighlightId>,
    /// Highlights entirely covered by earlier markers.
    pub overlapped: Vec<HighlightId>,
    /// Spans the tree refused to wrap, over all highlights.
    pub failed_wraps: usize,
}

impl PassReport {
    fn record(&mut self, id: HighlightId, outcome: HighlightOutcome) {
        match outcome {
            HighlightOutcome::Applied { clipped, failed, .. } => {
                self.applied.push(id);
                if !clipped.is_empty() {
                    self.clipped.push(id);
                }
                self.failed_wraps += failed;
            }
            HighlightOutcome::Empty => self.empty.push(id),
            HighlightOutcome::Unmatched => self.unmatched.push(id),
            HighlightOutcome::Overlapped => self.overlapped.push(id),
            HighlightOutcome::Failed { failed } => self.failed_wraps += failed,
        }
    }

    /// Every highlight in the list got at least one marker.
    pub fn all_applied(&self, total: usize) -> bool {
        self.applied.len() == total
    }
}

/// Reset `root` to `raw_html` and apply `highlights` in order.
///
/// Only a failed reset is an error. Individual highlights that cannot be
/// placed are reported, and the pass moves on.
pub fn render_pass<T: ContentTree>(
    tree: &mut T,
    root: &T::Node,
    raw_html: &str,
    highlights: &[Highlight],
    options: PassOptions,
) -> Result<PassReport, TreeError> {
    tree.reset_content(root, raw_html)?;
    Ok(apply_highlights(tree, root, highlights, options))
}

/// Apply `highlights` in order to an already-reset tree.
pub fn apply_highlights<T: ContentTree>(
    tree: &mut T,
    root: &T::Node,
    highlights: &[Highlight],
    options: PassOptions,
) -> PassReport {
    let mut report = PassReport::default();
    for highlight in highlights {
        let outcome = apply_highlight(tree, root, highlight, options);
        report.record(highlight.id, outcome);
    }

    tracing::debug!(
        target: "lectio::pass",
        total = highlights.len(),
        applied = report.applied.len(),
        unmatched = report.unmatched.len(),
        overlapped = report.overlapped.len(),
        failed_wraps = report.failed_wraps,
        "render pass complete"
    );

    report
}

/// Locate and wrap a single highlight against the current tree state.
pub fn apply_highlight<T: ContentTree>(
    tree: &mut T,
    root: &T::Node,
    highlight: &Highlight,
    options: PassOptions,
) -> HighlightOutcome {
    if normalize_text(&highlight.selected_text).is_empty() {
        return HighlightOutcome::Empty;
    }

    let index = build_index(tree, root, options.overlap.filter());
    let Some(location) = locate(&index, &highlight.selected_text) else {
        tracing::debug!(
            target: "lectio::pass",
            highlight = %highlight.id,
            "highlight text not found in passage"
        );
        return HighlightOutcome::Unmatched;
    };

    if location.spans.is_empty() {
        return HighlightOutcome::Overlapped;
    }

    let marker = MarkerSpec::new(highlight.id, highlight.color);
    let outcome = wrap_spans(tree, &location.spans, &marker);

    match (outcome.wrapped, outcome.failed) {
        (0, 0) => HighlightOutcome::Overlapped,
        (0, failed) => HighlightOutcome::Failed { failed },
        (wrapped, failed) => HighlightOutcome::Applied {
            wrapped,
            clipped: location.clipped,
            failed,
        },
    }
}
