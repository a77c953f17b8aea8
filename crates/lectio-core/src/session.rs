//! Reading session: one passage container, its day's records, and the flows
//! that keep the rendered view in sync with the store.
//!
//! Local state only changes after the store confirms. Every change ends in a
//! full render pass from the raw passage markup, so the view is always a
//! pure function of (passage, highlight list).
//!
//! Flows take `&mut self` across their awaits, so two flows can never
//! interleave on one session and a stale response cannot overwrite a newer
//! one.

use crate::day::DayKey;
use crate::error::{HighlightError, SessionError, StoreError, TreeError};
use crate::highlight::{
    ColorGroups, Highlight, HighlightColor, HighlightId, NewHighlight, NewReflection, Reflection,
};
use crate::pass::{PassOptions, PassReport, render_pass};
use crate::selection::CaptureCommand;
use crate::store::{HighlightStore, Passage, PassageProvider, ReflectionStore};
use crate::tree::ContentTree;

/// Store activity, for status display.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StoreStatus {
    #[default]
    Ready,
    Loading,
    Saving,
    Deleting,
    Saved,
    Failed(String),
}

impl StoreStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Loading | Self::Saving | Self::Deleting)
    }
}

/// A rendered passage plus the records drawn over it.
pub struct ReadingSession<T: ContentTree> {
    tree: T,
    root: T::Node,
    options: PassOptions,
    passage: Option<Passage>,
    highlights: Vec<Highlight>,
    reflections: Vec<Reflection>,
    status: StoreStatus,
    last_report: PassReport,
}

impl<T: ContentTree> ReadingSession<T> {
    pub fn new(tree: T, root: T::Node) -> Self {
        Self {
            tree,
            root,
            options: PassOptions::default(),
            passage: None,
            highlights: Vec::new(),
            reflections: Vec::new(),
            status: StoreStatus::Ready,
            last_report: PassReport::default(),
        }
    }

    pub fn with_options(mut self, options: PassOptions) -> Self {
        self.options = options;
        self
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    pub fn root(&self) -> &T::Node {
        &self.root
    }

    pub fn passage(&self) -> Option<&Passage> {
        self.passage.as_ref()
    }

    pub fn day_key(&self) -> Option<&DayKey> {
        self.passage.as_ref().map(|p| &p.day_key)
    }

    /// Highlights in creation order.
    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn highlight(&self, id: HighlightId) -> Option<&Highlight> {
        self.highlights.iter().find(|h| h.id == id)
    }

    pub fn color_groups(&self) -> ColorGroups<'_> {
        ColorGroups::new(&self.highlights)
    }

    pub fn reflections(&self) -> &[Reflection] {
        &self.reflections
    }

    pub fn status(&self) -> &StoreStatus {
        &self.status
    }

    pub fn set_status(&mut self, status: StoreStatus) {
        self.status = status;
    }

    /// Report of the most recent render pass.
    pub fn last_report(&self) -> &PassReport {
        &self.last_report
    }

    /// Show a passage with its highlights, replacing whatever was shown.
    pub fn show(
        &mut self,
        passage: Passage,
        highlights: Vec<Highlight>,
    ) -> Result<PassReport, TreeError> {
        if self.day_key() != Some(&passage.day_key) {
            self.reflections.clear();
        }
        self.passage = Some(passage);
        self.highlights = highlights;
        self.render()
    }

    /// Replace the highlight list with a store-confirmed one and re-render.
    pub fn set_highlights(&mut self, highlights: Vec<Highlight>) -> Result<PassReport, TreeError> {
        self.highlights = highlights;
        self.render()
    }

    pub fn set_reflections(&mut self, reflections: Vec<Reflection>) {
        self.reflections = reflections;
    }

    /// Run a full render pass over the current passage and highlights.
    pub fn render(&mut self) -> Result<PassReport, TreeError> {
        let html = self.passage.as_ref().map_or("", |p| p.html.as_str());
        let report = render_pass(
            &mut self.tree,
            &self.root,
            html,
            &self.highlights,
            self.options,
        )?;
        self.last_report = report.clone();
        Ok(report)
    }

    /// Validate a new highlight for the current day.
    pub fn new_highlight(
        &self,
        color: HighlightColor,
        text: &str,
    ) -> Result<NewHighlight, HighlightError> {
        let day = self.day_key().ok_or(HighlightError::NoPassage)?;
        NewHighlight::new(day.clone(), color, text)
    }

    /// Validate a new reflection for the current day.
    pub fn new_reflection(&self, content: &str) -> Result<NewReflection, HighlightError> {
        let day = self.day_key().ok_or(HighlightError::NoPassage)?;
        NewReflection::new(day.clone(), content)
    }

    fn fail(&mut self, err: StoreError) -> SessionError {
        tracing::warn!(target: "lectio::session", error = %err, "store request failed");
        self.status = StoreStatus::Failed(err.to_string());
        err.into()
    }

    /// Fetch a day's passage and records, then render.
    ///
    /// `None` loads today's passage.
    pub async fn load_day<P, S>(
        &mut self,
        provider: &P,
        store: &S,
        day: Option<&DayKey>,
    ) -> Result<PassReport, SessionError>
    where
        P: PassageProvider,
        S: HighlightStore + ReflectionStore,
    {
        self.status = StoreStatus::Loading;

        let passage = match provider.passage(day).await {
            Ok(passage) => passage,
            Err(e) => return Err(self.fail(e)),
        };
        let highlights = match store.list(&passage.day_key).await {
            Ok(list) => list,
            Err(e) => return Err(self.fail(e)),
        };
        let reflections = match store.list_reflections(&passage.day_key).await {
            Ok(list) => list,
            Err(e) => return Err(self.fail(e)),
        };

        tracing::info!(
            target: "lectio::session",
            day = %passage.day_key,
            highlights = highlights.len(),
            reflections = reflections.len(),
            "loaded day"
        );

        self.show(passage, highlights)?;
        self.reflections = reflections;
        self.status = StoreStatus::Ready;
        Ok(self.last_report.clone())
    }

    /// Persist a highlight for the current day and re-render with it.
    pub async fn create_highlight<S: HighlightStore>(
        &mut self,
        store: &S,
        color: HighlightColor,
        text: &str,
    ) -> Result<Highlight, SessionError> {
        let new = self.new_highlight(color, text)?;
        self.status = StoreStatus::Saving;

        let created = match store.create(new).await {
            Ok(created) => created,
            Err(e) => return Err(self.fail(e)),
        };

        tracing::debug!(target: "lectio::session", id = %created.id, color = %created.color, "highlight created");
        self.highlights.push(created.clone());
        self.status = StoreStatus::Saved;
        self.render()?;
        Ok(created)
    }

    /// Delete a highlight and re-render without it.
    pub async fn delete_highlight<S: HighlightStore>(
        &mut self,
        store: &S,
        id: HighlightId,
    ) -> Result<PassReport, SessionError> {
        self.status = StoreStatus::Deleting;

        if let Err(e) = store.delete(id).await {
            return Err(self.fail(e));
        }

        tracing::debug!(target: "lectio::session", %id, "highlight deleted");
        self.highlights.retain(|h| h.id != id);
        self.status = StoreStatus::Saved;
        Ok(self.render()?)
    }

    /// Persist a reflection for the current day.
    pub async fn add_reflection<S: ReflectionStore>(
        &mut self,
        store: &S,
        content: &str,
    ) -> Result<Reflection, SessionError> {
        let new = self.new_reflection(content)?;
        self.status = StoreStatus::Saving;

        let created = match store.create_reflection(new).await {
            Ok(created) => created,
            Err(e) => return Err(self.fail(e)),
        };

        self.reflections.push(created.clone());
        self.status = StoreStatus::Saved;
        Ok(created)
    }

    /// Carry out a command from selection capture.
    pub async fn apply_command<S: HighlightStore>(
        &mut self,
        store: &S,
        command: CaptureCommand,
    ) -> Result<PassReport, SessionError> {
        match command {
            CaptureCommand::Create { color, text } => {
                self.create_highlight(store, color, &text).await?;
                Ok(self.last_report.clone())
            }
            CaptureCommand::Delete(id) => self.delete_highlight(store, id).await,
        }
    }
}
