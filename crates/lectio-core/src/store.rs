//! Store and passage provider contracts.
//!
//! The engine never talks to a backend directly. Sessions drive these
//! traits, and only the records a store hands back are ever rendered.
//! Records are created or deleted, never edited.

use std::cell::RefCell;
use std::future::Future;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::day::DayKey;
use crate::error::StoreError;
use crate::highlight::{
    Highlight, HighlightId, NewHighlight, NewReflection, Reflection, ReflectionId,
};

/// Highlight persistence.
pub trait HighlightStore {
    /// Highlights of one day in creation order.
    fn list(&self, day: &DayKey) -> impl Future<Output = Result<Vec<Highlight>, StoreError>>;

    /// Persist a highlight and return the stored record with its id.
    fn create(
        &self,
        highlight: NewHighlight,
    ) -> impl Future<Output = Result<Highlight, StoreError>>;

    fn delete(&self, id: HighlightId) -> impl Future<Output = Result<(), StoreError>>;
}

/// Reflection persistence.
pub trait ReflectionStore {
    /// Reflections of one day, oldest first.
    fn list_reflections(
        &self,
        day: &DayKey,
    ) -> impl Future<Output = Result<Vec<Reflection>, StoreError>>;

    fn create_reflection(
        &self,
        reflection: NewReflection,
    ) -> impl Future<Output = Result<Reflection, StoreError>>;
}

/// One day's reading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passage {
    pub day_key: DayKey,
    /// Human-readable date, e.g. `November 12`.
    pub formatted_date: String,
    /// Trusted, pre-rendered passage markup.
    #[serde(rename = "passageHtml")]
    pub html: String,
}

impl Passage {
    /// Build a passage, deriving the display date from the key when it has
    /// the `MM-DD` form.
    pub fn new(day_key: DayKey, html: impl Into<String>) -> Self {
        let formatted_date = day_key
            .formatted()
            .unwrap_or_else(|| day_key.to_string());
        Self {
            day_key,
            formatted_date,
            html: html.into(),
        }
    }
}

/// Source of passage markup.
pub trait PassageProvider {
    /// Passage for `day`, or for today when `None`.
    fn passage(&self, day: Option<&DayKey>) -> impl Future<Output = Result<Passage, StoreError>>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_highlight: i64,
    next_reflection: i64,
    highlights: Vec<Highlight>,
    reflections: Vec<Reflection>,
    fail_next: Option<StoreError>,
}

impl MemoryInner {
    fn check(&mut self) -> Result<(), StoreError> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// In-process store with monotonically increasing ids.
///
/// Single-threaded; used by tests and by hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RefCell<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records, continuing ids after the largest one.
    pub fn with_records(highlights: Vec<Highlight>, reflections: Vec<Reflection>) -> Self {
        let next_highlight = highlights.iter().map(|h| h.id.0).max().unwrap_or(0);
        let next_reflection = reflections.iter().map(|r| r.id.0).max().unwrap_or(0);
        Self {
            inner: RefCell::new(MemoryInner {
                next_highlight,
                next_reflection,
                highlights,
                reflections,
                fail_next: None,
            }),
        }
    }

    /// Make the next store call fail with `err`.
    pub fn fail_next(&self, err: StoreError) {
        self.inner.borrow_mut().fail_next = Some(err);
    }

    /// Every stored highlight, all days.
    pub fn highlights(&self) -> Vec<Highlight> {
        self.inner.borrow().highlights.clone()
    }

    /// Every stored reflection, all days.
    pub fn reflections(&self) -> Vec<Reflection> {
        self.inner.borrow().reflections.clone()
    }
}

impl HighlightStore for MemoryStore {
    fn list(&self, day: &DayKey) -> impl Future<Output = Result<Vec<Highlight>, StoreError>> {
        let result: Result<Vec<Highlight>, StoreError> = {
            let mut inner = self.inner.borrow_mut();
            inner.check().map(|()| {
                inner
                    .highlights
                    .iter()
                    .filter(|h| &h.day_key == day)
                    .cloned()
                    .collect()
            })
        };
        async move { result }
    }

    fn create(
        &self,
        highlight: NewHighlight,
    ) -> impl Future<Output = Result<Highlight, StoreError>> {
        let result = {
            let mut inner = self.inner.borrow_mut();
            inner.check().map(|()| {
                inner.next_highlight += 1;
                let record = highlight.into_highlight(HighlightId(inner.next_highlight));
                inner.highlights.push(record.clone());
                record
            })
        };
        async move { result }
    }

    fn delete(&self, id: HighlightId) -> impl Future<Output = Result<(), StoreError>> {
        let result = {
            let mut inner = self.inner.borrow_mut();
            inner.check().and_then(|()| {
                let before = inner.highlights.len();
                inner.highlights.retain(|h| h.id != id);
                if inner.highlights.len() == before {
                    Err(StoreError::NotFound(id))
                } else {
                    Ok(())
                }
            })
        };
        async move { result }
    }
}

impl ReflectionStore for MemoryStore {
    fn list_reflections(
        &self,
        day: &DayKey,
    ) -> impl Future<Output = Result<Vec<Reflection>, StoreError>> {
        let result: Result<Vec<Reflection>, StoreError> = {
            let mut inner = self.inner.borrow_mut();
            inner.check().map(|()| {
                inner
                    .reflections
                    .iter()
                    .filter(|r| &r.day_key == day)
                    .cloned()
                    .collect()
            })
        };
        async move { result }
    }

    fn create_reflection(
        &self,
        reflection: NewReflection,
    ) -> impl Future<Output = Result<Reflection, StoreError>> {
        let result = {
            let mut inner = self.inner.borrow_mut();
            inner.check().map(|()| {
                inner.next_reflection += 1;
                let record =
                    reflection.into_reflection(ReflectionId(inner.next_reflection), Utc::now());
                inner.reflections.push(record.clone());
                record
            })
        };
        async move { result }
    }
}

/// Fixed set of passages, keyed by day.
#[derive(Debug, Default, Clone)]
pub struct MemoryPassages {
    passages: Vec<Passage>,
}

impl MemoryPassages {
    pub fn new(passages: impl IntoIterator<Item = Passage>) -> Self {
        Self {
            passages: passages.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, passage: Passage) {
        self.passages.retain(|p| p.day_key != passage.day_key);
        self.passages.push(passage);
    }
}

impl PassageProvider for MemoryPassages {
    fn passage(&self, day: Option<&DayKey>) -> impl Future<Output = Result<Passage, StoreError>> {
        let day = day.cloned().unwrap_or_else(DayKey::today);
        let result = self
            .passages
            .iter()
            .find(|p| p.day_key == day)
            .cloned()
            .ok_or_else(|| StoreError::PassageNotFound(day.to_string()));
        async move { result }
    }
}
