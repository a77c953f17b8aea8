//! Highlight and reflection records.
//!
//! Records are immutable once the store has assigned an identifier: they are
//! only ever created or deleted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::day::DayKey;
use crate::error::HighlightError;
use crate::normalize::normalize_text;

/// Store-assigned highlight identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighlightId(pub i64);

impl fmt::Display for HighlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HighlightId {
    type Err = HighlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(HighlightId)
            .map_err(|_| HighlightError::InvalidId(s.to_string()))
    }
}

/// Highlight color tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    Green,
    Pink,
    Blue,
}

impl HighlightColor {
    /// All colors in menu order.
    pub const ALL: [HighlightColor; 3] = [Self::Green, Self::Pink, Self::Blue];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Pink => "pink",
            Self::Blue => "blue",
        }
    }

    /// CSS class carried by markers of this color.
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Green => "highlight-green",
            Self::Pink => "highlight-pink",
            Self::Blue => "highlight-blue",
        }
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HighlightColor {
    type Err = HighlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "green" => Ok(Self::Green),
            "pink" => Ok(Self::Pink),
            "blue" => Ok(Self::Blue),
            _ => Err(HighlightError::UnknownColor(s.to_string())),
        }
    }
}

/// A persisted highlight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: HighlightId,
    pub day_key: DayKey,
    #[serde(rename = "color_tag")]
    pub color: HighlightColor,
    /// Normalized selected text.
    pub selected_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A highlight that has not reached the store yet.
///
/// Construction normalizes the text and rejects empty selections, so a
/// `NewHighlight` value is always safe to send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewHighlight {
    day_key: DayKey,
    #[serde(rename = "color_tag")]
    color: HighlightColor,
    selected_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl NewHighlight {
    pub fn new(
        day_key: DayKey,
        color: HighlightColor,
        selected_text: &str,
    ) -> Result<Self, HighlightError> {
        let selected_text = normalize_text(selected_text);
        if selected_text.is_empty() {
            return Err(HighlightError::EmptyText);
        }
        Ok(Self {
            day_key,
            color,
            selected_text,
            note: None,
        })
    }

    /// Attach a free-text note. Blank notes are dropped.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.note = (!note.trim().is_empty()).then_some(note);
        self
    }

    pub fn day_key(&self) -> &DayKey {
        &self.day_key
    }

    pub fn color(&self) -> HighlightColor {
        self.color
    }

    pub fn selected_text(&self) -> &str {
        &self.selected_text
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Turn into a persisted record with the store-assigned id.
    pub fn into_highlight(self, id: HighlightId) -> Highlight {
        Highlight {
            id,
            day_key: self.day_key,
            color: self.color,
            selected_text: self.selected_text,
            note: self.note,
        }
    }
}

/// A day's highlights grouped by color, creation order kept in each group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorGroups<'a> {
    pub green: Vec<&'a Highlight>,
    pub pink: Vec<&'a Highlight>,
    pub blue: Vec<&'a Highlight>,
}

impl<'a> ColorGroups<'a> {
    pub fn new(highlights: &'a [Highlight]) -> Self {
        let mut groups = Self::default();
        for highlight in highlights {
            match highlight.color {
                HighlightColor::Green => groups.green.push(highlight),
                HighlightColor::Pink => groups.pink.push(highlight),
                HighlightColor::Blue => groups.blue.push(highlight),
            }
        }
        groups
    }

    pub fn get(&self, color: HighlightColor) -> &[&'a Highlight] {
        match color {
            HighlightColor::Green => &self.green,
            HighlightColor::Pink => &self.pink,
            HighlightColor::Blue => &self.blue,
        }
    }

    /// Non-empty groups in menu order.
    pub fn iter(&self) -> impl Iterator<Item = (HighlightColor, &[&'a Highlight])> {
        HighlightColor::ALL
            .into_iter()
            .map(move |color| (color, self.get(color)))
            .filter(|(_, group)| !group.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.green.is_empty() && self.pink.is_empty() && self.blue.is_empty()
    }
}

/// Store-assigned reflection identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReflectionId(pub i64);

impl fmt::Display for ReflectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A free-text reflection on a whole day's reading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: ReflectionId,
    #[serde(rename = "reading_id")]
    pub day_key: DayKey,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A reflection that has not reached the store yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewReflection {
    #[serde(rename = "reading_id")]
    day_key: DayKey,
    content: String,
}

impl NewReflection {
    /// Reflections keep their formatting; only blank content is rejected.
    pub fn new(day_key: DayKey, content: impl Into<String>) -> Result<Self, HighlightError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(HighlightError::BlankReflection);
        }
        Ok(Self { day_key, content })
    }

    pub fn day_key(&self) -> &DayKey {
        &self.day_key
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_reflection(self, id: ReflectionId, created_at: DateTime<Utc>) -> Reflection {
        Reflection {
            id,
            day_key: self.day_key,
            content: self.content,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> DayKey {
        DayKey::new("11-12").unwrap()
    }

    #[test]
    fn test_new_highlight_normalizes() {
        let new = NewHighlight::new(day(), HighlightColor::Pink, "  the\n\u{a0}Word ").unwrap();
        assert_eq!(new.selected_text(), "the Word");
    }

    #[test]
    fn test_new_highlight_rejects_empty() {
        assert_eq!(
            NewHighlight::new(day(), HighlightColor::Green, " \n\t"),
            Err(HighlightError::EmptyText)
        );
    }

    #[test]
    fn test_blank_note_dropped() {
        let new = NewHighlight::new(day(), HighlightColor::Blue, "light")
            .unwrap()
            .with_note("   ");
        assert_eq!(new.note(), None);

        let new = new.with_note("shines in the darkness");
        assert_eq!(new.note(), Some("shines in the darkness"));
    }

    #[test]
    fn test_color_parse() {
        assert_eq!("green".parse(), Ok(HighlightColor::Green));
        assert_eq!(" Pink ".parse(), Ok(HighlightColor::Pink));
        assert_eq!("BLUE".parse(), Ok(HighlightColor::Blue));
        assert!("yellow".parse::<HighlightColor>().is_err());
    }

    #[test]
    fn test_highlight_id_parse() {
        assert_eq!("42".parse(), Ok(HighlightId(42)));
        assert!("abc".parse::<HighlightId>().is_err());
    }

    #[test]
    fn test_highlight_json_shape() {
        let highlight = NewHighlight::new(day(), HighlightColor::Green, "grace")
            .unwrap()
            .into_highlight(HighlightId(7));
        let json = serde_json::to_value(&highlight).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "day_key": "11-12",
                "color_tag": "green",
                "selected_text": "grace",
            })
        );
    }

    #[test]
    fn test_color_groups_keep_order() {
        let highlights: Vec<Highlight> = [
            (1, HighlightColor::Pink, "a"),
            (2, HighlightColor::Green, "b"),
            (3, HighlightColor::Pink, "c"),
        ]
        .into_iter()
        .map(|(id, color, text)| {
            NewHighlight::new(day(), color, text)
                .unwrap()
                .into_highlight(HighlightId(id))
        })
        .collect();

        let groups = ColorGroups::new(&highlights);
        let pink: Vec<_> = groups.pink.iter().map(|h| h.id.0).collect();
        assert_eq!(pink, vec![1, 3]);
        assert!(groups.blue.is_empty());

        let order: Vec<_> = groups.iter().map(|(color, _)| color).collect();
        assert_eq!(order, vec![HighlightColor::Green, HighlightColor::Pink]);
    }

    #[test]
    fn test_blank_reflection_rejected() {
        assert_eq!(
            NewReflection::new(day(), "\n  "),
            Err(HighlightError::BlankReflection)
        );
        let reflection = NewReflection::new(day(), "  keeps\nformatting ").unwrap();
        assert_eq!(reflection.content(), "  keeps\nformatting ");
    }
}
