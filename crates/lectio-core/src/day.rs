//! Day keys: the grouping identifier for a passage and its annotations.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};

use crate::error::HighlightError;

/// Identifier for one calendar reading day.
///
/// Passages are published per month/day (no year), so keys built from dates
/// use the `MM-DD` form (`11-12`). Keys coming back from a store are accepted
/// as-is as long as they are not blank.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey(SmolStr);

impl DayKey {
    /// Create a day key, rejecting blank input.
    pub fn new(key: impl AsRef<str>) -> Result<Self, HighlightError> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            return Err(HighlightError::BlankDayKey);
        }
        Ok(Self(SmolStr::new(key)))
    }

    /// Build the `MM-DD` key for a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(format_smolstr!("{:02}-{:02}", date.month(), date.day()))
    }

    /// Key for the local calendar date.
    pub fn today() -> Self {
        Self::from_date(chrono::Local::now().date_naive())
    }

    /// Interpret an `MM-DD` key as a date in the given year.
    ///
    /// Returns `None` for keys in any other format.
    pub fn to_date(&self, year: i32) -> Option<NaiveDate> {
        let (month, day) = self.0.split_once('-')?;
        if month.len() != 2 || day.len() != 2 {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
    }

    /// Display form of an `MM-DD` key, e.g. `November 12` or `March 5`.
    ///
    /// Uses a leap year so that `02-29` formats.
    pub fn formatted(&self) -> Option<String> {
        self.to_date(2000)
            .map(|date| date.format("%B %-d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DayKey {
    type Err = HighlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DayKey {
    type Error = HighlightError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DayKey> for String {
    fn from(key: DayKey) -> Self {
        key.0.to_string()
    }
}

impl AsRef<str> for DayKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_date() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 2).unwrap();
        assert_eq!(DayKey::from_date(date).as_str(), "11-02");
    }

    #[test]
    fn test_formatted() {
        let key = DayKey::new("11-12").unwrap();
        assert_eq!(key.formatted().as_deref(), Some("November 12"));

        let leap = DayKey::new("02-29").unwrap();
        assert_eq!(leap.formatted().as_deref(), Some("February 29"));

        let early = DayKey::new("03-05").unwrap();
        assert_eq!(early.formatted().as_deref(), Some("March 5"));
    }

    #[test]
    fn test_non_month_day_keys_are_opaque() {
        let key = DayKey::new("2025-11-13").unwrap();
        assert_eq!(key.to_date(2025), None);
        assert_eq!(key.formatted(), None);
    }

    #[test]
    fn test_blank_rejected() {
        assert!(DayKey::new("").is_err());
        assert!(DayKey::new("   ").is_err());
        assert_eq!(DayKey::new(" 01-05 ").unwrap().as_str(), "01-05");
    }

    #[test]
    fn test_serde_as_plain_string() {
        let key = DayKey::new("03-14").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"03-14\"");
        let back: DayKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<DayKey>("\"\"").is_err());
    }
}
