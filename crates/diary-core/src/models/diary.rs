//! Diary model

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::mood::Mood;

/// A unique identifier for a diary, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiaryId(Uuid);

impl DiaryId {
    /// Create a new unique diary ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for DiaryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DiaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DiaryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// A mood-tagged diary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diary {
    /// Unique identifier, assigned by the store on insert
    pub id: DiaryId,
    /// Owning user; stamped on insert and never changed afterwards
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub mood: Mood,
    /// Creation or edit instant. Stored without a timezone.
    pub date: DateTime<Utc>,
    /// Remote storage paths of attached images
    pub images: Vec<String>,
}

impl Diary {
    /// Create an unsaved diary dated now.
    ///
    /// `owner_id` stays empty until the entry is inserted.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>, mood: Mood) -> Self {
        Self {
            id: DiaryId::new(),
            owner_id: String::new(),
            title: title.into(),
            description: description.into(),
            mood,
            date: now_millis(),
            images: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    #[must_use]
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Calendar date of this entry in the given timezone
    pub fn local_date<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        self.date.with_timezone(tz).date_naive()
    }
}

/// Current instant truncated to millisecond precision, the precision the store keeps.
fn now_millis() -> DateTime<Utc> {
    let millis = Utc::now().timestamp_millis();
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

/// Diaries grouped by the local calendar date of their timestamp.
///
/// Days iterate newest first; within a day the input order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiaryGroups {
    days: BTreeMap<NaiveDate, Vec<Diary>>,
}

impl DiaryGroups {
    /// Group `diaries` by their calendar date in `tz`.
    pub fn group<Tz: TimeZone>(diaries: impl IntoIterator<Item = Diary>, tz: &Tz) -> Self {
        let mut days: BTreeMap<NaiveDate, Vec<Diary>> = BTreeMap::new();
        for diary in diaries {
            days.entry(diary.local_date(tz)).or_default().push(diary);
        }
        Self { days }
    }

    /// Days and their diaries, newest day first
    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &Vec<Diary>)> {
        self.days.iter().rev()
    }

    pub fn get(&self, date: &NaiveDate) -> Option<&Vec<Diary>> {
        self.days.get(date)
    }

    /// Number of distinct days
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Total number of diaries across all days
    pub fn diary_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }
}
