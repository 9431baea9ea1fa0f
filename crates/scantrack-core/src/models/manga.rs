use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScantrackError;
use crate::slug::slugify;

/// A chapter number. Always at least 1.
///
/// Travels as text on the wire (`"120"`), which is how every revision of the
/// tracker has stored it. Reading is lenient: numbers are accepted as well,
/// and anything below 1 or unparseable becomes 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Chapter(u32);

impl Chapter {
    pub const FIRST: Chapter = Chapter(1);

    pub fn new(n: u32) -> Self {
        Self(n.max(1))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Move by `delta` chapters, clamping at 1.
    pub fn offset(self, delta: i64) -> Self {
        let next = i64::from(self.0)
            .saturating_add(delta)
            .clamp(1, i64::from(u32::MAX));
        Self(next as u32)
    }

    /// Parse the leading integer of `s` (`"12abc"` is 12), defaulting to 1.
    pub fn parse_lenient(s: &str) -> Self {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        if negative || end == 0 {
            return Self::FIRST;
        }
        digits[..end]
            .parse::<u32>()
            .map(Self::new)
            .unwrap_or(Self(u32::MAX))
    }
}

impl Default for Chapter {
    fn default() -> Self {
        Self::FIRST
    }
}

impl std::fmt::Display for Chapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Chapter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Chapter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Chapter::parse_lenient(&s),
            Raw::Number(n) => Chapter::FIRST.offset(n.saturating_sub(1)),
        })
    }
}

/// Reading status of a title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    #[default]
    Reading,
    Plan,
    Completed,
}

impl ReadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reading => "Reading",
            Self::Plan => "Plan to Read",
            Self::Completed => "Completed",
        }
    }

    /// Storage and wire representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Reading => "reading",
            Self::Plan => "plan",
            Self::Completed => "completed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "reading" => Some(Self::Reading),
            "plan" => Some(Self::Plan),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingStatus {
    type Err = ScantrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "plan-to-read" | "plan_to_read" | "planned" => Ok(Self::Plan),
            "done" => Ok(Self::Completed),
            other => Self::from_db_str(other).ok_or_else(|| {
                ScantrackError::Validation(format!(
                    "unknown status '{s}' (expected reading, plan or completed)"
                ))
            }),
        }
    }
}

/// A tracked manga or webtoon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MangaRecord {
    pub id: String,
    pub title: String,
    pub current_chapter: Chapter,
    pub slug: String,
    pub cover: String,
    /// `None` for records written before statuses existed.
    #[serde(default)]
    pub status: Option<ReadingStatus>,
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl MangaRecord {
    /// Stored status, or `Reading` when unset.
    pub fn effective_status(&self) -> ReadingStatus {
        self.status.unwrap_or_default()
    }
}

/// A record as submitted to a store, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewManga {
    pub title: String,
    pub current_chapter: Chapter,
    pub slug: String,
    pub cover: String,
    pub status: ReadingStatus,
    pub site_url: Option<String>,
}

impl NewManga {
    /// Carry an existing record over to another store, dropping its id.
    pub fn from_record(record: &MangaRecord) -> Self {
        Self {
            title: record.title.clone(),
            current_chapter: record.current_chapter,
            slug: record.slug.clone(),
            cover: record.cover.clone(),
            status: record.effective_status(),
            site_url: record.site_url.clone(),
        }
    }
}

/// User input for a new title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MangaDraft {
    pub title: String,
    pub chapter: Option<u32>,
    pub site_url: Option<String>,
}

impl MangaDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_chapter(mut self, chapter: u32) -> Self {
        self.chapter = Some(chapter);
        self
    }

    pub fn with_site_url(mut self, url: impl Into<String>) -> Self {
        self.site_url = Some(url.into());
        self
    }

    /// Reject blank titles.
    pub fn validate(&self) -> Result<(), ScantrackError> {
        if self.title.trim().is_empty() {
            return Err(ScantrackError::Validation("title must not be empty".into()));
        }
        Ok(())
    }

    pub fn slug(&self) -> String {
        slugify(&self.title)
    }

    /// Build the store payload once the cover has been resolved.
    pub fn into_new_manga(self, cover: String) -> NewManga {
        let slug = self.slug();
        let site_url = self
            .site_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        NewManga {
            current_chapter: self.chapter.map(Chapter::new).unwrap_or_default(),
            title: self.title,
            slug,
            cover,
            status: ReadingStatus::default(),
            site_url,
        }
    }
}

/// Fields a record may change after creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MangaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_chapter: Option<Chapter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReadingStatus>,
}

impl MangaPatch {
    pub fn chapter(chapter: Chapter) -> Self {
        Self {
            current_chapter: Some(chapter),
            status: None,
        }
    }

    pub fn status(status: ReadingStatus) -> Self {
        Self {
            current_chapter: None,
            status: Some(status),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current_chapter.is_none() && self.status.is_none()
    }

    pub fn apply_to(&self, record: &mut MangaRecord) {
        if let Some(chapter) = self.current_chapter {
            record.current_chapter = chapter;
        }
        if let Some(status) = self.status {
            record.status = Some(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_offset_clamps_at_one() {
        assert_eq!(Chapter::new(1).offset(-1), Chapter::new(1));
        assert_eq!(Chapter::new(5).offset(1).get(), 6);
        assert_eq!(Chapter::new(3).offset(-100).get(), 1);
        assert_eq!(Chapter::new(0).get(), 1);
        assert_eq!(Chapter::new(u32::MAX).offset(10).get(), u32::MAX);
    }

    #[test]
    fn test_chapter_offset_saturates_on_extreme_deltas() {
        assert_eq!(Chapter::new(5).offset(i64::MAX).get(), u32::MAX);
        assert_eq!(Chapter::new(5).offset(i64::MIN).get(), 1);
        assert_eq!(Chapter::new(u32::MAX).offset(i64::MAX).get(), u32::MAX);
    }

    #[test]
    fn test_chapter_parse_lenient() {
        assert_eq!(Chapter::parse_lenient("120").get(), 120);
        assert_eq!(Chapter::parse_lenient(" 12abc").get(), 12);
        assert_eq!(Chapter::parse_lenient("abc").get(), 1);
        assert_eq!(Chapter::parse_lenient("").get(), 1);
        assert_eq!(Chapter::parse_lenient("-4").get(), 1);
        assert_eq!(Chapter::parse_lenient("0").get(), 1);
    }

    #[test]
    fn test_chapter_serializes_as_text() {
        let json = serde_json::to_string(&Chapter::new(42)).unwrap();
        assert_eq!(json, "\"42\"");

        let from_text: Chapter = serde_json::from_str("\"7\"").unwrap();
        let from_number: Chapter = serde_json::from_str("7").unwrap();
        let from_junk: Chapter = serde_json::from_str("\"NaN\"").unwrap();
        assert_eq!(from_text.get(), 7);
        assert_eq!(from_number.get(), 7);
        assert_eq!(from_junk.get(), 1);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("plan".parse::<ReadingStatus>().unwrap(), ReadingStatus::Plan);
        assert_eq!(
            "Completed".parse::<ReadingStatus>().unwrap(),
            ReadingStatus::Completed
        );
        assert!("dropped".parse::<ReadingStatus>().is_err());
        assert_eq!(ReadingStatus::default(), ReadingStatus::Reading);
    }

    #[test]
    fn test_legacy_record_has_reading_status() {
        let json = r#"{"id":"1","title":"Berserk","current_chapter":"364",
                       "slug":"berserk","cover":"https://x/y.jpg"}"#;
        let record: MangaRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, None);
        assert_eq!(record.effective_status(), ReadingStatus::Reading);
    }

    #[test]
    fn test_draft_defaults() {
        let new = MangaDraft::new("One Piece").into_new_manga("cover".into());
        assert_eq!(new.current_chapter.to_string(), "1");
        assert_eq!(new.status, ReadingStatus::Reading);
        assert_eq!(new.slug, "one-piece");
        assert_eq!(new.site_url, None);
    }

    #[test]
    fn test_draft_blank_site_url_is_dropped() {
        let new = MangaDraft::new("Vagabond")
            .with_chapter(12)
            .with_site_url("  ")
            .into_new_manga("cover".into());
        assert_eq!(new.current_chapter.get(), 12);
        assert_eq!(new.site_url, None);
    }

    #[test]
    fn test_draft_rejects_blank_title() {
        assert!(MangaDraft::new("   ").validate().is_err());
        assert!(MangaDraft::new("Blame!").validate().is_ok());
    }

    #[test]
    fn test_patch_serialization_skips_unset_fields() {
        let patch = MangaPatch::status(ReadingStatus::Plan);
        let json = serde_json::to_value(patch).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "plan" }));
    }
}
