//! Whole-collection JSON snapshots.
//!
//! Before the hosted store existed, the tracker kept its entire list as one
//! camelCase JSON array under a single browser storage key. These helpers
//! read such a snapshot (so old lists can be imported) and write the current
//! collection back out in the same shape.

use serde::{Deserialize, Serialize};

use crate::error::ScantrackError;
use crate::models::{Chapter, MangaRecord, ReadingStatus};
use crate::slug::slugify;

/// Storage key the browser build used for its snapshot.
pub const SNAPSHOT_KEY: &str = "my-mangas-v3";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotEntry {
    #[serde(default)]
    id: String,
    title: String,
    #[serde(default)]
    current_chapter: Chapter,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    cover: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    site_url: Option<String>,
}

/// Parse a snapshot into records.
///
/// Missing slugs are derived from the title, unknown statuses count as
/// unset, and entries with a blank title are skipped.
pub fn parse_snapshot(json: &str, placeholder: &str) -> Result<Vec<MangaRecord>, ScantrackError> {
    let entries: Vec<SnapshotEntry> = serde_json::from_str(json)?;
    let records = entries
        .into_iter()
        .filter(|e| !e.title.trim().is_empty())
        .map(|e| {
            let status = e.status.as_deref().and_then(ReadingStatus::from_db_str);
            MangaRecord {
                slug: if e.slug.is_empty() {
                    slugify(&e.title)
                } else {
                    e.slug
                },
                cover: if e.cover.is_empty() {
                    placeholder.to_string()
                } else {
                    e.cover
                },
                id: e.id,
                title: e.title,
                current_chapter: e.current_chapter,
                status,
                site_url: e.site_url.filter(|u| !u.trim().is_empty()),
                created_at: None,
            }
        })
        .collect();
    Ok(records)
}

/// Sort snapshot records oldest first.
///
/// Browser snapshots used millisecond timestamps as ids, so when every id
/// is numeric they give the creation order. Otherwise the array order is
/// kept, which is already oldest first since new titles were appended.
pub fn sort_oldest_first(records: &mut [MangaRecord]) {
    let all_numeric = records.iter().all(|r| r.id.trim().parse::<u64>().is_ok());
    if all_numeric {
        records.sort_by_key(|r| r.id.trim().parse::<u64>().unwrap_or(0));
    }
}

/// Serialize records as a snapshot.
pub fn to_snapshot(records: &[MangaRecord]) -> Result<String, ScantrackError> {
    let entries: Vec<SnapshotEntry> = records
        .iter()
        .map(|r| SnapshotEntry {
            id: r.id.clone(),
            title: r.title.clone(),
            current_chapter: r.current_chapter,
            slug: r.slug.clone(),
            cover: r.cover.clone(),
            status: r.status.map(|s| s.as_db_str().to_string()),
            site_url: r.site_url.clone(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}
