//! Local view state: the in-memory mirror of the record store plus the
//! transient UI state that decides what is shown.

use crate::models::{Chapter, MangaPatch, MangaRecord, ReadingStatus};

/// Whether `record` is visible for the given search text and status tab.
///
/// The title must contain `search` case-insensitively and the record's
/// effective status must equal `tab`.
pub fn matches(record: &MangaRecord, search: &str, tab: ReadingStatus) -> bool {
    record.effective_status() == tab
        && record
            .title
            .to_lowercase()
            .contains(&search.to_lowercase())
}

/// Records visible for `search` and `tab`, in their current order.
pub fn filter_records<'a>(
    records: &'a [MangaRecord],
    search: &str,
    tab: ReadingStatus,
) -> Vec<&'a MangaRecord> {
    records
        .iter()
        .filter(|r| matches(r, search, tab))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    records: Vec<MangaRecord>,
    pub search: String,
    pub tab: ReadingStatus,
    pub add_form_open: bool,
    adding: bool,
    pub last_error: Option<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, newest first.
    pub fn records(&self) -> &[MangaRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&MangaRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Records passing the current search and tab.
    pub fn visible(&self) -> Vec<&MangaRecord> {
        filter_records(&self.records, &self.search, self.tab)
    }

    /// Number of records per status tab.
    pub fn counts(&self) -> [(ReadingStatus, usize); 3] {
        [
            ReadingStatus::Reading,
            ReadingStatus::Plan,
            ReadingStatus::Completed,
        ]
        .map(|status| {
            let n = self
                .records
                .iter()
                .filter(|r| r.effective_status() == status)
                .count();
            (status, n)
        })
    }

    /// Replace everything with a fresh listing.
    pub fn replace_all(&mut self, records: Vec<MangaRecord>) {
        self.records = records;
        self.last_error = None;
    }

    pub fn clear_records(&mut self) {
        self.records.clear();
    }

    pub fn prepend(&mut self, record: MangaRecord) {
        self.records.insert(0, record);
    }

    /// Apply a chapter delta; returns the new chapter.
    pub fn apply_chapter_delta(&mut self, id: &str, delta: i64) -> Option<Chapter> {
        let record = self.records.iter_mut().find(|r| r.id == id)?;
        let next = record.current_chapter.offset(delta);
        MangaPatch::chapter(next).apply_to(record);
        Some(next)
    }

    pub fn set_status(&mut self, id: &str, status: ReadingStatus) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                MangaPatch::status(status).apply_to(record);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<MangaRecord> {
        let pos = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(pos))
    }

    pub fn is_adding(&self) -> bool {
        self.adding
    }

    /// Mark an add as in flight. Returns `false` if one already is.
    pub fn begin_add(&mut self) -> bool {
        if self.adding {
            return false;
        }
        self.adding = true;
        true
    }

    pub fn end_add(&mut self) {
        self.adding = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str, status: Option<ReadingStatus>) -> MangaRecord {
        MangaRecord {
            id: id.into(),
            title: title.into(),
            current_chapter: Chapter::new(1),
            slug: crate::slug::slugify(title),
            cover: String::new(),
            status,
            site_url: None,
            created_at: None,
        }
    }

    fn sample() -> Vec<MangaRecord> {
        vec![
            record("1", "Solo Leveling", Some(ReadingStatus::Reading)),
            record("2", "One Piece", Some(ReadingStatus::Plan)),
            record("3", "Vinland Saga", Some(ReadingStatus::Completed)),
            record("4", "One Punch Man", None),
            record("5", "Onepunch Plan", Some(ReadingStatus::Plan)),
        ]
    }

    #[test]
    fn test_filter_by_tab_only() {
        let records = sample();
        let ids: Vec<_> = filter_records(&records, "", ReadingStatus::Plan)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, ["2", "5"]);
    }

    #[test]
    fn test_filter_missing_status_counts_as_reading() {
        let records = sample();
        let ids: Vec<_> = filter_records(&records, "", ReadingStatus::Reading)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, ["1", "4"]);
    }

    #[test]
    fn test_filter_search_is_case_insensitive_and_combined_with_tab() {
        let records = sample();
        let ids: Vec<_> = filter_records(&records, "ONE P", ReadingStatus::Plan)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, ["2"]);

        let ids: Vec<_> = filter_records(&records, "one p", ReadingStatus::Reading)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, ["4"]);
    }

    #[test]
    fn test_chapter_delta_clamps() {
        let mut state = ViewState::new();
        state.replace_all(sample());
        assert_eq!(state.apply_chapter_delta("1", -1), Some(Chapter::new(1)));
        assert_eq!(state.apply_chapter_delta("1", 5), Some(Chapter::new(6)));
        assert_eq!(state.get("1").unwrap().current_chapter.to_string(), "6");
        assert_eq!(state.apply_chapter_delta("missing", 1), None);
    }

    #[test]
    fn test_status_change_moves_record_between_tabs() {
        let mut state = ViewState::new();
        state.replace_all(sample());
        state.tab = ReadingStatus::Completed;
        assert_eq!(state.visible().len(), 1);

        assert!(state.set_status("4", ReadingStatus::Completed));
        assert_eq!(state.visible().len(), 2);
        assert!(!state.set_status("missing", ReadingStatus::Plan));
    }

    #[test]
    fn test_counts() {
        let mut state = ViewState::new();
        state.replace_all(sample());
        assert_eq!(
            state.counts(),
            [
                (ReadingStatus::Reading, 2),
                (ReadingStatus::Plan, 2),
                (ReadingStatus::Completed, 1)
            ]
        );
    }

    #[test]
    fn test_add_flag_blocks_second_add() {
        let mut state = ViewState::new();
        assert!(state.begin_add());
        assert!(!state.begin_add());
        state.end_add();
        assert!(state.begin_add());
    }

    #[test]
    fn test_prepend_and_remove() {
        let mut state = ViewState::new();
        state.replace_all(sample());
        state.prepend(record("9", "Berserk", None));
        assert_eq!(state.records()[0].id, "9");
        assert_eq!(state.remove("9").map(|r| r.title), Some("Berserk".into()));
        assert!(state.remove("9").is_none());
    }
}
