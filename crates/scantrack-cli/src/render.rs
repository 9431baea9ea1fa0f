use scantrack_core::debug_log::EventEntry;
use scantrack_core::models::{MangaRecord, ReadingStatus};
use scantrack_core::view::ViewState;

const TITLE_WIDTH: usize = 40;

/// Tab bar with per-status counts; the active tab is bracketed.
pub fn tabs(view: &ViewState) -> String {
    view.counts()
        .iter()
        .map(|(status, n)| {
            if *status == view.tab {
                format!("[{status} ({n})]")
            } else {
                format!(" {status} ({n}) ")
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// One numbered line per visible record.
pub fn records(view: &ViewState) -> String {
    let visible = view.visible();
    if visible.is_empty() {
        return if view.search.is_empty() {
            "  (nothing here yet)".into()
        } else {
            format!("  (no titles match \"{}\")", view.search)
        };
    }
    visible
        .iter()
        .enumerate()
        .map(|(i, record)| record_line(i + 1, record))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn record_line(position: usize, record: &MangaRecord) -> String {
    format!(
        "{position:>3}. {:<width$}  ch. {:<6} {}",
        truncate(&record.title, TITLE_WIDTH),
        record.current_chapter.get(),
        record.id,
        width = TITLE_WIDTH,
    )
}

pub fn view(view: &ViewState) -> String {
    let mut out = tabs(view);
    if !view.search.is_empty() {
        out.push_str(&format!("\n  search: {}", view.search));
    }
    out.push('\n');
    out.push_str(&records(view));
    if let Some(error) = &view.last_error {
        out.push_str(&format!("\n! could not refresh: {error}"));
    }
    out
}

pub fn events(entries: &[EventEntry]) -> String {
    if entries.is_empty() {
        return "  (no events)".into();
    }
    entries
        .iter()
        .map(|(at, event)| format!("{}  {event}", at.format("%H:%M:%S")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use scantrack_core::models::Chapter;

    use super::*;

    fn record(id: &str, title: &str, status: Option<ReadingStatus>) -> MangaRecord {
        MangaRecord {
            id: id.into(),
            title: title.into(),
            current_chapter: Chapter::new(12),
            slug: String::new(),
            cover: String::new(),
            status,
            site_url: None,
            created_at: None,
        }
    }

    #[test]
    fn tabs_mark_active_status() {
        let mut view = ViewState::new();
        view.replace_all(vec![
            record("1", "Berserk", Some(ReadingStatus::Completed)),
            record("2", "Vagabond", None),
        ]);
        view.tab = ReadingStatus::Completed;
        let bar = tabs(&view);
        assert!(bar.contains("[Completed (1)]"));
        assert!(bar.contains(" Reading (1) "));
        assert!(bar.contains(" Plan to Read (0) "));
    }

    #[test]
    fn records_are_numbered_from_one() {
        let mut view = ViewState::new();
        view.replace_all(vec![
            record("b", "Blue Lock", None),
            record("a", "Akira", None),
        ]);
        let out = records(&view);
        let lines: Vec<_> = out.lines().collect();
        assert!(lines[0].starts_with("  1. Blue Lock"));
        assert!(lines[1].starts_with("  2. Akira"));
        assert!(lines[1].ends_with(" a"));
    }

    #[test]
    fn empty_search_result_mentions_query() {
        let mut view = ViewState::new();
        view.search = "zzz".into();
        assert!(records(&view).contains("\"zzz\""));
    }

    #[test]
    fn long_titles_are_truncated() {
        let long = "x".repeat(60);
        let line = record_line(1, &record("1", &long, None));
        assert!(line.contains('…'));
        assert!(!line.contains(&long));
    }
}
