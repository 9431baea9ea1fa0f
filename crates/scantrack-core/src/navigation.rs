//! Where "open" sends the user for a record.

use url::Url;

use crate::config::{LinkStyle, NavigationConfig};
use crate::models::MangaRecord;

const SCAN_MANGA_BASE: &str = "https://www.scan-manga.com/lecture-en-ligne";
const FALLBACK_SEARCH_URL: &str = "https://www.google.com/search";

/// The URL to open for `record`.
///
/// A user-supplied `site_url` wins unchanged. Otherwise a fallback is built
/// from the record's title (or slug) and current chapter.
pub fn reading_url(record: &MangaRecord, nav: &NavigationConfig) -> String {
    if let Some(site) = record.site_url.as_deref().filter(|s| !s.trim().is_empty()) {
        return site.to_string();
    }
    match nav.link_style {
        LinkStyle::Search => search_url(record, nav),
        LinkStyle::ScanManga => format!(
            "{SCAN_MANGA_BASE}/{}-chapitre-{}.html",
            record.slug, record.current_chapter
        ),
    }
}

fn search_url(record: &MangaRecord, nav: &NavigationConfig) -> String {
    let query = format!(
        "{} {} {}",
        record.title.trim(),
        nav.chapter_keyword,
        record.current_chapter
    );
    match Url::parse_with_params(&nav.search_url, &[("q", query.as_str())]) {
        Ok(url) => url.into(),
        Err(e) => {
            // Config validation rejects bad URLs; this only guards hand-built configs.
            tracing::warn!("Invalid search_url {:?}: {e}", nav.search_url);
            let encoded: String = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("q", &query)
                .finish();
            format!("{FALLBACK_SEARCH_URL}?{encoded}")
        }
    }
}
