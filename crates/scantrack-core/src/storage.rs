use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ScantrackError;
use crate::models::{Chapter, MangaPatch, MangaRecord, NewManga, ReadingStatus, Session};

const SCHEMA_V1: &str = include_str!("../../../migrations/001_initial.sql");
const SCHEMA_V2: &str = include_str!("../../../migrations/002_add_status_and_site_url.sql");

const MANGA_COLUMNS: &str =
    "id, title, current_chapter, slug, cover, status, site_url, created_at";

/// SQLite-backed storage for the local record store and persisted sessions.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, ScantrackError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, ScantrackError> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    // ── Manga CRUD ──────────────────────────────────────────────

    /// All records, newest first.
    pub fn list_manga(&self) -> Result<Vec<MangaRecord>, ScantrackError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MANGA_COLUMNS} FROM manga ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map([], |row| Ok(row_to_manga(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn get_manga(&self, id: &str) -> Result<Option<MangaRecord>, ScantrackError> {
        self.conn
            .query_row(
                &format!("SELECT {MANGA_COLUMNS} FROM manga WHERE id = ?1"),
                params![id],
                |row| Ok(row_to_manga(row)),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Insert a record, generating a timestamp-based id.
    pub fn insert_manga(&self, new: &NewManga) -> Result<MangaRecord, ScantrackError> {
        self.insert_manga_at(new, Utc::now())
    }

    fn insert_manga_at(
        &self,
        new: &NewManga,
        now: DateTime<Utc>,
    ) -> Result<MangaRecord, ScantrackError> {
        let id = self.next_id(now.timestamp_millis())?;
        let created_at = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn.execute(
            "INSERT INTO manga (id, title, current_chapter, slug, cover, status, site_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                new.title,
                new.current_chapter.get(),
                new.slug,
                new.cover,
                new.status.as_db_str(),
                new.site_url,
                created_at,
            ],
        )?;
        self.get_manga(&id)?
            .ok_or_else(|| ScantrackError::NotFound(format!("inserted manga {id}")))
    }

    /// First unused millisecond id at or after `millis`.
    fn next_id(&self, millis: i64) -> Result<String, ScantrackError> {
        let mut candidate = millis;
        loop {
            let id = candidate.to_string();
            let taken: bool = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM manga WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )?;
            if !taken {
                return Ok(id);
            }
            candidate += 1;
        }
    }

    /// Apply a patch. Errors with `NotFound` if no such record exists.
    pub fn update_manga(&self, id: &str, patch: &MangaPatch) -> Result<(), ScantrackError> {
        if patch.is_empty() {
            return Ok(());
        }
        let changed = self.conn.execute(
            "UPDATE manga SET
                current_chapter = COALESCE(?2, current_chapter),
                status = COALESCE(?3, status)
             WHERE id = ?1",
            params![
                id,
                patch.current_chapter.map(Chapter::get),
                patch.status.map(|s| s.as_db_str()),
            ],
        )?;
        if changed == 0 {
            return Err(ScantrackError::NotFound(format!("manga {id}")));
        }
        Ok(())
    }

    /// Delete a record. Deleting a missing id is not an error.
    pub fn delete_manga(&self, id: &str) -> Result<(), ScantrackError> {
        self.conn
            .execute("DELETE FROM manga WHERE id = ?1", params![id])?;
        Ok(())
    }

    // ── Sessions ────────────────────────────────────────────────

    /// Persist the session for a provider, replacing any previous one.
    pub fn save_session(&self, provider: &str, session: &Session) -> Result<(), ScantrackError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO auth_session
                (provider, user_id, email, access_token, refresh_token, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                provider,
                session.user_id,
                session.email,
                session.access_token,
                session.refresh_token,
                session.expires_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn load_session(&self, provider: &str) -> Result<Option<Session>, ScantrackError> {
        self.conn
            .query_row(
                "SELECT user_id, email, access_token, refresh_token, expires_at
                 FROM auth_session WHERE provider = ?1",
                params![provider],
                |row| {
                    let expires_at: Option<String> = row.get(4)?;
                    Ok(Session {
                        user_id: row.get(0)?,
                        email: row.get(1)?,
                        access_token: row.get(2)?,
                        refresh_token: row.get(3)?,
                        expires_at: expires_at.as_deref().and_then(parse_datetime),
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn clear_session(&self, provider: &str) -> Result<(), ScantrackError> {
        self.conn.execute(
            "DELETE FROM auth_session WHERE provider = ?1",
            params![provider],
        )?;
        Ok(())
    }
}

// ── Migrations ──────────────────────────────────────────────────

/// Run schema migrations using `PRAGMA user_version` for version tracking.
fn run_migrations(conn: &Connection) -> Result<(), ScantrackError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    if version < 2 {
        conn.execute_batch(SCHEMA_V2)?;
        conn.pragma_update(None, "user_version", 2)?;
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn row_to_manga(row: &rusqlite::Row<'_>) -> MangaRecord {
    let chapter: i64 = row.get(2).unwrap_or(1);
    let status: Option<String> = row.get(5).unwrap_or(None);
    let created_at: Option<String> = row.get(7).unwrap_or(None);

    MangaRecord {
        id: row.get(0).unwrap_or_default(),
        title: row.get(1).unwrap_or_default(),
        current_chapter: Chapter::FIRST.offset(chapter - 1),
        slug: row.get(3).unwrap_or_default(),
        cover: row.get(4).unwrap_or_default(),
        status: status.as_deref().and_then(ReadingStatus::from_db_str),
        site_url: row.get(6).unwrap_or(None),
        created_at: created_at.as_deref().and_then(parse_datetime),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MangaDraft;

    fn new_manga(title: &str) -> NewManga {
        MangaDraft::new(title).into_new_manga("https://cdn.example/cover.jpg".into())
    }

    #[test]
    fn test_insert_and_get() {
        let db = Storage::open_memory().unwrap();
        let record = db.insert_manga(&new_manga("Solo Leveling")).unwrap();
        assert!(!record.id.is_empty());
        assert!(record.id.chars().all(|c| c.is_ascii_digit()));
        assert!(record.created_at.is_some());

        let fetched = db.get_manga(&record.id).unwrap().unwrap();
        assert_eq!(fetched, record);
        assert_eq!(fetched.slug, "solo-leveling");
        assert_eq!(fetched.status, Some(ReadingStatus::Reading));
    }

    #[test]
    fn test_ids_unique_within_same_millisecond() {
        let db = Storage::open_memory().unwrap();
        let now = Utc::now();
        let a = db.insert_manga_at(&new_manga("A"), now).unwrap();
        let b = db.insert_manga_at(&new_manga("B"), now).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(
            b.id.parse::<i64>().unwrap(),
            a.id.parse::<i64>().unwrap() + 1
        );
    }

    #[test]
    fn test_list_newest_first() {
        let db = Storage::open_memory().unwrap();
        let now = Utc::now();
        db.insert_manga_at(&new_manga("Old"), now - chrono::Duration::days(1))
            .unwrap();
        db.insert_manga_at(&new_manga("Newer"), now).unwrap();
        db.insert_manga_at(&new_manga("Newest"), now).unwrap();

        let titles: Vec<_> = db
            .list_manga()
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, ["Newest", "Newer", "Old"]);
    }

    #[test]
    fn test_update_and_delete() {
        let db = Storage::open_memory().unwrap();
        let record = db.insert_manga(&new_manga("Vagabond")).unwrap();

        db.update_manga(&record.id, &MangaPatch::chapter(Chapter::new(37)))
            .unwrap();
        db.update_manga(&record.id, &MangaPatch::status(ReadingStatus::Plan))
            .unwrap();
        let fetched = db.get_manga(&record.id).unwrap().unwrap();
        assert_eq!(fetched.current_chapter.get(), 37);
        assert_eq!(fetched.status, Some(ReadingStatus::Plan));

        let err = db
            .update_manga("missing", &MangaPatch::chapter(Chapter::new(2)))
            .unwrap_err();
        assert!(matches!(err, ScantrackError::NotFound(_)));

        db.delete_manga(&record.id).unwrap();
        assert!(db.get_manga(&record.id).unwrap().is_none());
        db.delete_manga(&record.id).unwrap();
    }

    #[test]
    fn test_sessions() {
        let db = Storage::open_memory().unwrap();
        assert!(db.load_session("supabase").unwrap().is_none());

        let session = Session {
            user_id: "8d0c".into(),
            email: Some("reader@example.com".into()),
            access_token: "abc123".into(),
            refresh_token: Some("refresh".into()),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
        };
        db.save_session("supabase", &session).unwrap();
        let loaded = db.load_session("supabase").unwrap().unwrap();
        assert_eq!(loaded.access_token, "abc123");
        assert_eq!(loaded.email.as_deref(), Some("reader@example.com"));
        assert!(loaded.expires_at.is_some());

        db.clear_session("supabase").unwrap();
        assert!(db.load_session("supabase").unwrap().is_none());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scantrack.db");
        {
            let db = Storage::open(&path).unwrap();
            db.insert_manga(&new_manga("Blame!")).unwrap();
        }
        let db = Storage::open(&path).unwrap();
        assert_eq!(db.list_manga().unwrap().len(), 1);
    }
}
