use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use scantrack_core::models::{Chapter, MangaRecord, NewManga, ReadingStatus, Session};
use scantrack_core::slug::slugify;

// ── PostgREST rows ──────────────────────────────────────────────

/// A row of the manga table as PostgREST returns it.
#[derive(Debug, Deserialize)]
pub struct MangaRow {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub user_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub current_chapter: Chapter,
    pub slug: Option<String>,
    pub cover: Option<String>,
    pub status: Option<String>,
    pub site_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl MangaRow {
    pub fn into_record(self) -> MangaRecord {
        MangaRecord {
            slug: self
                .slug
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| slugify(&self.title)),
            status: self.status.as_deref().and_then(ReadingStatus::from_db_str),
            id: self.id,
            title: self.title,
            current_chapter: self.current_chapter,
            cover: self.cover.unwrap_or_default(),
            site_url: self.site_url.filter(|u| !u.trim().is_empty()),
            created_at: self.created_at,
        }
    }
}

/// Tables keyed by `bigint identity` return numeric ids; uuid tables return text.
fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Insert payload. `id` and `created_at` are filled in by the database.
#[derive(Debug, Serialize)]
pub struct InsertRow<'a> {
    pub user_id: &'a str,
    pub title: &'a str,
    pub current_chapter: Chapter,
    pub slug: &'a str,
    pub cover: &'a str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<&'a str>,
}

impl<'a> InsertRow<'a> {
    pub fn new(user_id: &'a str, record: &'a NewManga) -> Self {
        Self {
            user_id,
            title: &record.title,
            current_chapter: record.current_chapter,
            slug: &record.slug,
            cover: &record.cover,
            status: record.status.as_db_str(),
            site_url: record.site_url.as_deref(),
        }
    }
}

// ── GoTrue auth ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    /// Unix seconds.
    pub expires_at: Option<i64>,
    #[allow(dead_code)]
    pub token_type: Option<String>,
    pub user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

impl TokenResponse {
    /// Build a session. `previous` supplies the user when a refresh
    /// response omits it.
    pub fn into_session(
        self,
        previous: Option<&Session>,
    ) -> Result<Session, super::SupabaseError> {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| {
                self.expires_in
                    .map(|secs| Utc::now() + Duration::seconds(secs))
            });

        let (user_id, email) = match (self.user, previous) {
            (Some(user), _) => (user.id, user.email),
            (None, Some(prev)) => (prev.user_id.clone(), prev.email.clone()),
            (None, None) => {
                return Err(super::SupabaseError::Parse(
                    "token response carried no user".into(),
                ))
            }
        };

        Ok(Session {
            user_id,
            email,
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous.and_then(|p| p.refresh_token.clone())),
            expires_at,
        })
    }
}
