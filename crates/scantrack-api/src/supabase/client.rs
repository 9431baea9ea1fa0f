use reqwest::{Client, Method, RequestBuilder};

use scantrack_core::models::{MangaPatch, MangaRecord, NewManga, Session};

use super::error::SupabaseError;
use super::types::{InsertRow, MangaRow};
use crate::traits::RecordStore;

/// PostgREST client for the hosted manga table.
///
/// Every call is scoped to the session's user, on top of whatever row-level
/// security the project enforces.
pub struct SupabaseStore {
    base_url: String,
    anon_key: String,
    table: String,
    http: Client,
}

impl SupabaseStore {
    pub fn new(base_url: &str, anon_key: &str, table: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            table: table.to_string(),
            http: Client::new(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn request(&self, method: Method, session: &Session) -> Result<RequestBuilder, SupabaseError> {
        if session.access_token.is_empty() {
            return Err(SupabaseError::Auth("not signed in".into()));
        }
        Ok(self
            .http
            .request(method, self.table_url())
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", session.access_token)))
    }

    /// Check the HTTP response for errors and return the body text on failure.
    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, SupabaseError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status, "Supabase REST error");
            Err(SupabaseError::Api {
                status,
                message: body,
            })
        }
    }
}

impl RecordStore for SupabaseStore {
    type Error = SupabaseError;

    async fn list(&self, session: &Session) -> Result<Vec<MangaRecord>, SupabaseError> {
        let owner = format!("eq.{}", session.user_id);
        let resp = self
            .request(Method::GET, session)?
            .query(&[
                ("select", "*"),
                ("user_id", owner.as_str()),
                ("order", "created_at.desc"),
            ])
            .send()
            .await?;

        let resp = Self::check_response(resp).await?;
        let rows: Vec<MangaRow> = resp
            .json()
            .await
            .map_err(|e| SupabaseError::Parse(e.to_string()))?;

        tracing::debug!(count = rows.len(), "Listed manga rows");
        Ok(rows.into_iter().map(MangaRow::into_record).collect())
    }

    async fn insert(
        &self,
        session: &Session,
        record: &NewManga,
    ) -> Result<MangaRecord, SupabaseError> {
        let resp = self
            .request(Method::POST, session)?
            .header("Prefer", "return=representation")
            .json(&InsertRow::new(&session.user_id, record))
            .send()
            .await?;

        let resp = Self::check_response(resp).await?;
        let rows: Vec<MangaRow> = resp
            .json()
            .await
            .map_err(|e| SupabaseError::Parse(e.to_string()))?;

        rows.into_iter()
            .next()
            .map(MangaRow::into_record)
            .ok_or_else(|| SupabaseError::Parse("insert returned no row".into()))
    }

    async fn update(
        &self,
        session: &Session,
        id: &str,
        patch: &MangaPatch,
    ) -> Result<(), SupabaseError> {
        let id_filter = format!("eq.{id}");
        let owner = format!("eq.{}", session.user_id);
        let resp = self
            .request(Method::PATCH, session)?
            .query(&[("id", id_filter.as_str()), ("user_id", owner.as_str())])
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;

        Self::check_response(resp).await?;
        Ok(())
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<(), SupabaseError> {
        let id_filter = format!("eq.{id}");
        let owner = format!("eq.{}", session.user_id);
        let resp = self
            .request(Method::DELETE, session)?
            .query(&[("id", id_filter.as_str()), ("user_id", owner.as_str())])
            .send()
            .await?;

        Self::check_response(resp).await?;
        Ok(())
    }
}
