use reqwest::Client;

use super::error::JikanError;
use super::types::{CoverCandidate, JikanSearchResponse};
use crate::traits::CoverLookup;

const BASE_URL: &str = "https://api.jikan.moe/v4";

/// Jikan (unofficial MyAnimeList) REST client. No authentication.
pub struct JikanClient {
    base_url: String,
    http: Client,
}

impl Default for JikanClient {
    fn default() -> Self {
        Self::new()
    }
}

impl JikanClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Point the client at another deployment (or a mock server).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, JikanError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status, "Jikan API error");
            Err(JikanError::Api {
                status,
                message: body,
            })
        }
    }

    /// Search the manga catalog by title.
    pub async fn search_manga(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<CoverCandidate>, JikanError> {
        let limit = limit.to_string();
        let resp = self
            .http
            .get(format!("{}/manga", self.base_url))
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await?;

        let resp = Self::check_response(resp).await?;
        let search: JikanSearchResponse = resp
            .json()
            .await
            .map_err(|e| JikanError::Parse(e.to_string()))?;

        Ok(search
            .data
            .into_iter()
            .map(|m| m.into_candidate())
            .collect())
    }
}

impl CoverLookup for JikanClient {
    type Error = JikanError;

    async fn find_cover(&self, title: &str) -> Result<Option<String>, JikanError> {
        let hits = self.search_manga(title, 1).await?;
        tracing::debug!(title, hits = hits.len(), "Jikan cover search");
        Ok(hits.into_iter().next().and_then(|c| c.cover_url))
    }
}
