use serde::Deserialize;

// ── Search response types ───────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JikanSearchResponse {
    #[serde(default)]
    pub data: Vec<JikanManga>,
}

#[derive(Debug, Deserialize)]
pub struct JikanManga {
    pub mal_id: u64,
    pub title: String,
    pub title_english: Option<String>,
    pub images: Option<JikanImages>,
    pub chapters: Option<u32>,
    pub status: Option<String>,
    pub score: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct JikanImages {
    pub jpg: Option<JikanImageSet>,
    pub webp: Option<JikanImageSet>,
}

#[derive(Debug, Deserialize)]
pub struct JikanImageSet {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

impl JikanImageSet {
    /// Largest available size.
    fn best(&self) -> Option<&str> {
        [&self.large_image_url, &self.image_url, &self.small_image_url]
            .into_iter()
            .filter_map(|u| u.as_deref())
            .find(|u| !u.trim().is_empty())
    }
}

/// A catalog hit, reduced to what the tracker uses.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CoverCandidate {
    pub mal_id: u64,
    pub title: String,
    pub title_english: Option<String>,
    pub cover_url: Option<String>,
    pub chapters: Option<u32>,
    pub status: Option<String>,
}

impl JikanManga {
    /// Cover URL, preferring the large JPEG.
    pub fn cover_url(&self) -> Option<&str> {
        let images = self.images.as_ref()?;
        images
            .jpg
            .as_ref()
            .and_then(JikanImageSet::best)
            .or_else(|| images.webp.as_ref().and_then(JikanImageSet::best))
    }

    pub fn into_candidate(self) -> CoverCandidate {
        CoverCandidate {
            cover_url: self.cover_url().map(str::to_string),
            mal_id: self.mal_id,
            title: self.title,
            title_english: self.title_english,
            chapters: self.chapters,
            status: self.status,
        }
    }
}
