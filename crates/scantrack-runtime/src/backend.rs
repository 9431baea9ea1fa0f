use scantrack_api::supabase::{SupabaseError, SupabaseStore};
use scantrack_api::traits::RecordStore;
use scantrack_core::config::{AppConfig, BackendKind};
use scantrack_core::error::ScantrackError;
use scantrack_core::models::{MangaPatch, MangaRecord, NewManga, Session};

use crate::db::DbHandle;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Local(#[from] ScantrackError),
    #[error(transparent)]
    Remote(#[from] SupabaseError),
}

/// The record store selected in config.
pub enum Backend {
    Local(DbHandle),
    Supabase(SupabaseStore),
}

impl Backend {
    pub fn from_config(config: &AppConfig, db: DbHandle) -> Self {
        match config.backend.kind {
            BackendKind::Local => Self::Local(db),
            BackendKind::Supabase => Self::Supabase(SupabaseStore::new(
                &config.supabase.url,
                &config.supabase.anon_key,
                &config.supabase.table,
            )),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl RecordStore for Backend {
    type Error = BackendError;

    async fn list(&self, session: &Session) -> Result<Vec<MangaRecord>, BackendError> {
        match self {
            Self::Local(db) => Ok(db.list(session).await?),
            Self::Supabase(store) => Ok(store.list(session).await?),
        }
    }

    async fn insert(
        &self,
        session: &Session,
        record: &NewManga,
    ) -> Result<MangaRecord, BackendError> {
        match self {
            Self::Local(db) => Ok(db.insert(session, record).await?),
            Self::Supabase(store) => Ok(store.insert(session, record).await?),
        }
    }

    async fn update(
        &self,
        session: &Session,
        id: &str,
        patch: &MangaPatch,
    ) -> Result<(), BackendError> {
        match self {
            Self::Local(db) => Ok(db.update(session, id, patch).await?),
            Self::Supabase(store) => Ok(store.update(session, id, patch).await?),
        }
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<(), BackendError> {
        match self {
            Self::Local(db) => Ok(db.delete(session, id).await?),
            Self::Supabase(store) => Ok(store.delete(session, id).await?),
        }
    }
}
