//! Trait definitions for the services the tracker talks to.
//!
//! The synchronization layer only sees these traits, so the hosted backend,
//! the local store and test fakes are interchangeable.

use std::future::Future;

use scantrack_core::models::{MangaPatch, MangaRecord, NewManga, Session};

/// Finds a cover image for a free-text title.
pub trait CoverLookup: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The best cover URL for `title`, or `None` if the catalog has no match.
    fn find_cover(
        &self,
        title: &str,
    ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;
}

/// A keyed collection of manga records, scoped by session.
pub trait RecordStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// All records visible to the session, newest first.
    fn list(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<Vec<MangaRecord>, Self::Error>> + Send;

    /// Insert a record. The store assigns the id.
    fn insert(
        &self,
        session: &Session,
        record: &NewManga,
    ) -> impl Future<Output = Result<MangaRecord, Self::Error>> + Send;

    fn update(
        &self,
        session: &Session,
        id: &str,
        patch: &MangaPatch,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn delete(
        &self,
        session: &Session,
        id: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Issues sessions through an interactive login.
pub trait SessionProvider: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Key under which this provider's session is persisted.
    fn name(&self) -> &'static str;

    /// Run the interactive login flow.
    fn sign_in(&self) -> impl Future<Output = Result<Session, Self::Error>> + Send;

    /// Exchange the session's refresh token for a fresh session.
    fn refresh(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<Session, Self::Error>> + Send;

    /// Revoke the session remotely.
    fn sign_out(&self, session: &Session) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
