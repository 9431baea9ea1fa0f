use std::sync::Arc;

use tokio::sync::RwLock;

use scantrack_api::traits::{CoverLookup, RecordStore};
use scantrack_core::config::{AppConfig, NavigationConfig};
use scantrack_core::debug_log::{self, SharedEventLog, StoreOp, SyncEvent};
use scantrack_core::legacy;
use scantrack_core::models::{
    Chapter, MangaDraft, MangaPatch, MangaRecord, NewManga, ReadingStatus, Session, SessionEvent,
};
use scantrack_core::navigation;
use scantrack_core::view::ViewState;

use crate::writer::{WriteOp, WriteQueue, WriteTicket};

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("not signed in")]
    NoSession,
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("an add is already in progress")]
    AddInFlight,
    #[error("no record with id {0}")]
    NotFound(String),
    #[error("record store error: {0}")]
    Store(String),
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// Result of a delete request.
#[derive(Debug)]
pub enum DeleteOutcome {
    /// The confirmation was declined; nothing changed.
    Cancelled,
    /// Removed from the view; the store delete is queued.
    Removed(WriteTicket),
}

/// The synchronization controller.
///
/// Owns the view state and keeps it in step with a [`RecordStore`]. Lists
/// and adds wait for the store; chapter, status and delete changes are
/// applied to the view first and then queued on the [`WriteQueue`], never
/// rolled back. Cloning is cheap and every clone shares the same state.
pub struct Tracker<S, C> {
    store: Arc<S>,
    covers: Arc<C>,
    placeholder: String,
    navigation: NavigationConfig,
    state: Arc<RwLock<ViewState>>,
    session: Arc<RwLock<Option<Session>>>,
    writes: WriteQueue,
    events: SharedEventLog,
}

impl<S, C> Clone for Tracker<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            covers: self.covers.clone(),
            placeholder: self.placeholder.clone(),
            navigation: self.navigation.clone(),
            state: self.state.clone(),
            session: self.session.clone(),
            writes: self.writes.clone(),
            events: self.events.clone(),
        }
    }
}

impl<S, C> Tracker<S, C>
where
    S: RecordStore + 'static,
    C: CoverLookup,
{
    /// Build a tracker. Must be called inside a tokio runtime.
    pub fn new(store: S, covers: C, config: &AppConfig) -> Self {
        let store = Arc::new(store);
        let events = debug_log::shared_event_log();
        let writes = WriteQueue::spawn(store.clone(), events.clone());
        Self {
            store,
            covers: Arc::new(covers),
            placeholder: config.covers.placeholder.clone(),
            navigation: config.navigation.clone(),
            state: Arc::new(RwLock::new(ViewState::new())),
            session: Arc::new(RwLock::new(None)),
            writes,
            events,
        }
    }

    pub fn events(&self) -> SharedEventLog {
        self.events.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    async fn require_session(&self) -> Result<Session, TrackerError> {
        self.session().await.ok_or(TrackerError::NoSession)
    }

    // ── Session ─────────────────────────────────────────────────

    /// React to a session change: list on sign-in, clear on sign-out.
    pub async fn on_session_event(&self, event: SessionEvent) -> Result<(), TrackerError> {
        match event {
            SessionEvent::SignedIn(session) => {
                debug_log::record(
                    &self.events,
                    SyncEvent::SessionStarted {
                        user: session.display_name().to_string(),
                    },
                );
                *self.session.write().await = Some(session);
                self.refresh().await.map(|_| ())
            }
            SessionEvent::SignedOut => {
                *self.session.write().await = None;
                let mut state = self.state.write().await;
                state.clear_records();
                state.add_form_open = false;
                debug_log::record(&self.events, SyncEvent::SessionEnded);
                Ok(())
            }
        }
    }

    // ── List ────────────────────────────────────────────────────

    /// Replace the view with the store's listing. On failure the previous
    /// records stay and the error is kept in `last_error`.
    pub async fn refresh(&self) -> Result<usize, TrackerError> {
        let session = self.require_session().await?;

        match self.store.list(&session).await {
            Ok(records) => {
                let count = records.len();
                self.state.write().await.replace_all(records);
                tracing::debug!(count, "Listed records");
                debug_log::record(&self.events, SyncEvent::Listed { count });
                Ok(count)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("List failed: {message}");
                debug_log::record(
                    &self.events,
                    SyncEvent::StoreFailed {
                        op: StoreOp::List,
                        record_id: None,
                        message: message.clone(),
                    },
                );
                self.state.write().await.last_error = Some(message.clone());
                Err(TrackerError::Store(message))
            }
        }
    }

    // ── Add ─────────────────────────────────────────────────────

    /// Look up a cover, insert, and prepend the stored record.
    ///
    /// Only one add runs at a time; a second call while one is in flight
    /// gets [`TrackerError::AddInFlight`].
    pub async fn add(&self, draft: MangaDraft) -> Result<MangaRecord, TrackerError> {
        draft.validate().map_err(|_| TrackerError::EmptyTitle)?;
        let session = self.require_session().await?;

        if !self.state.write().await.begin_add() {
            return Err(TrackerError::AddInFlight);
        }
        let result = self.insert_draft(&session, draft).await;

        let mut state = self.state.write().await;
        state.end_add();
        if let Ok(record) = &result {
            state.prepend(record.clone());
            state.add_form_open = false;
        }
        result
    }

    async fn insert_draft(
        &self,
        session: &Session,
        draft: MangaDraft,
    ) -> Result<MangaRecord, TrackerError> {
        let cover = self.resolve_cover(&draft.title).await;
        let new = draft.into_new_manga(cover);
        self.insert_new(session, &new).await
    }

    async fn insert_new(
        &self,
        session: &Session,
        new: &NewManga,
    ) -> Result<MangaRecord, TrackerError> {
        self.store.insert(session, new).await.map_err(|e| {
            let message = e.to_string();
            tracing::warn!(title = %new.title, "Insert failed: {message}");
            debug_log::record(
                &self.events,
                SyncEvent::StoreFailed {
                    op: StoreOp::Insert,
                    record_id: None,
                    message: message.clone(),
                },
            );
            TrackerError::Store(message)
        })
    }

    /// The catalog cover for `title`, or the placeholder.
    async fn resolve_cover(&self, title: &str) -> String {
        match self.covers.find_cover(title).await {
            Ok(Some(url)) => {
                debug_log::record(
                    &self.events,
                    SyncEvent::CoverResolved {
                        title: title.to_string(),
                        found: true,
                    },
                );
                url
            }
            Ok(None) => {
                debug_log::record(
                    &self.events,
                    SyncEvent::CoverResolved {
                        title: title.to_string(),
                        found: false,
                    },
                );
                self.placeholder.clone()
            }
            Err(e) => {
                tracing::warn!(title, "Cover lookup failed: {e}");
                debug_log::record(
                    &self.events,
                    SyncEvent::CoverLookupFailed {
                        title: title.to_string(),
                        message: e.to_string(),
                    },
                );
                self.placeholder.clone()
            }
        }
    }

    // ── Optimistic writes ───────────────────────────────────────

    /// Move a record's chapter by `delta` (never below 1).
    pub async fn adjust_chapter(
        &self,
        id: &str,
        delta: i64,
    ) -> Result<(Chapter, WriteTicket), TrackerError> {
        let session = self.require_session().await?;
        let chapter = self
            .state
            .write()
            .await
            .apply_chapter_delta(id, delta)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

        let ticket = self.writes.submit(
            session,
            WriteOp::Update {
                id: id.to_string(),
                patch: MangaPatch::chapter(chapter),
            },
        );
        Ok((chapter, ticket))
    }

    pub async fn set_status(
        &self,
        id: &str,
        status: ReadingStatus,
    ) -> Result<WriteTicket, TrackerError> {
        let session = self.require_session().await?;
        if !self.state.write().await.set_status(id, status) {
            return Err(TrackerError::NotFound(id.to_string()));
        }

        Ok(self.writes.submit(
            session,
            WriteOp::Update {
                id: id.to_string(),
                patch: MangaPatch::status(status),
            },
        ))
    }

    /// Delete after `confirm` approves the record.
    pub async fn delete<F>(&self, id: &str, confirm: F) -> Result<DeleteOutcome, TrackerError>
    where
        F: FnOnce(&MangaRecord) -> bool,
    {
        let session = self.require_session().await?;
        let record = self
            .state
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

        if !confirm(&record) {
            return Ok(DeleteOutcome::Cancelled);
        }

        self.state
            .write()
            .await
            .remove(id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

        Ok(DeleteOutcome::Removed(self.writes.submit(
            session,
            WriteOp::Delete { id: id.to_string() },
        )))
    }

    /// Wait for every queued write to reach the store.
    pub async fn flush(&self) {
        self.writes.flush().await;
    }

    // ── View ────────────────────────────────────────────────────

    pub async fn records(&self) -> Vec<MangaRecord> {
        self.state.read().await.records().to_vec()
    }

    pub async fn get(&self, id: &str) -> Option<MangaRecord> {
        self.state.read().await.get(id).cloned()
    }

    /// Records passing the current search and tab.
    pub async fn visible(&self) -> Vec<MangaRecord> {
        self.state
            .read()
            .await
            .visible()
            .into_iter()
            .cloned()
            .collect()
    }

    /// A copy of the whole view state.
    pub async fn view(&self) -> ViewState {
        self.state.read().await.clone()
    }

    pub async fn set_search(&self, search: impl Into<String>) {
        self.state.write().await.search = search.into();
    }

    pub async fn set_tab(&self, tab: ReadingStatus) {
        self.state.write().await.tab = tab;
    }

    pub async fn open_add_form(&self) {
        self.state.write().await.add_form_open = true;
    }

    pub async fn close_add_form(&self) {
        self.state.write().await.add_form_open = false;
    }

    pub async fn is_adding(&self) -> bool {
        self.state.read().await.is_adding()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    /// Where "open" should send the user for this record.
    pub async fn link_for(&self, id: &str) -> Result<String, TrackerError> {
        let state = self.state.read().await;
        let record = state
            .get(id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        Ok(navigation::reading_url(record, &self.navigation))
    }

    // ── Snapshots ───────────────────────────────────────────────

    /// Insert every record of a legacy snapshot, then re-list.
    ///
    /// Returns how many records were inserted. Individual insert failures
    /// are logged and skipped.
    pub async fn import_snapshot(&self, json: &str) -> Result<usize, TrackerError> {
        let session = self.require_session().await?;
        let mut records = legacy::parse_snapshot(json, &self.placeholder)
            .map_err(|e| TrackerError::Snapshot(e.to_string()))?;
        // Newest insert lists first, so the oldest title goes in first.
        legacy::sort_oldest_first(&mut records);

        let mut imported = 0;
        for record in &records {
            if self
                .insert_new(&session, &NewManga::from_record(record))
                .await
                .is_ok()
            {
                imported += 1;
            }
        }
        tracing::info!(imported, total = records.len(), "Imported snapshot");

        self.refresh().await?;
        Ok(imported)
    }

    /// The current collection as a legacy snapshot.
    pub async fn export_snapshot(&self) -> Result<String, TrackerError> {
        let state = self.state.read().await;
        legacy::to_snapshot(state.records()).map_err(|e| TrackerError::Snapshot(e.to_string()))
    }
}
