//! In-memory collaborators for tracker and session tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use scantrack_api::traits::{CoverLookup, RecordStore, SessionProvider};
use scantrack_core::models::{MangaPatch, MangaRecord, NewManga, Session};

#[derive(Debug, thiserror::Error)]
#[error("fake failure")]
pub struct FakeError;

/// A record store backed by a `Vec`, with switches for failures and a gate
/// that holds writes until the test releases them.
#[derive(Default)]
pub struct FakeStore {
    pub records: Mutex<Vec<MangaRecord>>,
    /// Every call, in the order the store saw it.
    pub calls: Mutex<Vec<String>>,
    pub fail_list: AtomicBool,
    pub fail_insert: AtomicBool,
    pub fail_writes: AtomicBool,
    pub write_gate: Option<Arc<Semaphore>>,
    next_id: AtomicUsize,
}

impl FakeStore {
    pub fn with_records(records: Vec<MangaRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    /// Writes block until a permit is added to the returned semaphore.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.write_gate = Some(gate.clone());
        (self, gate)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.write_gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

impl RecordStore for FakeStore {
    type Error = FakeError;

    async fn list(&self, _session: &Session) -> Result<Vec<MangaRecord>, FakeError> {
        self.log("list".into());
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(FakeError);
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn insert(
        &self,
        _session: &Session,
        record: &NewManga,
    ) -> Result<MangaRecord, FakeError> {
        self.log(format!("insert {}", record.title));
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(FakeError);
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = MangaRecord {
            id: format!("srv-{n}"),
            title: record.title.clone(),
            current_chapter: record.current_chapter,
            slug: record.slug.clone(),
            cover: record.cover.clone(),
            status: Some(record.status),
            site_url: record.site_url.clone(),
            created_at: None,
        };
        self.records.lock().unwrap().insert(0, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        _session: &Session,
        id: &str,
        patch: &MangaPatch,
    ) -> Result<(), FakeError> {
        self.pass_gate().await;
        let mut call = format!("update {id}");
        if let Some(chapter) = patch.current_chapter {
            call.push_str(&format!(" chapter={chapter}"));
        }
        if let Some(status) = patch.status {
            call.push_str(&format!(" status={}", status.as_db_str()));
        }
        self.log(call);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FakeError);
        }
        if let Some(record) = self.records.lock().unwrap().iter_mut().find(|r| r.id == id) {
            patch.apply_to(record);
        }
        Ok(())
    }

    async fn delete(&self, _session: &Session, id: &str) -> Result<(), FakeError> {
        self.pass_gate().await;
        self.log(format!("delete {id}"));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FakeError);
        }
        self.records.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }
}

/// Cover lookup with a fixed answer, optionally held behind a gate.
pub struct FakeCovers {
    pub answer: Result<Option<String>, ()>,
    pub gate: Option<Arc<Semaphore>>,
    pub lookups: AtomicUsize,
}

impl FakeCovers {
    pub fn found(url: &str) -> Self {
        Self::answering(Ok(Some(url.into())))
    }

    pub fn empty() -> Self {
        Self::answering(Ok(None))
    }

    pub fn failing() -> Self {
        Self::answering(Err(()))
    }

    fn answering(answer: Result<Option<String>, ()>) -> Self {
        Self {
            answer,
            gate: None,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }
}

impl CoverLookup for FakeCovers {
    type Error = FakeError;

    async fn find_cover(&self, _title: &str) -> Result<Option<String>, FakeError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.answer.clone().map_err(|()| FakeError)
    }
}

/// Session provider that signs in instantly.
#[derive(Default)]
pub struct FakeProvider {
    pub fail_refresh: bool,
    pub refreshes: Arc<AtomicUsize>,
    pub sign_outs: Arc<AtomicUsize>,
}

impl SessionProvider for FakeProvider {
    type Error = FakeError;

    fn name(&self) -> &'static str {
        "fake"
    }

    async fn sign_in(&self) -> Result<Session, FakeError> {
        Ok(Session {
            user_id: "user-1".into(),
            email: Some("reader@example.com".into()),
            access_token: "signed-in".into(),
            refresh_token: Some("r1".into()),
            expires_at: None,
        })
    }

    async fn refresh(&self, session: &Session) -> Result<Session, FakeError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh {
            return Err(FakeError);
        }
        Ok(Session {
            access_token: "refreshed".into(),
            expires_at: None,
            ..session.clone()
        })
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), FakeError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
