use std::path::Path;

use tokio::sync::{mpsc, oneshot};

use scantrack_api::traits::RecordStore;
use scantrack_core::error::ScantrackError;
use scantrack_core::models::{MangaPatch, MangaRecord, NewManga, Session};
use scantrack_core::storage::Storage;

/// Handle to the SQLite storage thread.
///
/// `Storage` owns a `rusqlite::Connection`, which is not `Sync`, so every
/// call is sent as a command to a dedicated thread and answered over a
/// oneshot channel.
#[derive(Clone)]
pub struct DbHandle {
    tx: mpsc::UnboundedSender<DbCommand>,
}

enum DbCommand {
    ListManga {
        reply: oneshot::Sender<Result<Vec<MangaRecord>, ScantrackError>>,
    },
    InsertManga {
        new: NewManga,
        reply: oneshot::Sender<Result<MangaRecord, ScantrackError>>,
    },
    UpdateManga {
        id: String,
        patch: MangaPatch,
        reply: oneshot::Sender<Result<(), ScantrackError>>,
    },
    DeleteManga {
        id: String,
        reply: oneshot::Sender<Result<(), ScantrackError>>,
    },
    SaveSession {
        provider: String,
        session: Box<Session>,
        reply: oneshot::Sender<Result<(), ScantrackError>>,
    },
    LoadSession {
        provider: String,
        reply: oneshot::Sender<Result<Option<Session>, ScantrackError>>,
    },
    ClearSession {
        provider: String,
        reply: oneshot::Sender<Result<(), ScantrackError>>,
    },
}

impl DbHandle {
    pub fn open(path: &Path) -> Result<Self, ScantrackError> {
        Self::spawn(Storage::open(path)?)
    }

    /// In-memory database (for tests).
    pub fn open_memory() -> Result<Self, ScantrackError> {
        Self::spawn(Storage::open_memory()?)
    }

    fn spawn(storage: Storage) -> Result<Self, ScantrackError> {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("db-actor".into())
            .spawn(move || actor_loop(storage, rx))?;

        Ok(Self { tx })
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, ScantrackError>>) -> DbCommand,
    ) -> Result<T, ScantrackError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(make(reply));
        rx.await
            .unwrap_or_else(|_| Err(ScantrackError::Config("DB actor closed".into())))
    }

    pub async fn list_manga(&self) -> Result<Vec<MangaRecord>, ScantrackError> {
        self.call(|reply| DbCommand::ListManga { reply }).await
    }

    pub async fn insert_manga(&self, new: NewManga) -> Result<MangaRecord, ScantrackError> {
        self.call(|reply| DbCommand::InsertManga { new, reply })
            .await
    }

    pub async fn update_manga(
        &self,
        id: impl Into<String>,
        patch: MangaPatch,
    ) -> Result<(), ScantrackError> {
        let id = id.into();
        self.call(|reply| DbCommand::UpdateManga { id, patch, reply })
            .await
    }

    pub async fn delete_manga(&self, id: impl Into<String>) -> Result<(), ScantrackError> {
        let id = id.into();
        self.call(|reply| DbCommand::DeleteManga { id, reply })
            .await
    }

    pub async fn save_session(
        &self,
        provider: impl Into<String>,
        session: Session,
    ) -> Result<(), ScantrackError> {
        let provider = provider.into();
        self.call(|reply| DbCommand::SaveSession {
            provider,
            session: Box::new(session),
            reply,
        })
        .await
    }

    pub async fn load_session(
        &self,
        provider: impl Into<String>,
    ) -> Result<Option<Session>, ScantrackError> {
        let provider = provider.into();
        self.call(|reply| DbCommand::LoadSession { provider, reply })
            .await
    }

    pub async fn clear_session(&self, provider: impl Into<String>) -> Result<(), ScantrackError> {
        let provider = provider.into();
        self.call(|reply| DbCommand::ClearSession { provider, reply })
            .await
    }
}

/// The local store has no accounts; the session is accepted and ignored.
impl RecordStore for DbHandle {
    type Error = ScantrackError;

    async fn list(&self, _session: &Session) -> Result<Vec<MangaRecord>, ScantrackError> {
        self.list_manga().await
    }

    async fn insert(
        &self,
        _session: &Session,
        record: &NewManga,
    ) -> Result<MangaRecord, ScantrackError> {
        self.insert_manga(record.clone()).await
    }

    async fn update(
        &self,
        _session: &Session,
        id: &str,
        patch: &MangaPatch,
    ) -> Result<(), ScantrackError> {
        self.update_manga(id, *patch).await
    }

    async fn delete(&self, _session: &Session, id: &str) -> Result<(), ScantrackError> {
        self.delete_manga(id).await
    }
}

fn actor_loop(storage: Storage, mut rx: mpsc::UnboundedReceiver<DbCommand>) {
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            DbCommand::ListManga { reply } => {
                let _ = reply.send(storage.list_manga());
            }
            DbCommand::InsertManga { new, reply } => {
                let _ = reply.send(storage.insert_manga(&new));
            }
            DbCommand::UpdateManga { id, patch, reply } => {
                let _ = reply.send(storage.update_manga(&id, &patch));
            }
            DbCommand::DeleteManga { id, reply } => {
                let _ = reply.send(storage.delete_manga(&id));
            }
            DbCommand::SaveSession {
                provider,
                session,
                reply,
            } => {
                let _ = reply.send(storage.save_session(&provider, &session));
            }
            DbCommand::LoadSession { provider, reply } => {
                let _ = reply.send(storage.load_session(&provider));
            }
            DbCommand::ClearSession { provider, reply } => {
                let _ = reply.send(storage.clear_session(&provider));
            }
        }
    }
    tracing::debug!("DB actor stopped");
}
