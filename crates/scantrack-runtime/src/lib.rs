mod backend;
mod db;
mod session;
mod tracker;
mod writer;

#[cfg(test)]
mod testing;

use tokio::sync::mpsc;

use scantrack_api::jikan::JikanClient;
use scantrack_api::supabase::SupabaseAuth;
use scantrack_core::config::AppConfig;
use scantrack_core::models::{Session, SessionEvent};

pub use backend::{Backend, BackendError};
pub use db::DbHandle;
pub use session::SessionManager;
pub use tracker::{DeleteOutcome, Tracker, TrackerError};
pub use writer::{WriteOp, WriteOutcome, WriteQueue, WriteTicket};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("auth error: {0}")]
    Auth(String),
}

/// The tracker as the front ends use it.
pub type AppTracker = Tracker<Backend, JikanClient>;

/// Everything a front end needs, wired from config.
pub struct Runtime {
    config: AppConfig,
    tracker: AppTracker,
    sessions: SessionManager<SupabaseAuth>,
    session_events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Runtime {
    /// Open the local database and build the selected backend.
    ///
    /// Must be called inside a tokio runtime.
    pub fn open(config: AppConfig) -> Result<Self, RuntimeError> {
        config
            .validate()
            .map_err(|e| RuntimeError::Config(e.to_string()))?;
        let db_path =
            AppConfig::ensure_db_path().map_err(|e| RuntimeError::Config(e.to_string()))?;
        let db = DbHandle::open(&db_path).map_err(|e| RuntimeError::Database(e.to_string()))?;
        Ok(Self::with_db(config, db))
    }

    /// Wire everything around an already open database.
    pub fn with_db(config: AppConfig, db: DbHandle) -> Self {
        let backend = Backend::from_config(&config, db.clone());
        let provider = (!backend.is_local()).then(|| {
            SupabaseAuth::new(
                &config.supabase.url,
                &config.supabase.anon_key,
                config.supabase.redirect_port,
            )
        });
        let covers = JikanClient::with_base_url(&config.covers.base_url);

        let tracker = Tracker::new(backend, covers, &config);
        let (sessions, session_events) = SessionManager::new(provider, db);

        tracing::debug!(backend = ?config.backend.kind, "Runtime ready");
        Self {
            config,
            tracker,
            sessions,
            session_events,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn tracker(&self) -> &AppTracker {
        &self.tracker
    }

    /// Restore the persisted session and load the records it can see.
    pub async fn start(&mut self) -> Result<Option<Session>, RuntimeError> {
        let session = self.sessions.restore().await?;
        self.pump_session_events().await;
        Ok(session)
    }

    pub async fn login(&mut self) -> Result<Session, RuntimeError> {
        let session = self.sessions.login().await?;
        self.pump_session_events().await;
        Ok(session)
    }

    pub async fn logout(&mut self) -> Result<(), RuntimeError> {
        self.sessions.logout().await?;
        self.pump_session_events().await;
        Ok(())
    }

    /// Hand pending session events to the tracker, in order.
    async fn pump_session_events(&mut self) {
        while let Ok(event) = self.session_events.try_recv() {
            if let Err(e) = self.tracker.on_session_event(event).await {
                tracing::warn!("Session event handling failed: {e}");
            }
        }
    }
}
