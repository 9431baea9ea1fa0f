use tokio::sync::mpsc;

use scantrack_api::traits::SessionProvider;
use scantrack_core::models::{Session, SessionEvent};

use crate::db::DbHandle;
use crate::RuntimeError;

/// Owns the session lifecycle and announces changes as [`SessionEvent`]s.
///
/// Without a provider (the local backend) there are no accounts: the
/// implicit local session is always signed in.
pub struct SessionManager<P> {
    provider: Option<P>,
    db: DbHandle,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl<P: SessionProvider> SessionManager<P> {
    pub fn new(
        provider: Option<P>,
        db: DbHandle,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { provider, db, tx }, rx)
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    /// Resume whatever session was persisted, refreshing it if expired.
    pub async fn restore(&self) -> Result<Option<Session>, RuntimeError> {
        let Some(provider) = &self.provider else {
            let session = Session::local();
            self.emit(SessionEvent::SignedIn(session.clone()));
            return Ok(Some(session));
        };

        let stored = self
            .db
            .load_session(provider.name())
            .await
            .map_err(|e| RuntimeError::Database(e.to_string()))?;

        let session = match stored {
            Some(session) if !session.is_expired() => Some(session),
            Some(session) if session.refresh_token.is_some() => {
                match provider.refresh(&session).await {
                    Ok(fresh) => {
                        self.db
                            .save_session(provider.name(), fresh.clone())
                            .await
                            .map_err(|e| RuntimeError::Database(e.to_string()))?;
                        tracing::info!(user = %fresh.display_name(), "Session refreshed");
                        Some(fresh)
                    }
                    Err(e) => {
                        tracing::warn!("Session refresh failed, signing out: {e}");
                        self.forget(provider.name()).await?;
                        None
                    }
                }
            }
            Some(_) => {
                tracing::info!("Stored session expired");
                self.forget(provider.name()).await?;
                None
            }
            None => None,
        };

        self.emit(match &session {
            Some(s) => SessionEvent::SignedIn(s.clone()),
            None => SessionEvent::SignedOut,
        });
        Ok(session)
    }

    /// Run the provider's interactive sign-in and persist the result.
    pub async fn login(&self) -> Result<Session, RuntimeError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            RuntimeError::Auth("the local backend has no accounts to sign in to".into())
        })?;

        let session = provider
            .sign_in()
            .await
            .map_err(|e| RuntimeError::Auth(e.to_string()))?;
        self.db
            .save_session(provider.name(), session.clone())
            .await
            .map_err(|e| RuntimeError::Database(e.to_string()))?;

        tracing::info!(user = %session.display_name(), "Signed in");
        self.emit(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Sign out remotely (best effort) and drop the persisted session.
    pub async fn logout(&self) -> Result<(), RuntimeError> {
        let Some(provider) = &self.provider else {
            return Err(RuntimeError::Auth(
                "the local backend has no accounts to sign out of".into(),
            ));
        };

        let stored = self
            .db
            .load_session(provider.name())
            .await
            .map_err(|e| RuntimeError::Database(e.to_string()))?;
        if let Some(session) = stored {
            if let Err(e) = provider.sign_out(&session).await {
                tracing::warn!("Remote sign-out failed: {e}");
            }
        }

        self.forget(provider.name()).await?;
        tracing::info!("Signed out");
        self.emit(SessionEvent::SignedOut);
        Ok(())
    }

    async fn forget(&self, provider: &str) -> Result<(), RuntimeError> {
        self.db
            .clear_session(provider)
            .await
            .map_err(|e| RuntimeError::Database(e.to_string()))
    }
}
