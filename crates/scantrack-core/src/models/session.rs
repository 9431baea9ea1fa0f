use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Sessions this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 30;

/// An authenticated user, as issued by the session provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub const LOCAL_USER: &'static str = "local";

    /// The implicit session used by the local store, which has no accounts.
    pub fn local() -> Self {
        Self {
            user_id: Self::LOCAL_USER.into(),
            email: None,
            access_token: String::new(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.user_id == Self::LOCAL_USER && self.access_token.is_empty()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at <= now + Duration::seconds(EXPIRY_SKEW_SECS))
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Best label for the signed-in user.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.user_id)
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Session lifecycle notifications delivered to the state owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
}
