use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{token, AuthSession};

/// Persisted part of a provider session, enough to restore it later
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>, // Missing in files written by older builds
}

impl StoredSession {
    pub fn from_auth_session(session: &AuthSession, received_at: DateTime<Utc>) -> Self {
        Self {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            user_id: session.user.id.clone(),
            email: session.user.email.clone(),
            expires_at: Some(session.expiry(received_at)),
        }
    }

    /// Stored expiry, else the `exp` claim of the access token
    pub fn resolved_expiry(&self) -> Option<DateTime<Utc>> {
        self.expires_at.or_else(|| {
            token::inspect_access_token(&self.access_token)
                .ok()
                .and_then(|claims| claims.expires_at())
        })
    }

    /// Sessions whose expiry can't be determined count as expired
    pub fn is_expired(&self, leeway_secs: i64) -> bool {
        self.resolved_expiry()
            .map(|expires_at| token::is_expired(expires_at, leeway_secs))
            .unwrap_or(true)
    }
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
