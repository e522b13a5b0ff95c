use chrono::Utc;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::{
    models::StoredSession,
    result::{NavigationGrant, SessionResult},
    store::SessionStore,
};
use crate::auth::{AuthError, AuthProvider, AuthSession, Credentials, SignUpOutcome};
use crate::config::{ResponseOrdering, SessionConfig, SignUpPolicy};

pub const SIGNED_OUT_MESSAGE: &str = "Signed out";

fn welcome_message(email: &str) -> String {
    format!("Welcome, {}", email)
}

fn welcome_back_message(email: Option<&str>) -> String {
    match email {
        Some(email) => format!("Welcome back, {}", email),
        None => "Welcome back".to_string(),
    }
}

fn confirmation_message(email: &str) -> String {
    format!(
        "Registration successful. Check {} to confirm your account.",
        email
    )
}

fn registered_message(email: &str) -> String {
    format!("Registration successful. You can now log in as {}.", email)
}

/// Mediates every authentication operation and owns the current `SessionResult`
///
/// Operations never return errors: failures are published as
/// `SessionResult::Error` for whoever is watching the state. Calls may overlap;
/// `ResponseOrdering` decides what happens when their responses cross.
pub struct SessionController {
    provider: Arc<dyn AuthProvider + Send + Sync>,
    store: Arc<dyn SessionStore + Send + Sync>,
    config: SessionConfig,
    state: watch::Sender<SessionResult>,
    active: RwLock<Option<StoredSession>>,
    latest_request: Mutex<u64>,
    /// Held across every store write so writes land in the order they read `active`
    store_writes: tokio::sync::Mutex<()>,
}

impl SessionController {
    pub fn new(
        provider: Arc<dyn AuthProvider + Send + Sync>,
        store: Arc<dyn SessionStore + Send + Sync>,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionResult::Loading);

        Self {
            provider,
            store,
            config,
            state,
            active: RwLock::new(None),
            latest_request: Mutex::new(0),
            store_writes: tokio::sync::Mutex::new(()),
        }
    }

    /// Snapshot of the current state (polling interface)
    pub fn current(&self) -> SessionResult {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change (subscription interface)
    pub fn subscribe(&self) -> watch::Receiver<SessionResult> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.active.read().unwrap().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.active
            .read()
            .unwrap()
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    pub fn user_email(&self) -> Option<String> {
        self.active
            .read()
            .unwrap()
            .as_ref()
            .and_then(|session| session.email.clone())
    }

    /// Registers a new account
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn sign_up(&self, credentials: Credentials) -> NavigationGrant {
        let request_id = self.begin("sign_up");

        match self.provider.sign_up(&credentials).await {
            Ok(SignUpOutcome::Session(session))
                if self.config.sign_up_policy == SignUpPolicy::AutoLogin =>
            {
                info!(request_id, "Registration issued a session, signing in");
                self.adopt_session(request_id, session, welcome_message(&credentials.email))
                    .await
            }
            Ok(SignUpOutcome::Session(_)) => {
                info!(request_id, "Registration confirmed, login required");
                self.settle(
                    request_id,
                    SessionResult::success(registered_message(&credentials.email)),
                    || {},
                );
                NavigationGrant::Withheld
            }
            Ok(SignUpOutcome::Confirmation { user }) => {
                info!(request_id, user_id = %user.id, "Registration awaiting email confirmation");
                self.settle(
                    request_id,
                    SessionResult::success(confirmation_message(&credentials.email)),
                    || {},
                );
                NavigationGrant::Withheld
            }
            Err(error) => {
                warn!(request_id, error = %error, "Registration failed");
                self.settle(request_id, SessionResult::error(error.to_string()), || {});
                NavigationGrant::Withheld
            }
        }
    }

    /// Verifies credentials; `Granted` means the caller may navigate on
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: Credentials) -> NavigationGrant {
        let request_id = self.begin("login");

        match self.provider.sign_in_with_password(&credentials).await {
            Ok(session) => {
                self.adopt_session(request_id, session, welcome_message(&credentials.email))
                    .await
            }
            Err(error) => {
                warn!(request_id, error = %error, "Login failed");
                self.settle(request_id, SessionResult::error(error.to_string()), || {});
                NavigationGrant::Withheld
            }
        }
    }

    /// Ends the session. Local session data is dropped whatever the provider says.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let request_id = self.begin("logout");

        let active = self.active.write().unwrap().take();
        let previous = match active {
            Some(session) => Some(session),
            None => self.store.load().await.unwrap_or_else(|e| {
                warn!(error = %e, "Could not read stored session during logout");
                None
            }),
        };

        self.sync_store().await;

        let result = match previous {
            Some(session) => match self.provider.sign_out(&session.access_token).await {
                Ok(()) => {
                    info!(request_id, user_id = %session.user_id, "Session terminated");
                    SessionResult::success(SIGNED_OUT_MESSAGE)
                }
                Err(error) => {
                    warn!(request_id, error = %error, "Provider failed to terminate session");
                    SessionResult::error(error.to_string())
                }
            },
            None => {
                debug!(request_id, "No session to terminate");
                SessionResult::success(SIGNED_OUT_MESSAGE)
            }
        };

        self.settle(request_id, result, || {});
    }

    /// Restores a persisted session, refreshing it if it has expired.
    /// Finding nothing usable is not an error and leaves the state as it was.
    #[instrument(skip(self))]
    pub async fn check_existing_session(&self) -> NavigationGrant {
        // Nothing to restore: no request id, no state change
        let stored = match self.store.load().await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                info!("No stored session");
                return NavigationGrant::Withheld;
            }
            Err(e) => {
                warn!(error = %e, "Could not read stored session");
                return NavigationGrant::Withheld;
            }
        };

        let previous = self.current();
        let request_id = self.begin("check_existing_session");
        let message = welcome_back_message(stored.email.as_deref());

        if !stored.is_expired(self.config.expiry_leeway_secs) {
            info!(request_id, user_id = %stored.user_id, "Restoring stored session");
            let applied = self.settle(request_id, SessionResult::success(message), || {
                *self.active.write().unwrap() = Some(stored);
            });
            return if applied {
                NavigationGrant::Granted
            } else {
                NavigationGrant::Withheld
            };
        }

        info!(request_id, user_id = %stored.user_id, "Stored session expired, refreshing");
        match self.provider.refresh_session(&stored.refresh_token).await {
            Ok(session) => self.adopt_session(request_id, session, message).await,
            Err(error) => {
                if !self.settle(request_id, previous, || {}) {
                    return NavigationGrant::Withheld;
                }
                if let AuthError::Provider { .. } = error {
                    warn!(request_id, error = %error, "Refresh rejected, discarding stored session");
                    self.sync_store().await;
                } else {
                    warn!(request_id, error = %error, "Refresh failed, keeping stored session");
                }
                NavigationGrant::Withheld
            }
        }
    }

    /// Starts an operation: takes the next request id and publishes `Loading`
    fn begin(&self, operation: &'static str) -> u64 {
        let mut latest = self.latest_request.lock().unwrap();
        *latest += 1;
        self.state.send_replace(SessionResult::Loading);
        debug!(request_id = *latest, operation, "Operation started");
        *latest
    }

    /// Publishes the outcome of `request_id` and runs `apply` alongside it.
    /// Returns false when the response was discarded as stale.
    fn settle(&self, request_id: u64, result: SessionResult, apply: impl FnOnce()) -> bool {
        let latest = self.latest_request.lock().unwrap();

        if self.config.response_ordering == ResponseOrdering::LatestRequest
            && *latest != request_id
        {
            info!(
                request_id,
                latest_request = *latest,
                phase = result.phase().as_ref(),
                "Discarding response superseded by a newer operation"
            );
            return false;
        }

        apply();
        debug!(request_id, phase = result.phase().as_ref(), "Session state updated");
        self.state.send_replace(result);
        true
    }

    async fn adopt_session(
        &self,
        request_id: u64,
        session: AuthSession,
        message: String,
    ) -> NavigationGrant {
        let stored = StoredSession::from_auth_session(&session, Utc::now());

        let applied = self.settle(request_id, SessionResult::success(message), || {
            *self.active.write().unwrap() = Some(stored.clone());
        });
        if !applied {
            return NavigationGrant::Withheld;
        }

        self.sync_store().await;

        info!(request_id, user_id = %stored.user_id, "Session established");
        NavigationGrant::Granted
    }

    /// Saves the active session, or clears the store when there is none.
    /// `active` is read under the write lock.
    async fn sync_store(&self) {
        let _guard = self.store_writes.lock().await;
        let active = self.active.read().unwrap().clone();

        let outcome = match &active {
            Some(session) => self.store.save(session).await,
            None => self.store.clear().await,
        };
        if let Err(e) = outcome {
            warn!(error = %e, persisted = active.is_some(), "Failed to sync stored session");
        }
    }
}
