use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

use unikit::auth::{AuthSession, AuthUser, SignUpOutcome};
use unikit::session::{InMemorySessionStore, SessionStore, StoredSession};
use unikit::{AppError, AuthError, AuthProvider, Credentials};

// ============================================================================
// Mock Infrastructure
// ============================================================================

type LoginReply = Result<AuthSession, AuthError>;

/// Auth provider whose login and refresh responses are released by the test,
/// keyed by password or refresh token, so responses can arrive in any order
pub struct GatedAuthProvider {
    gates: Mutex<HashMap<String, oneshot::Receiver<LoginReply>>>,
    refresh_gates: Mutex<HashMap<String, oneshot::Receiver<LoginReply>>>,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl GatedAuthProvider {
    pub fn new() -> Self {
        Self {
            gates: Mutex::new(HashMap::new()),
            refresh_gates: Mutex::new(HashMap::new()),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    /// Registers a pending login for `password`; the returned sender releases it
    pub fn gate(&self, password: &str) -> oneshot::Sender<LoginReply> {
        let (sender, receiver) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .insert(password.to_string(), receiver);
        sender
    }

    /// Registers a pending refresh for `refresh_token`
    pub fn gate_refresh(&self, refresh_token: &str) -> oneshot::Sender<LoginReply> {
        let (sender, receiver) = oneshot::channel();
        self.refresh_gates
            .lock()
            .unwrap()
            .insert(refresh_token.to_string(), receiver);
        sender
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    /// Yields until `count` logins have reached the provider
    pub async fn wait_for_logins(&self, count: usize) {
        while self.login_calls() < count {
            tokio::task::yield_now().await;
        }
    }

    pub async fn wait_for_refreshes(&self, count: usize) {
        while self.refresh_calls.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl AuthProvider for GatedAuthProvider {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, AuthError> {
        Ok(SignUpOutcome::Confirmation {
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some(credentials.email.clone()),
            },
        })
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> LoginReply {
        let gate = self.gates.lock().unwrap().remove(&credentials.password);
        self.login_calls.fetch_add(1, Ordering::SeqCst);

        match gate {
            Some(gate) => gate
                .await
                .unwrap_or_else(|_| Err(AuthError::Network("gate dropped".to_string()))),
            None => Err(invalid_credentials()),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> LoginReply {
        let gate = self.refresh_gates.lock().unwrap().remove(refresh_token);
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        match gate {
            Some(gate) => gate
                .await
                .unwrap_or_else(|_| Err(AuthError::Network("gate dropped".to_string()))),
            None => Err(invalid_refresh_token()),
        }
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Session store whose first save blocks until the test releases it
pub struct SlowSaveStore {
    inner: InMemorySessionStore,
    release: Mutex<Option<oneshot::Receiver<()>>>,
    saves_started: AtomicUsize,
}

impl SlowSaveStore {
    pub fn new() -> (Self, oneshot::Sender<()>) {
        let (sender, receiver) = oneshot::channel();
        let store = Self {
            inner: InMemorySessionStore::new(),
            release: Mutex::new(Some(receiver)),
            saves_started: AtomicUsize::new(0),
        };
        (store, sender)
    }

    pub fn has_session(&self) -> bool {
        self.inner.has_session()
    }

    pub async fn wait_for_saves(&self, count: usize) {
        while self.saves_started.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl SessionStore for SlowSaveStore {
    async fn load(&self) -> Result<Option<StoredSession>, AppError> {
        self.inner.load().await
    }

    async fn save(&self, session: &StoredSession) -> Result<(), AppError> {
        let release = self.release.lock().unwrap().take();
        self.saves_started.fetch_add(1, Ordering::SeqCst);
        if let Some(release) = release {
            let _ = release.await;
        }
        self.inner.save(session).await
    }

    async fn clear(&self) -> Result<(), AppError> {
        self.inner.clear().await
    }
}

pub fn invalid_credentials() -> AuthError {
    AuthError::Provider {
        status: 400,
        message: "Invalid login credentials".to_string(),
    }
}

pub fn invalid_refresh_token() -> AuthError {
    AuthError::Provider {
        status: 400,
        message: "Invalid Refresh Token: Refresh Token Not Found".to_string(),
    }
}

/// A persisted session whose access token has already expired
pub fn expired_stored_session(email: &str) -> StoredSession {
    StoredSession {
        access_token: format!("expired-access-for-{}", email),
        refresh_token: format!("stored-refresh-for-{}", email),
        user_id: "user-1".to_string(),
        email: Some(email.to_string()),
        expires_at: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
    }
}

pub fn session_for(email: &str) -> AuthSession {
    AuthSession {
        access_token: format!("access-token-for-{}", email),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        expires_at: Some(chrono::Utc::now().timestamp() + 3600),
        refresh_token: format!("refresh-token-for-{}", email),
        user: AuthUser {
            id: "user-1".to_string(),
            email: Some(email.to_string()),
        },
    }
}
