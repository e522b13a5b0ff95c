use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::provider::{AuthError, AuthProvider};
use super::token::{inspect_access_token, issue_access_token};
use super::types::{AuthSession, AuthUser, Credentials, SignUpOutcome};

#[derive(Debug, Clone)]
struct RegisteredUser {
    id: String,
    password: String,
    confirmed: bool,
}

/// In-memory implementation of AuthProvider for development and testing
///
/// Mirrors the observable behaviour of the hosted auth service closely enough
/// to drive the session controller without a network: duplicate sign ups,
/// unconfirmed accounts, bad passwords and refresh-token rotation all fail
/// with the same messages the hosted service uses.
pub struct InMemoryAuthProvider {
    users: Mutex<HashMap<String, RegisteredUser>>,
    refresh_tokens: Mutex<HashMap<String, String>>, // refresh_token -> email
    auto_confirm: bool,
    secret: String,
    token_ttl: Duration,
}

impl Default for InMemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuthProvider {
    /// Creates a provider that requires email confirmation after sign up
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            refresh_tokens: Mutex::new(HashMap::new()),
            auto_confirm: false,
            secret: "in-memory-auth-secret".to_string(),
            token_ttl: Duration::hours(1),
        }
    }

    /// Creates a provider that confirms accounts and issues a session on sign up
    pub fn auto_confirming() -> Self {
        Self {
            auto_confirm: true,
            ..Self::new()
        }
    }

    /// Overrides the lifetime of issued access tokens
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Pre-registers a confirmed user
    pub fn with_user(self, email: &str, password: &str) -> Self {
        self.users.lock().unwrap().insert(
            email.to_string(),
            RegisteredUser {
                id: Uuid::new_v4().to_string(),
                password: password.to_string(),
                confirmed: true,
            },
        );
        self
    }

    /// Marks a pending registration as confirmed
    pub fn confirm_email(&self, email: &str) -> bool {
        match self.users.lock().unwrap().get_mut(email) {
            Some(user) => {
                user.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Number of refresh tokens currently accepted
    pub fn active_session_count(&self) -> usize {
        self.refresh_tokens.lock().unwrap().len()
    }

    fn issue_session(&self, email: &str, user_id: &str) -> Result<AuthSession, AuthError> {
        let (access_token, expires_at) =
            issue_access_token(&self.secret, user_id, email, self.token_ttl)?;
        let refresh_token = Uuid::new_v4().simple().to_string();

        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(refresh_token.clone(), email.to_string());

        Ok(AuthSession {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.token_ttl.num_seconds(),
            expires_at: Some(expires_at),
            refresh_token,
            user: AuthUser {
                id: user_id.to_string(),
                email: Some(email.to_string()),
            },
        })
    }
}

fn rejected(status: u16, message: &str) -> AuthError {
    AuthError::Provider {
        status,
        message: message.to_string(),
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, AuthError> {
        let user_id = {
            let mut users = self.users.lock().unwrap();
            if users.contains_key(&credentials.email) {
                warn!("Sign up for an already registered email");
                return Err(rejected(422, "User already registered"));
            }

            let id = Uuid::new_v4().to_string();
            users.insert(
                credentials.email.clone(),
                RegisteredUser {
                    id: id.clone(),
                    password: credentials.password.clone(),
                    confirmed: self.auto_confirm,
                },
            );
            id
        };

        debug!(user_id = %user_id, auto_confirm = self.auto_confirm, "User registered in memory");

        if self.auto_confirm {
            Ok(SignUpOutcome::Session(
                self.issue_session(&credentials.email, &user_id)?,
            ))
        } else {
            Ok(SignUpOutcome::Confirmation {
                user: AuthUser {
                    id: user_id,
                    email: Some(credentials.email.clone()),
                },
            })
        }
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthSession, AuthError> {
        let user = self.users.lock().unwrap().get(&credentials.email).cloned();

        match user {
            Some(user) if user.password == credentials.password => {
                if !user.confirmed {
                    debug!("Login attempt before email confirmation");
                    return Err(rejected(400, "Email not confirmed"));
                }
                self.issue_session(&credentials.email, &user.id)
            }
            _ => {
                debug!("Login rejected in memory");
                Err(rejected(400, "Invalid login credentials"))
            }
        }
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        // Refresh tokens are single use
        let email = self.refresh_tokens.lock().unwrap().remove(refresh_token);

        let Some(email) = email else {
            debug!("Unknown refresh token");
            return Err(rejected(
                400,
                "Invalid Refresh Token: Refresh Token Not Found",
            ));
        };

        let user_id = self
            .users
            .lock()
            .unwrap()
            .get(&email)
            .map(|user| user.id.clone())
            .ok_or_else(|| rejected(404, "User not found"))?;

        self.issue_session(&email, &user_id)
    }

    #[instrument(skip(self, access_token))]
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let claims = inspect_access_token(access_token)
            .map_err(|_| rejected(401, "invalid JWT: unable to parse or verify signature"))?;
        let email = claims.email.unwrap_or_default();

        let mut refresh_tokens = self.refresh_tokens.lock().unwrap();
        let before = refresh_tokens.len();
        refresh_tokens.retain(|_, owner| owner != &email);

        debug!(
            revoked = before - refresh_tokens.len(),
            "Refresh tokens revoked in memory"
        );
        Ok(())
    }
}
