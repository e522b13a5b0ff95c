use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthSession, Credentials, SignUpOutcome};

/// Failure reported by an auth provider call
///
/// The `Display` output is what ends up in front of the user, so provider
/// messages are passed through untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("{message}")]
    Provider { status: u16, message: String },

    #[error("{0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Hosted authentication service the session controller delegates to
#[async_trait]
pub trait AuthProvider {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, AuthError>;
    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthSession, AuthError>;
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}
