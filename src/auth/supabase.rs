use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::AUTHORIZATION, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::provider::{AuthError, AuthProvider};
use super::types::{AuthSession, AuthUser, Credentials, SignUpOutcome};
use crate::config::ProviderConfig;
use crate::shared::AppError;

/// Auth provider backed by the hosted GoTrue REST API (`{project}/auth/v1`)
pub struct SupabaseAuthProvider {
    client: reqwest::Client,
    auth_base: Url,
    api_key: String,
}

impl SupabaseAuthProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, AppError> {
        let auth_base = Url::parse(&format!("{}/auth/v1/", config.url.trim_end_matches('/')))
            .map_err(|e| AppError::Config(format!("invalid provider URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth_base,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.auth_base
            .join(path)
            .map_err(|e| AuthError::Network(format!("invalid endpoint {}: {}", path, e)))
    }

    /// POSTs a JSON body; `bearer` defaults to the public key for anonymous calls
    async fn post<B: Serialize + ?Sized>(
        &self,
        url: Url,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<reqwest::Response, AuthError> {
        let bearer = bearer.unwrap_or(&self.api_key);

        self.client
            .post(url)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", bearer))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Auth provider request failed");
                AuthError::Network(e.to_string())
            })
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<AuthSession, AuthError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self.post(url, None, &body).await?;
        read_json(response).await
    }
}

/// Turns an error response into `AuthError::Provider`, otherwise decodes the body
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = provider_message(status, &body);
        debug!(status = status.as_u16(), message = %message, "Auth provider rejected request");
        return Err(AuthError::Provider {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AuthError::MalformedResponse(e.to_string()))
}

/// Picks the human-readable text out of a GoTrue error body.
/// Different GoTrue versions use `msg`, `error_description`, `message` or `error`.
pub(crate) fn provider_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    parsed
        .as_ref()
        .and_then(|value| {
            ["msg", "error_description", "message", "error"]
                .iter()
                .find_map(|field| value.get(field).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        })
}

/// Sign-up answers with a session when the project auto-confirms,
/// and with the bare user record when confirmation is pending
fn parse_sign_up(body: Value) -> Result<SignUpOutcome, AuthError> {
    if body.get("access_token").is_some() {
        let session: AuthSession = serde_json::from_value(body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        return Ok(SignUpOutcome::Session(session));
    }

    let user_value = body.get("user").cloned().unwrap_or(body);
    let user: AuthUser = serde_json::from_value(user_value)
        .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
    Ok(SignUpOutcome::Confirmation { user })
}

#[async_trait]
impl AuthProvider for SupabaseAuthProvider {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, AuthError> {
        info!("Registering user with auth provider");

        let url = self.endpoint("signup")?;
        let body = json!({ "email": credentials.email, "password": credentials.password });
        let response = self.post(url, None, &body).await?;

        parse_sign_up(read_json::<Value>(response).await?)
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthSession, AuthError> {
        info!("Requesting password grant");

        let session = self
            .token_grant(
                "password",
                json!({ "email": credentials.email, "password": credentials.password }),
            )
            .await?;

        debug!(
            user_id = %session.user.id,
            expires_at = %session.expiry(Utc::now()),
            "Password grant succeeded"
        );
        Ok(session)
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        info!("Requesting refresh token grant");

        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    #[instrument(skip(self, access_token))]
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        info!("Terminating session with auth provider");

        let url = self.endpoint("logout")?;
        let response = self.post(url, Some(access_token), &json!({})).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(AuthError::Provider {
            status: status.as_u16(),
            message: provider_message(status, &body),
        })
    }
}
