use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::provider::AuthError;

/// Claims carried by a provider access token that the client cares about
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64, // Expiration timestamp (standard JWT claim)
    #[serde(default)]
    pub role: Option<String>,
}

impl AccessClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Reads the claims of an access token without checking its signature.
/// The signing key lives with the provider; the client only needs the expiry.
#[instrument(skip(token))]
pub fn inspect_access_token(token: &str) -> Result<AccessClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| {
            debug!(sub = %data.claims.sub, exp = data.claims.exp, "Access token inspected");
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to inspect access token");
            AuthError::MalformedResponse(format!("unreadable access token: {}", e))
        })
}

/// True once `expires_at` minus the leeway has passed
pub fn is_expired(expires_at: DateTime<Utc>, leeway_secs: i64) -> bool {
    Utc::now() + Duration::seconds(leeway_secs) >= expires_at
}

/// Signs an HS256 access token; used by the in-memory provider
pub fn issue_access_token(
    secret: &str,
    user_id: &str,
    email: &str,
    ttl: Duration,
) -> Result<(String, i64), AuthError> {
    let exp = (Utc::now() + ttl).timestamp();
    let claims = AccessClaims {
        sub: user_id.to_string(),
        email: Some(email.to_string()),
        exp,
        role: Some("authenticated".to_string()),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map(|token| (token, exp))
    .map_err(|e| AuthError::MalformedResponse(e.to_string()))
}
