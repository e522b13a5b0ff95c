use serde::{Deserialize, Serialize};

use super::result::{NavigationGrant, SessionResult};
use crate::auth::Credentials;

/// Request body for sign up and login
#[derive(Deserialize, Serialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

impl From<CredentialsRequest> for Credentials {
    fn from(request: CredentialsRequest) -> Self {
        Credentials::new(request.email, request.password)
    }
}

/// Response body for every auth operation endpoint
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub state: SessionResult,
    pub navigate: bool,
}

impl AuthResponse {
    pub fn new(state: SessionResult, grant: NavigationGrant) -> Self {
        Self {
            state,
            navigate: grant.is_granted(),
        }
    }
}
