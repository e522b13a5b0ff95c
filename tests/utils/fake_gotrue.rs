use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use unikit::auth::SignUpOutcome;
use unikit::config::ProviderConfig;
use unikit::{AuthError, AuthProvider, Credentials, InMemoryAuthProvider};

// ============================================================================
// Fake hosted backend: GoTrue-shaped HTTP in front of InMemoryAuthProvider
// ============================================================================

#[derive(Clone)]
struct FakeState {
    provider: Arc<InMemoryAuthProvider>,
    api_key: String,
    bearers: Arc<Mutex<Vec<String>>>,
}

pub struct FakeGoTrue {
    pub url: String,
    pub api_key: String,
    pub provider: Arc<InMemoryAuthProvider>,
    bearers: Arc<Mutex<Vec<String>>>,
    _handle: JoinHandle<()>,
}

impl FakeGoTrue {
    pub async fn start(provider: InMemoryAuthProvider) -> Self {
        let api_key = "test-anon-key".to_string();
        let provider = Arc::new(provider);
        let bearers = Arc::new(Mutex::new(Vec::new()));

        let state = FakeState {
            provider: provider.clone(),
            api_key: api_key.clone(),
            bearers: bearers.clone(),
        };

        let app = Router::new()
            .route("/auth/v1/signup", post(sign_up))
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/logout", post(logout))
            .route("/rest/v1/:table", get(select))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            api_key,
            provider,
            bearers,
            _handle: handle,
        }
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            ..ProviderConfig::default()
        }
    }

    /// Bearer tokens seen by the fake, in order
    pub fn bearers(&self) -> Vec<String> {
        self.bearers.lock().unwrap().clone()
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    grant_type: String,
}

fn gotrue_error(status: u16, message: &str) -> Response {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
    (code, Json(json!({ "code": status, "msg": message }))).into_response()
}

fn into_response(error: AuthError) -> Response {
    match error {
        AuthError::Provider { status, message } => gotrue_error(status, &message),
        other => gotrue_error(500, &other.to_string()),
    }
}

fn authorize(state: &FakeState, headers: &HeaderMap) -> Result<String, Response> {
    let api_key = headers.get("apikey").and_then(|v| v.to_str().ok());
    if api_key != Some(state.api_key.as_str()) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "No API key found in request" })),
        )
            .into_response());
    }

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();
    state.bearers.lock().unwrap().push(bearer.clone());
    Ok(bearer)
}

fn credentials(body: &Value) -> Credentials {
    Credentials::new(
        body["email"].as_str().unwrap_or_default(),
        body["password"].as_str().unwrap_or_default(),
    )
}

async fn sign_up(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    match state.provider.sign_up(&credentials(&body)).await {
        Ok(SignUpOutcome::Session(session)) => Json(json!(session)).into_response(),
        Ok(SignUpOutcome::Confirmation { user }) => Json(json!({
            "id": user.id,
            "email": user.email,
            "confirmation_sent_at": "2024-03-30T12:00:00Z"
        }))
        .into_response(),
        Err(e) => into_response(e),
    }
}

async fn token(
    State(state): State<FakeState>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    let result = match query.grant_type.as_str() {
        "password" => state.provider.sign_in_with_password(&credentials(&body)).await,
        "refresh_token" => {
            let refresh_token = body["refresh_token"].as_str().unwrap_or_default();
            state.provider.refresh_session(refresh_token).await
        }
        other => {
            return gotrue_error(400, &format!("unsupported_grant_type: {}", other));
        }
    };

    match result {
        Ok(session) => Json(json!(session)).into_response(),
        Err(e) => into_response(e),
    }
}

async fn logout(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    let bearer = match authorize(&state, &headers) {
        Ok(bearer) => bearer,
        Err(rejection) => return rejection,
    };

    match state.provider.sign_out(&bearer).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => into_response(e),
    }
}

async fn select(
    State(state): State<FakeState>,
    Path(table): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    match table.as_str() {
        "agenda_items" => Json(json!([
            { "time": "7:00 AM", "title": "Clases", "details": "Calculo3" },
            { "time": "1:00 PM", "title": "Receso", "details": null }
        ]))
        .into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": format!("relation \"public.{}\" does not exist", table) })),
        )
            .into_response(),
    }
}
