use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use super::{
    middleware::SessionToken,
    result::{NavigationGrant, SessionResult},
    types::{AuthResponse, CredentialsRequest},
};
use crate::shared::{AppError, AppState};

/// POST /auth/signup
#[instrument(name = "sign_up", skip(state, request), fields(email = %request.email))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Json<AuthResponse> {
    let controller = &state.session_controller;
    let grant = controller.sign_up(request.into()).await;
    Json(AuthResponse::new(controller.current(), grant))
}

/// POST /auth/login
#[instrument(name = "login", skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Json<AuthResponse> {
    let controller = &state.session_controller;
    let grant = controller.login(request.into()).await;

    info!(navigate = grant.is_granted(), "Login handled");
    Json(AuthResponse::new(controller.current(), grant))
}

/// POST /auth/logout
#[instrument(name = "logout", skip(state))]
pub async fn logout(State(state): State<AppState>) -> Json<AuthResponse> {
    let controller = &state.session_controller;
    controller.logout().await;
    Json(AuthResponse::new(
        controller.current(),
        NavigationGrant::Withheld,
    ))
}

/// POST /auth/session
/// Called once when the login screen opens
#[instrument(name = "check_existing_session", skip(state))]
pub async fn check_existing_session(State(state): State<AppState>) -> Json<AuthResponse> {
    let controller = &state.session_controller;
    let grant = controller.check_existing_session().await;
    Json(AuthResponse::new(controller.current(), grant))
}

/// GET /auth/state
pub async fn current_state(State(state): State<AppState>) -> Json<SessionResult> {
    Json(state.session_controller.current())
}

#[derive(Debug, Deserialize)]
pub struct SelectQuery {
    pub select: Option<String>,
}

/// GET /data/:table
/// Requires an authenticated session (see `require_session`)
#[instrument(name = "select_rows", skip(state, token))]
pub async fn select_rows(
    State(state): State<AppState>,
    Extension(token): Extension<SessionToken>,
    Path(table): Path<String>,
    Query(query): Query<SelectQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    let columns = query.select.as_deref().unwrap_or("*");
    let rows = state
        .data_client
        .select(&table, columns, Some(&token.0))
        .await?;
    Ok(Json(rows))
}
