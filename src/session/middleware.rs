use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use crate::shared::{AppError, AppState};

/// Access token of the authenticated session, inserted into request extensions
#[derive(Clone)]
pub struct SessionToken(pub String);

/// Rejects requests unless the controller holds an authenticated session.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), session::require_session))
/// Handlers can then extract Extension(token): Extension<SessionToken>.
#[instrument(skip(state, req, next))]
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = state.session_controller.access_token().ok_or_else(|| {
        warn!(uri = %req.uri(), "Request without an authenticated session");
        AppError::Unauthorized("Login required".to_string())
    })?;

    debug!(uri = %req.uri(), "Authenticated session present");
    req.extensions_mut().insert(SessionToken(token));

    Ok(next.run(req).await)
}
