// Public API - what other modules can use
pub use controller::{SessionController, SIGNED_OUT_MESSAGE};
pub use middleware::{require_session, SessionToken};
pub use models::StoredSession;
pub use result::{NavigationGrant, SessionPhase, SessionResult};
pub use store::{FileSessionStore, InMemorySessionStore, SessionStore};
pub use types::{AuthResponse, CredentialsRequest};

// Re-exported so callers can build credentials without reaching into `auth`
pub use crate::auth::Credentials;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};

use crate::shared::AppState;

// Internal modules
mod controller;
pub mod handlers;
mod middleware;
mod models;
mod result;
pub mod socket;
mod store;
mod types;

/// Routes through which the presentation layer drives the session controller
pub fn router(state: AppState) -> Router {
    let data_routes = Router::new()
        .route("/data/:table", get(handlers::select_rows))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/auth/signup", post(handlers::sign_up))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/session", post(handlers::check_existing_session))
        .route("/auth/state", get(handlers::current_state))
        .route("/auth/ws", get(socket::state_socket))
        .merge(data_routes)
        .with_state(state)
}
