use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unikit::{
    config::Config,
    data::PostgrestClient,
    session::{self, FileSessionStore, InMemorySessionStore, SessionController, SessionStore},
    AppState, SupabaseAuthProvider,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unikit=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Unikit session service");

    let config = Config::from_env().unwrap_or_else(|e| exit_with(e, "Invalid configuration"));

    let provider = SupabaseAuthProvider::new(&config.provider)
        .unwrap_or_else(|e| exit_with(e, "Failed to build auth provider client"));
    let data_client = PostgrestClient::new(&config.provider)
        .unwrap_or_else(|e| exit_with(e, "Failed to build data API client"));

    // Persist the session on disk when a path is configured
    let store: Arc<dyn SessionStore + Send + Sync> = match &config.session_file {
        Some(path) => {
            let store = FileSessionStore::new(path.clone());
            info!(path = %store.path().display(), "Persisting session to file");
            Arc::new(store)
        }
        None => Arc::new(InMemorySessionStore::new()),
    };

    let controller = SessionController::new(Arc::new(provider), store, config.session.clone());
    let app_state = AppState::new(Arc::new(controller), Arc::new(data_client));

    let app = session::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| exit_with(e, "Failed to bind address"));
    info!("Server running on http://{}", config.bind_addr);
    if let Err(e) = axum::serve(listener, app).await {
        exit_with(e, "Server error");
    }
}

/// Logs a fatal startup or serve error and exits
fn exit_with(error: impl std::fmt::Display, context: &str) -> ! {
    error!(error = %error, "{}", context);
    std::process::exit(1)
}
