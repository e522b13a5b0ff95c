// Library crate for the Unikit session service
// This file exposes the public API for integration tests

pub mod auth;
pub mod config;
pub mod data;
pub mod session;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use auth::{AuthError, AuthProvider, Credentials, InMemoryAuthProvider, SupabaseAuthProvider};
pub use config::{Config, ResponseOrdering, SignUpPolicy};
pub use session::{NavigationGrant, SessionController, SessionResult};
pub use shared::{AppError, AppState};
