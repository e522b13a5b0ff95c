// Public API - what other modules can use
pub use in_memory::InMemoryAuthProvider;
pub use provider::{AuthError, AuthProvider};
pub use supabase::SupabaseAuthProvider;
pub use types::{AuthSession, AuthUser, Credentials, SignUpOutcome};

// Internal modules
mod in_memory;
mod provider;
mod supabase;
pub mod token;
mod types;
