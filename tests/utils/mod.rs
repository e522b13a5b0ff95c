pub mod fake_gotrue;
pub mod mocks;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use fake_gotrue::FakeGoTrue;
#[allow(unused_imports)]
pub use mocks::{
    expired_stored_session, invalid_credentials, invalid_refresh_token, session_for,
    GatedAuthProvider, SlowSaveStore,
};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
