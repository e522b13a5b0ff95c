use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::StoredSession;
use crate::shared::AppError;

/// Trait for persisting the provider session between runs
#[async_trait]
pub trait SessionStore {
    async fn load(&self) -> Result<Option<StoredSession>, AppError>;
    async fn save(&self, session: &StoredSession) -> Result<(), AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}

/// In-memory implementation of SessionStore for development and testing
///
/// Nothing survives a restart.
pub struct InMemorySessionStore {
    session: Mutex<Option<StoredSession>>,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }

    /// Creates a store that already holds a session
    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.lock().unwrap().is_some()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self) -> Result<Option<StoredSession>, AppError> {
        Ok(self.session.lock().unwrap().clone())
    }

    #[instrument(skip(self, session))]
    async fn save(&self, session: &StoredSession) -> Result<(), AppError> {
        debug!(user_id = %session.user_id, "Saving session in memory");
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        self.session.lock().unwrap().take();
        Ok(())
    }
}

/// JSON file implementation of SessionStore
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<StoredSession>, AppError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No session file");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read session file");
                return Err(AppError::Storage(e.to_string()));
            }
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            warn!(error = %e, "Session file is not valid JSON");
            AppError::Storage(format!("corrupt session file: {}", e))
        })
    }

    #[instrument(skip(self, session), fields(path = %self.path.display()))]
    async fn save(&self, session: &StoredSession) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::Storage(e.to_string()))?;
            }
        }

        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| AppError::Storage(e.to_string()))?;

        // Write-then-rename so a crash never leaves half a file behind
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        debug!(user_id = %session.user_id, "Session saved to file");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn clear(&self) -> Result<(), AppError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Session file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(e.to_string())),
        }
    }
}
