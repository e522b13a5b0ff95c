use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Outcome of the most recent authentication operation
///
/// Only the latest operation is reflected; there is no history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionResult {
    /// An operation is in flight, or nothing has completed yet
    #[default]
    Loading,
    Success {
        message: String,
    },
    Error {
        message: String,
    },
}

/// Fieldless view of a `SessionResult`, handy for logs and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    Loading,
    Success,
    Error,
}

impl SessionResult {
    pub fn success(message: impl Into<String>) -> Self {
        SessionResult::Success {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        SessionResult::Error {
            message: message.into(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionResult::Loading => SessionPhase::Loading,
            SessionResult::Success { .. } => SessionPhase::Success,
            SessionResult::Error { .. } => SessionPhase::Error,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            SessionResult::Loading => None,
            SessionResult::Success { message } | SessionResult::Error { message } => {
                Some(message)
            }
        }
    }
}

/// Whether the caller may move on to the authenticated area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationGrant {
    Granted,
    Withheld,
}

impl NavigationGrant {
    pub fn is_granted(self) -> bool {
        matches!(self, NavigationGrant::Granted)
    }
}
