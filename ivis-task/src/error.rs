//! Task error types

use ivis_config::ConfigError;
use ivis_ipc::IpcError;
use thiserror::Error;

/// Result type for task-side operations
pub type TaskResult<T> = Result<T, TaskError>;

/// Errors surfaced to task business logic
#[derive(Debug, Error)]
pub enum TaskError {
    /// The initial payload on stdin was unreadable or incomplete
    #[error("Malformed bootstrap payload: {reason}")]
    MalformedBootstrap { reason: String },

    /// A descriptor lacks a required field
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A descriptor field has the wrong JSON type
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// The request destination could not be opened
    #[error("Failed to open request channel {path}: {message}")]
    ChannelOpen { path: String, message: String },

    /// Channel failure or host-reported request failure
    #[error(transparent)]
    Ipc(#[from] IpcError),

    /// Search engine client failure
    #[error("Search client error: {0}")]
    Search(String),

    /// Configuration failure
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Value could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TaskError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        TaskError::MalformedBootstrap {
            reason: reason.into(),
        }
    }

    /// Whether the host rejected the request.
    ///
    /// This is the only failure business logic can recover from; the channel
    /// remains usable afterwards.
    pub fn is_remote(&self) -> bool {
        matches!(self, TaskError::Ipc(IpcError::RemoteRequest(_)))
    }

    /// The host-supplied message of a rejected request
    pub fn remote_detail(&self) -> Option<&str> {
        match self {
            TaskError::Ipc(err) => err.remote_detail(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::Serialization(err.to_string())
    }
}
