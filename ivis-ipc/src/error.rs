//! IPC error types

use std::time::Duration;
use thiserror::Error;

/// IPC error types
#[derive(Debug, Error)]
pub enum IpcError {
    /// The host closed the inbound stream before a response line arrived
    #[error("Channel closed by host before a response was received")]
    ChannelClosed,

    /// The host answered with an `error` field
    #[error("Request failed on host: {0}")]
    RemoteRequest(String),

    /// No response within the configured response timeout
    #[error("Timed out after {0:?} waiting for response")]
    Timeout(Duration),

    /// A previous request timed out, so request/response pairing can no longer be trusted
    #[error("Channel desynchronized by an earlier timeout")]
    Desynchronized,

    /// Inbound line exceeded the configured maximum length
    #[error("Inbound line exceeded {limit} bytes")]
    LineTooLong { limit: usize },

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl IpcError {
    /// Whether the channel is unusable after this error.
    ///
    /// A host-reported failure and an unparseable response both consume
    /// exactly one response line, so pairing is intact afterwards. A request
    /// that could not be encoded was never written.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            IpcError::RemoteRequest(_) | IpcError::Deserialization(_) | IpcError::Serialization(_)
        )
    }

    /// The host-supplied message for [`IpcError::RemoteRequest`]
    pub fn remote_detail(&self) -> Option<&str> {
        match self {
            IpcError::RemoteRequest(detail) => Some(detail),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IpcError {
    fn from(err: std::io::Error) -> Self {
        IpcError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for IpcError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            IpcError::Io(err.to_string())
        } else if err.is_syntax() || err.is_data() || err.is_eof() {
            IpcError::Deserialization(err.to_string())
        } else {
            IpcError::Serialization(err.to_string())
        }
    }
}
