//! IPC protocol definitions and message types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::error::IpcError;

/// Request types understood by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    CreateSignals,
    StoreState,
}

impl RequestKind {
    /// Wire tag written into the `type` field
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::CreateSignals => "create_signals",
            RequestKind::StoreState => "store_state",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messages sent from a task to its host
///
/// Optional payload keys are omitted from the wire form when `None`; the host
/// distinguishes an absent key from an empty one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestMessage {
    /// Create signal sets and/or signals
    CreateSignals {
        #[serde(rename = "signalSets", default, skip_serializing_if = "Option::is_none")]
        signal_sets: Option<JsonValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signals: Option<JsonValue>,
    },

    /// Persist the task state verbatim
    StoreState { state: JsonValue },
}

impl RequestMessage {
    /// Get the request type
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestMessage::CreateSignals { .. } => RequestKind::CreateSignals,
            RequestMessage::StoreState { .. } => RequestKind::StoreState,
        }
    }
}

/// Serialize a request into a single newline-terminated line
pub fn encode_line(message: &RequestMessage) -> Result<String, IpcError> {
    let mut line =
        serde_json::to_string(message).map_err(|e| IpcError::Serialization(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

/// A response read back from the host
///
/// Either an operation-specific success payload or an object carrying an
/// `error` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseMessage {
    payload: JsonValue,
}

impl ResponseMessage {
    /// Wrap an already parsed payload
    pub fn new(payload: JsonValue) -> Self {
        Self { payload }
    }

    /// Parse one response line
    pub fn parse(line: &str) -> Result<Self, IpcError> {
        let payload: JsonValue = serde_json::from_str(line.trim_end())
            .map_err(|e| IpcError::Deserialization(e.to_string()))?;
        Ok(Self { payload })
    }

    /// Host-reported failure, if any.
    ///
    /// A string is returned verbatim; any other non-null value is rendered as
    /// compact JSON.
    pub fn error_detail(&self) -> Option<String> {
        match self.payload.get("error") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(detail)) => Some(detail.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    /// Borrow the raw payload
    pub fn payload(&self) -> &JsonValue {
        &self.payload
    }

    /// Unwrap into the success payload or a [`IpcError::RemoteRequest`]
    pub fn into_result(self) -> Result<JsonValue, IpcError> {
        match self.error_detail() {
            Some(detail) => Err(IpcError::RemoteRequest(detail)),
            None => Ok(self.payload),
        }
    }
}
