//! WebSocket message types.
//!
//! These messages keep the wire format existing mobile clients expect.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::progress::{ProgressData, ProgressEvent};

/// Greeting sent right after an observer registers.
pub const CONNECTED_MESSAGE: &str = "Connected to FFmpeg server";

/// WebSocket message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Registration acknowledgment
    Connected,
    /// Progress update
    Progress,
}

impl WsMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WsMessageType::Connected => "connected",
            WsMessageType::Progress => "progress",
        }
    }
}

/// WebSocket message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Sent once per connection, before any progress
    Connected { message: String },

    /// Progress of some running job; `filename` identifies which one
    Progress { data: ProgressData, filename: String },
}

impl WsMessage {
    /// Create the connection acknowledgment.
    pub fn connected() -> Self {
        WsMessage::Connected {
            message: CONNECTED_MESSAGE.to_string(),
        }
    }

    pub fn message_type(&self) -> WsMessageType {
        match self {
            WsMessage::Connected { .. } => WsMessageType::Connected,
            WsMessage::Progress { .. } => WsMessageType::Progress,
        }
    }
}

impl From<ProgressEvent> for WsMessage {
    fn from(event: ProgressEvent) -> Self {
        WsMessage::Progress {
            data: event.data,
            filename: event.filename,
        }
    }
}
