//! Inbound and outbound WebSocket message type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use linguahub_core::error::AppError;
use linguahub_core::result::AppResult;

/// Error code the server attaches to an authentication-failure frame.
pub const AUTH_FAILED_CODE: &str = "AUTH_FAILED";

/// Discriminator for messages sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Connection acknowledged by the server.
    Connected,
    /// A chat message in one of the user's groups.
    NewMessage,
    /// A system-generated announcement.
    SystemMessage,
    /// A new group was created.
    GroupCreated,
    /// Another member is typing.
    Typing,
    /// Server-reported error.
    Error,
    /// Keep-alive response.
    Pong,
    /// A member joined a group.
    MemberAdded,
    /// A member left or was removed from a group.
    MemberRemoved,
    /// Group metadata changed.
    GroupUpdated,
    /// The current user was removed from a group.
    YouWereRemoved,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connected => "connected",
            Self::NewMessage => "new_message",
            Self::SystemMessage => "system_message",
            Self::GroupCreated => "group_created",
            Self::Typing => "typing",
            Self::Error => "error",
            Self::Pong => "pong",
            Self::MemberAdded => "member_added",
            Self::MemberRemoved => "member_removed",
            Self::GroupUpdated => "group_updated",
            Self::YouWereRemoved => "you_were_removed",
        };
        write!(f, "{name}")
    }
}

/// Envelope for messages received from the server.
///
/// Every frame carries a `type` discriminator; error frames additionally
/// carry `code` and `message`. Whatever else the server includes for a
/// given type is preserved in [`ServerMessage::data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    /// Message discriminator.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Error code, present on error frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable description, present on error frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Type-specific payload fields.
    #[serde(flatten)]
    pub data: serde_json::Map<String, Value>,
}

impl ServerMessage {
    /// Parses a raw text frame into a message envelope.
    pub fn parse(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::serialization(format!("malformed realtime frame: {e}")))
    }

    /// Returns whether this is a server-reported error frame.
    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }

    /// Returns the error code, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Returns whether this frame signals a rejected credential.
    pub fn is_auth_failure(&self) -> bool {
        self.is_error() && self.error_code() == Some(AUTH_FAILED_CODE)
    }

    /// Looks up a type-specific payload field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Messages sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keep-alive probe.
    Ping,
}
