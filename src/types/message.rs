use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role type for a conversation message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System role.
    System,

    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl MessageRole {
    /// The lowercase wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message inside a chat.
///
/// The timestamp doubles as the message's identity within its chat: it is
/// unique there and monotonically non-decreasing in append order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// The role of the message.
    pub role: MessageRole,

    /// The text content of the message.
    pub content: String,

    /// Unix-millisecond timestamp; the identity key within a chat.
    pub timestamp: i64,

    /// Free-form metadata attached at append time.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Message {
    /// Create a new `Message` with the given role, content, and timestamp.
    pub fn new(role: MessageRole, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
            metadata: Map::new(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>, timestamp: i64) -> Self {
        Self::new(MessageRole::User, content, timestamp)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>, timestamp: i64) -> Self {
        Self::new(MessageRole::Assistant, content, timestamp)
    }
}

/// Field-level patch for an existing message.
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    /// Replacement content.
    pub content: Option<String>,

    /// Replacement metadata map.
    pub metadata: Option<Map<String, Value>>,
}

impl MessagePatch {
    /// A patch that replaces the message content.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            metadata: None,
        }
    }
}

/// The `(role, content)` projection of a message as it crosses the wire.
///
/// Timestamps and metadata never leave the process.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireMessage {
    /// The role of the message.
    pub role: MessageRole,

    /// The text content of the message.
    pub content: String,
}

impl WireMessage {
    /// Create a new `WireMessage`.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self::new(message.role, message.content.clone())
    }
}
