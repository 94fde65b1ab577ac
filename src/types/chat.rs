use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::{Message, MessagePatch, MessageRole, WireMessage};
use crate::utils;

/// Title given to a chat before one is inferred from its first user message.
pub const TITLE_PLACEHOLDER: &str = "New Chat";

/// Maximum inferred title length before truncation.
const TITLE_MAX_LEN: usize = 50;

/// Default sampling temperature for new chats.
const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Output format for [`Chat::export`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON of the full entity.
    Json,

    /// A markdown transcript with role headers.
    Markdown,

    /// A plain-text transcript with rule separators.
    Text,
}

/// One conversation: an ordered message list plus its settings.
///
/// Mutations go through the entity methods (or [`crate::chats::ChatManager`])
/// so `updated_at` and the title/timestamp invariants stay correct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Unique chat id.
    pub id: String,

    /// Display title; inferred from the first user message while it still
    /// carries the placeholder.
    pub title: String,

    /// Ordered message sequence. Timestamps are unique and non-decreasing.
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Soft reference to a project. A dangling id is treated as no project.
    #[serde(default)]
    pub project_id: Option<String>,

    /// System prompt prepended to requests; overrides stored system messages.
    #[serde(default)]
    pub system_prompt: String,

    /// Sampling temperature for requests from this chat.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Unix-millisecond creation time.
    pub created_at: i64,

    /// Unix-millisecond time of the last mutation.
    pub updated_at: i64,

    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

impl Chat {
    /// Create an empty chat with a generated id and defaults.
    pub fn new() -> Self {
        let now = utils::time::now_ms();
        Self {
            id: utils::id::fresh("chat"),
            title: TITLE_PLACEHOLDER.to_string(),
            messages: Vec::new(),
            project_id: None,
            system_prompt: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            created_at: now,
            updated_at: now,
            metadata: Map::new(),
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the project reference.
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Append a message with a fresh timestamp and refresh `updated_at`.
    ///
    /// The timestamp is bumped past the previous message's when the clock
    /// has not advanced, keeping timestamps unique within the chat. The
    /// title is inferred from the first user message while the placeholder
    /// is still in place.
    pub fn add_message(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Message {
        let mut timestamp = utils::time::now_ms();
        if let Some(last) = self.messages.last() {
            if timestamp <= last.timestamp {
                timestamp = last.timestamp + 1;
            }
        }

        let mut message = Message::new(role, content, timestamp);
        message.metadata = metadata;

        if self.title == TITLE_PLACEHOLDER
            && role == MessageRole::User
            && self.message_count(Some(MessageRole::User)) == 0
        {
            self.title = infer_title(&message.content);
        }

        self.messages.push(message.clone());
        self.updated_at = utils::time::now_ms();
        message
    }

    /// Patch the message with the given timestamp. Silently a no-op when no
    /// message matches.
    pub fn update_message(&mut self, timestamp: i64, patch: MessagePatch) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.timestamp == timestamp) {
            if let Some(content) = patch.content {
                message.content = content;
            }
            if let Some(metadata) = patch.metadata {
                message.metadata = metadata;
            }
            self.updated_at = utils::time::now_ms();
        }
    }

    /// Remove the message with the given timestamp. Always succeeds.
    pub fn delete_message(&mut self, timestamp: i64) {
        self.messages.retain(|m| m.timestamp != timestamp);
        self.updated_at = utils::time::now_ms();
    }

    /// Remove every message.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.updated_at = utils::time::now_ms();
    }

    /// Number of messages, optionally restricted to one role.
    pub fn message_count(&self, role: Option<MessageRole>) -> usize {
        match role {
            Some(role) => self.messages.iter().filter(|m| m.role == role).count(),
            None => self.messages.len(),
        }
    }

    /// The most recently appended message.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The ordered `(role, content)` projection sent upstream.
    ///
    /// A non-empty system prompt is prepended as a system message and wins
    /// over any system messages stored in the history.
    pub fn wire_messages(&self) -> Vec<WireMessage> {
        if self.system_prompt.is_empty() {
            self.messages.iter().map(WireMessage::from).collect()
        } else {
            let mut wire = vec![WireMessage::new(
                MessageRole::System,
                self.system_prompt.clone(),
            )];
            wire.extend(
                self.messages
                    .iter()
                    .filter(|m| m.role != MessageRole::System)
                    .map(WireMessage::from),
            );
            wire
        }
    }

    /// A copy with a fresh id, `" (Copy)"` appended to the title, and fresh
    /// created/updated times.
    pub fn duplicate(&self) -> Self {
        let now = utils::time::now_ms();
        let mut copy = self.clone();
        copy.id = utils::id::fresh("chat");
        copy.title = format!("{} (Copy)", self.title);
        copy.created_at = now;
        copy.updated_at = now;
        copy
    }

    /// Render the chat in the given export format.
    ///
    /// System messages are omitted from markdown and text transcripts.
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Markdown => {
                let mut md = format!(
                    "# {}\n\nCreated: {}\nUpdated: {}\n\n---\n\n",
                    self.title,
                    utils::time::rfc3339(self.created_at),
                    utils::time::rfc3339(self.updated_at),
                );
                for message in &self.messages {
                    if message.role == MessageRole::System {
                        continue;
                    }
                    let role = if message.role == MessageRole::User {
                        "👤 User"
                    } else {
                        "🤖 Assistant"
                    };
                    md.push_str(&format!("### {role}\n\n{}\n\n", message.content));
                }
                Ok(md)
            }
            ExportFormat::Text => {
                let mut text = format!(
                    "{}\nCreated: {}\nUpdated: {}\n\n{}\n\n",
                    self.title,
                    utils::time::rfc3339(self.created_at),
                    utils::time::rfc3339(self.updated_at),
                    "=".repeat(50),
                );
                for message in &self.messages {
                    if message.role == MessageRole::System {
                        continue;
                    }
                    let role = if message.role == MessageRole::User {
                        "User"
                    } else {
                        "Assistant"
                    };
                    text.push_str(&format!(
                        "{role}:\n{}\n\n{}\n\n",
                        message.content,
                        "-".repeat(50)
                    ));
                }
                Ok(text)
            }
        }
    }

    /// Apply a field-level patch and refresh `updated_at`.
    pub fn apply(&mut self, update: ChatUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(project_id) = update.project_id {
            self.project_id = project_id;
        }
        if let Some(system_prompt) = update.system_prompt {
            self.system_prompt = system_prompt;
        }
        if let Some(temperature) = update.temperature {
            self.temperature = temperature;
        }
        if let Some(metadata) = update.metadata {
            self.metadata = metadata;
        }
        self.updated_at = utils::time::now_ms();
    }
}

impl Default for Chat {
    fn default() -> Self {
        Self::new()
    }
}

/// Infer a chat title from the first user message.
///
/// Markdown marker characters are stripped, the result trimmed, and long
/// titles truncated to fifty characters plus an ellipsis.
fn infer_title(content: &str) -> String {
    let stripped: String = content
        .chars()
        .filter(|c| !matches!(c, '#' | '*' | '_' | '`'))
        .collect();
    let trimmed = stripped.trim();
    let title = if trimmed.chars().count() > TITLE_MAX_LEN {
        let truncated: String = trimmed.chars().take(TITLE_MAX_LEN).collect();
        format!("{truncated}...")
    } else {
        trimmed.to_string()
    };
    if title.is_empty() {
        TITLE_PLACEHOLDER.to_string()
    } else {
        title
    }
}

/// Field-level patch for a chat.
///
/// Absent fields are left untouched; `project_id` is doubly optional so a
/// patch can detach the chat from its project.
#[derive(Debug, Clone, Default)]
pub struct ChatUpdate {
    /// Replacement title.
    pub title: Option<String>,

    /// Set (`Some(Some(_))`) or clear (`Some(None)`) the project reference.
    pub project_id: Option<Option<String>>,

    /// Replacement system prompt.
    pub system_prompt: Option<String>,

    /// Replacement temperature.
    pub temperature: Option<f64>,

    /// Replacement metadata map.
    pub metadata: Option<Map<String, Value>>,
}
