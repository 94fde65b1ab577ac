use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::provider_config::DEFAULT_COLOR;
use crate::utils;

const DEFAULT_NAME: &str = "New Project";
const DEFAULT_ICON: &str = "📁";

/// A named group of related chats.
///
/// Chats point at projects through a soft reference; the project itself
/// knows nothing about its members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique project id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Accent color for UI listings.
    #[serde(default)]
    pub color: String,

    /// Display icon.
    #[serde(default)]
    pub icon: String,

    /// Unix-millisecond creation time.
    pub created_at: i64,

    /// Unix-millisecond time of the last mutation.
    pub updated_at: i64,

    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Project {
    /// Create a project with a generated id and defaults.
    pub fn new() -> Self {
        let now = utils::time::now_ms();
        Self {
            id: utils::id::fresh("project"),
            name: DEFAULT_NAME.to_string(),
            description: String::new(),
            color: DEFAULT_COLOR.to_string(),
            icon: DEFAULT_ICON.to_string(),
            created_at: now,
            updated_at: now,
            metadata: Map::new(),
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the accent color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Sets the icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Apply a field-level patch and refresh `updated_at`.
    pub fn apply(&mut self, update: ProjectUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(color) = update.color {
            self.color = color;
        }
        if let Some(icon) = update.icon {
            self.icon = icon;
        }
        if let Some(metadata) = update.metadata {
            self.metadata = metadata;
        }
        self.updated_at = utils::time::now_ms();
    }

    /// A copy with a fresh id, `" (Copy)"` appended to the name, and fresh
    /// created/updated times.
    pub fn duplicate(&self) -> Self {
        let now = utils::time::now_ms();
        let mut copy = self.clone();
        copy.id = utils::id::fresh("project");
        copy.name = format!("{} (Copy)", self.name);
        copy.created_at = now;
        copy.updated_at = now;
        copy
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

/// Field-level patch for a project. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    /// Replacement name.
    pub name: Option<String>,

    /// Replacement description.
    pub description: Option<String>,

    /// Replacement accent color.
    pub color: Option<String>,

    /// Replacement icon.
    pub icon: Option<String>,

    /// Replacement metadata map.
    pub metadata: Option<Map<String, Value>>,
}
