// Public modules
pub mod chat;
pub mod message;
pub mod model_entry;
pub mod project;
pub mod provider_config;
pub mod request_format;
pub mod request_options;

// Re-exports
pub use chat::{Chat, ChatUpdate, ExportFormat, TITLE_PLACEHOLDER};
pub use message::{Message, MessagePatch, MessageRole, WireMessage};
pub use model_entry::AggregatedModel;
pub use project::{Project, ProjectUpdate};
pub use provider_config::{ModelInfo, ProviderConfig, ProviderUpdate};
pub use request_format::RequestFormat;
pub use request_options::RequestOptions;
