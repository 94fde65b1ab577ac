// Public modules
pub mod catalog;
pub mod chats;
pub mod error;
pub mod observability;
pub mod projects;
pub mod registry;
pub mod sse;
pub mod storage;
pub mod translate;
pub mod types;
pub mod utils;

// Re-exports
pub use chats::{ChatManager, ChatStatistics};
pub use error::{Error, Result};
pub use projects::{ProjectManager, ProjectStatistics};
pub use registry::ProviderRegistry;
pub use sse::{DeltaStream, decode_deltas};
pub use storage::{MemoryStore, Storage};
pub use translate::{RequestTransform, TransformRegistry};
pub use types::*;
