//! The persistence port and an in-memory reference implementation.
//!
//! Durability is an external concern: the managers only assume the
//! capability set below, with upsert-by-id semantics and per-store key
//! uniqueness. Nothing here is transactional across stores; a crash between
//! two related writes can leave them inconsistent, which the callers accept.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};

/// Store holding provider configs.
pub const PROVIDERS_STORE: &str = "providers";

/// Store holding chats.
pub const CHATS_STORE: &str = "chats";

/// Store holding projects.
pub const PROJECTS_STORE: &str = "projects";

/// Settings key for the active provider id.
pub const ACTIVE_PROVIDER_KEY: &str = "activeProvider";

/// Settings key for the current chat id.
pub const CURRENT_CHAT_KEY: &str = "currentChat";

/// Settings key for the current project id.
pub const CURRENT_PROJECT_KEY: &str = "currentProject";

/// The generic persistent key-value store the managers depend on.
///
/// Items are JSON documents keyed by their top-level `"id"` string. `put` is
/// an idempotent upsert. Every operation may fail with [`Error::Storage`],
/// which propagates to the caller without retry.
#[async_trait]
pub trait Storage: Send + Sync {
    /// All items in a store, in unspecified but stable order.
    async fn get_all(&self, store: &str) -> Result<Vec<Value>>;

    /// One item by id, or `None` when absent.
    async fn get(&self, store: &str, id: &str) -> Result<Option<Value>>;

    /// Insert or replace an item, keyed by its `"id"` field.
    async fn put(&self, store: &str, item: Value) -> Result<()>;

    /// Remove an item by id. Removing an absent id succeeds.
    async fn delete(&self, store: &str, id: &str) -> Result<()>;

    /// All items whose top-level `index` field equals `value`.
    async fn get_by_index(&self, store: &str, index: &str, value: &Value) -> Result<Vec<Value>>;

    /// A setting value, or `None` when unset.
    async fn get_setting(&self, key: &str) -> Result<Option<Value>>;

    /// Set a setting value. `Value::Null` clears it.
    async fn set_setting(&self, key: &str, value: Value) -> Result<()>;
}

/// Extract the `"id"` field an item is keyed by.
fn item_id(item: &Value) -> Result<String> {
    item.get("id")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| Error::storage("item is missing a string \"id\" field", None))
}

#[derive(Default)]
struct MemoryInner {
    stores: BTreeMap<String, BTreeMap<String, Value>>,
    settings: BTreeMap<String, Value>,
}

/// An in-memory [`Storage`] implementation.
///
/// Mirrors the capability set of a durable document store for tests and
/// ephemeral sessions. Iteration order is id order, so `get_all` is
/// deterministic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| Error::storage("memory store lock poisoned", None))
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn get_all(&self, store: &str) -> Result<Vec<Value>> {
        let inner = self.lock()?;
        Ok(inner
            .stores
            .get(store)
            .map(|s| s.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, store: &str, id: &str) -> Result<Option<Value>> {
        let inner = self.lock()?;
        Ok(inner.stores.get(store).and_then(|s| s.get(id)).cloned())
    }

    async fn put(&self, store: &str, item: Value) -> Result<()> {
        let id = item_id(&item)?;
        let mut inner = self.lock()?;
        inner.stores.entry(store.to_string()).or_default().insert(id, item);
        Ok(())
    }

    async fn delete(&self, store: &str, id: &str) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(s) = inner.stores.get_mut(store) {
            s.remove(id);
        }
        Ok(())
    }

    async fn get_by_index(&self, store: &str, index: &str, value: &Value) -> Result<Vec<Value>> {
        let inner = self.lock()?;
        Ok(inner
            .stores
            .get(store)
            .map(|s| {
                s.values()
                    .filter(|item| item.get(index) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        let inner = self.lock()?;
        Ok(match inner.settings.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.clone()),
        })
    }

    async fn set_setting(&self, key: &str, value: Value) -> Result<()> {
        let mut inner = self.lock()?;
        if value.is_null() {
            inner.settings.remove(key);
        } else {
            inner.settings.insert(key.to_string(), value);
        }
        Ok(())
    }
}
