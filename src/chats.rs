//! Chat ownership and the current-chat invariant.
//!
//! The manager owns the chat collection and the single "current" selection,
//! persisting every mutation through the storage port. Among a non-empty
//! chat set exactly one chat is current; deleting the last chat creates a
//! fresh one rather than leaving the selection empty.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::storage::{CHATS_STORE, CURRENT_CHAT_KEY, Storage};
use crate::types::{Chat, ChatUpdate, ExportFormat, Message, MessagePatch, MessageRole};
use crate::utils;

/// Aggregate counts across every chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStatistics {
    /// Number of chats.
    pub total_chats: usize,

    /// Number of messages across all chats.
    pub total_messages: usize,

    /// Number of user messages across all chats.
    pub user_messages: usize,

    /// Number of assistant messages across all chats.
    pub assistant_messages: usize,

    /// Earliest chat creation time, unix ms. `None` without chats.
    pub oldest_chat: Option<i64>,

    /// Latest chat creation time, unix ms. `None` without chats.
    pub newest_chat: Option<i64>,
}

/// Owns chats, message mutation, and the current-chat selection.
pub struct ChatManager {
    chats: BTreeMap<String, Chat>,
    current_chat_id: Option<String>,
    storage: Arc<dyn Storage>,
}

impl ChatManager {
    /// Create a manager backed by the given storage port.
    ///
    /// Call [`ChatManager::init`] before use to load persisted chats.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            chats: BTreeMap::new(),
            current_chat_id: None,
            storage,
        }
    }

    /// Load persisted chats and the current selection.
    ///
    /// When no current chat was persisted, or the persisted id no longer
    /// resolves, a fresh default chat is created and made current.
    pub async fn init(&mut self) -> Result<()> {
        for value in self.storage.get_all(CHATS_STORE).await? {
            let chat: Chat = serde_json::from_value(value)?;
            self.chats.insert(chat.id.clone(), chat);
        }

        self.current_chat_id = self
            .storage
            .get_setting(CURRENT_CHAT_KEY)
            .await?
            .as_ref()
            .and_then(Value::as_str)
            .map(String::from);

        let dangling = match &self.current_chat_id {
            Some(id) => !self.chats.contains_key(id),
            None => true,
        };
        if dangling {
            self.create_chat(Chat::new()).await?;
        }

        Ok(())
    }

    /// Persist a chat, insert it, and make it current.
    pub async fn create_chat(&mut self, chat: Chat) -> Result<Chat> {
        self.storage
            .put(CHATS_STORE, serde_json::to_value(&chat)?)
            .await?;
        self.storage
            .set_setting(CURRENT_CHAT_KEY, Value::String(chat.id.clone()))
            .await?;
        self.current_chat_id = Some(chat.id.clone());
        self.chats.insert(chat.id.clone(), chat.clone());
        Ok(chat)
    }

    /// Every chat, most recently updated first.
    pub fn all(&self) -> Vec<&Chat> {
        let mut chats: Vec<&Chat> = self.chats.values().collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        chats
    }

    /// One chat by id.
    pub fn get(&self, id: &str) -> Option<&Chat> {
        self.chats.get(id)
    }

    /// Chats referencing a project, most recently updated first.
    pub fn by_project(&self, project_id: &str) -> Vec<&Chat> {
        let mut chats: Vec<&Chat> = self
            .chats
            .values()
            .filter(|c| c.project_id.as_deref() == Some(project_id))
            .collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        chats
    }

    /// The current chat, if the selection resolves.
    pub fn current(&self) -> Option<&Chat> {
        self.current_chat_id
            .as_deref()
            .and_then(|id| self.chats.get(id))
    }

    /// The current chat id.
    pub fn current_chat_id(&self) -> Option<&str> {
        self.current_chat_id.as_deref()
    }

    /// Select the current chat and persist the choice.
    pub async fn set_current(&mut self, id: &str) -> Result<()> {
        if !self.chats.contains_key(id) {
            return Err(Self::chat_not_found(id));
        }
        self.storage
            .set_setting(CURRENT_CHAT_KEY, Value::String(id.to_string()))
            .await?;
        self.current_chat_id = Some(id.to_string());
        Ok(())
    }

    /// Apply a field-level patch to a chat and persist it.
    pub async fn update_chat(&mut self, id: &str, update: ChatUpdate) -> Result<Chat> {
        let chat = self
            .chats
            .get_mut(id)
            .ok_or_else(|| Self::chat_not_found(id))?;
        chat.apply(update);
        let chat = chat.clone();
        self.persist(&chat).await?;
        Ok(chat)
    }

    /// Append a message to a chat and persist it.
    ///
    /// The chat's title is inferred from the first user message while the
    /// placeholder title is still in place.
    pub async fn add_message(
        &mut self,
        chat_id: &str,
        role: MessageRole,
        content: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Result<Message> {
        let chat = self
            .chats
            .get_mut(chat_id)
            .ok_or_else(|| Self::chat_not_found(chat_id))?;
        let message = chat.add_message(role, content, metadata);
        let chat = chat.clone();
        self.persist(&chat).await?;
        Ok(message)
    }

    /// Patch the message with the given timestamp. A missing message is a
    /// silent no-op; a missing chat is an error.
    pub async fn update_message(
        &mut self,
        chat_id: &str,
        timestamp: i64,
        patch: MessagePatch,
    ) -> Result<()> {
        let chat = self
            .chats
            .get_mut(chat_id)
            .ok_or_else(|| Self::chat_not_found(chat_id))?;
        chat.update_message(timestamp, patch);
        let chat = chat.clone();
        self.persist(&chat).await
    }

    /// Remove the message with the given timestamp. Always succeeds for a
    /// known chat.
    pub async fn delete_message(&mut self, chat_id: &str, timestamp: i64) -> Result<()> {
        let chat = self
            .chats
            .get_mut(chat_id)
            .ok_or_else(|| Self::chat_not_found(chat_id))?;
        chat.delete_message(timestamp);
        let chat = chat.clone();
        self.persist(&chat).await
    }

    /// Remove every message from a chat.
    pub async fn clear_messages(&mut self, chat_id: &str) -> Result<()> {
        let chat = self
            .chats
            .get_mut(chat_id)
            .ok_or_else(|| Self::chat_not_found(chat_id))?;
        chat.clear_messages();
        let chat = chat.clone();
        self.persist(&chat).await
    }

    /// Drive a delta stream into one assistant message.
    ///
    /// The message is appended on the first delta and extended in place per
    /// subsequent delta; the chat is persisted once, when the stream
    /// completes. A transport error propagates after the partial content has
    /// been recorded in memory. Returns `None` when the stream yielded no
    /// deltas.
    pub async fn stream_reply<S>(&mut self, chat_id: &str, deltas: S) -> Result<Option<Message>>
    where
        S: Stream<Item = Result<String>>,
    {
        let chat = self
            .chats
            .get_mut(chat_id)
            .ok_or_else(|| Self::chat_not_found(chat_id))?;

        futures::pin_mut!(deltas);
        let mut reply_timestamp: Option<i64> = None;
        while let Some(item) = deltas.next().await {
            let delta = item?;
            match reply_timestamp {
                None => {
                    let message = chat.add_message(MessageRole::Assistant, delta, Map::new());
                    reply_timestamp = Some(message.timestamp);
                }
                Some(timestamp) => {
                    if let Some(message) =
                        chat.messages.iter_mut().find(|m| m.timestamp == timestamp)
                    {
                        message.content.push_str(&delta);
                    }
                }
            }
        }

        chat.updated_at = utils::time::now_ms();
        let reply = reply_timestamp
            .and_then(|t| chat.messages.iter().find(|m| m.timestamp == t))
            .cloned();
        let chat = chat.clone();
        self.persist(&chat).await?;
        Ok(reply)
    }

    /// Remove a chat and repair the current selection.
    ///
    /// Deleting the current chat promotes the most recently updated
    /// remaining chat; deleting the last chat creates a fresh one.
    pub async fn delete_chat(&mut self, id: &str) -> Result<()> {
        if !self.chats.contains_key(id) {
            return Err(Self::chat_not_found(id));
        }

        self.chats.remove(id);
        self.storage.delete(CHATS_STORE, id).await?;

        if self.current_chat_id.as_deref() == Some(id) {
            let next = self.all().first().map(|c| c.id.clone());
            match next {
                Some(next) => self.set_current(&next).await?,
                None => {
                    self.create_chat(Chat::new()).await?;
                }
            }
        }

        Ok(())
    }

    /// Case-insensitive substring search over titles and message contents,
    /// most recently updated first.
    pub fn search(&self, query: &str) -> Vec<&Chat> {
        let query = query.to_lowercase();
        self.all()
            .into_iter()
            .filter(|chat| {
                chat.title.to_lowercase().contains(&query)
                    || chat
                        .messages
                        .iter()
                        .any(|m| m.content.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// Render one chat in the given export format.
    pub fn export(&self, chat_id: &str, format: ExportFormat) -> Result<String> {
        let chat = self
            .chats
            .get(chat_id)
            .ok_or_else(|| Self::chat_not_found(chat_id))?;
        chat.export(format)
    }

    /// Aggregate counts across every chat.
    pub fn statistics(&self) -> ChatStatistics {
        let total_messages = self.chats.values().map(|c| c.messages.len()).sum();
        let user_messages = self
            .chats
            .values()
            .map(|c| c.message_count(Some(MessageRole::User)))
            .sum();
        let assistant_messages = self
            .chats
            .values()
            .map(|c| c.message_count(Some(MessageRole::Assistant)))
            .sum();
        ChatStatistics {
            total_chats: self.chats.len(),
            total_messages,
            user_messages,
            assistant_messages,
            oldest_chat: self.chats.values().map(|c| c.created_at).min(),
            newest_chat: self.chats.values().map(|c| c.created_at).max(),
        }
    }

    async fn persist(&self, chat: &Chat) -> Result<()> {
        self.storage
            .put(CHATS_STORE, serde_json::to_value(chat)?)
            .await
    }

    fn chat_not_found(id: &str) -> Error {
        Error::not_found(
            "chat does not exist",
            Some("chat".to_string()),
            Some(id.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use futures::stream;

    async fn manager() -> ChatManager {
        let storage = Arc::new(MemoryStore::new());
        let mut manager = ChatManager::new(storage);
        manager.init().await.unwrap();
        manager
    }

    #[tokio::test]
    async fn init_creates_a_current_chat() {
        let manager = manager().await;
        assert_eq!(manager.all().len(), 1);
        assert!(manager.current().is_some());
    }

    #[tokio::test]
    async fn init_reloads_persisted_chats() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStore::new());
        let mut manager = ChatManager::new(Arc::clone(&storage));
        manager.init().await.unwrap();
        let chat = manager.create_chat(Chat::new().with_title("kept")).await.unwrap();
        manager
            .add_message(&chat.id, MessageRole::User, "remember me", Map::new())
            .await
            .unwrap();

        let mut reloaded = ChatManager::new(storage);
        reloaded.init().await.unwrap();
        let kept = reloaded.get(&chat.id).unwrap();
        assert_eq!(kept.messages.len(), 1);
        assert_eq!(reloaded.current_chat_id(), Some(chat.id.as_str()));
        assert_eq!(reloaded.all().len(), 2);
    }

    #[tokio::test]
    async fn create_chat_becomes_current() {
        let mut manager = manager().await;
        let chat = manager.create_chat(Chat::new()).await.unwrap();
        assert_eq!(manager.current_chat_id(), Some(chat.id.as_str()));
    }

    #[tokio::test]
    async fn set_current_unknown_is_not_found() {
        let mut manager = manager().await;
        let err = manager.set_current("chat_ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_current_chat_promotes_most_recent() {
        let mut manager = manager().await;
        let first = manager.create_chat(Chat::new()).await.unwrap();
        let second = manager.create_chat(Chat::new()).await.unwrap();
        // Updated-at has millisecond resolution; make "most recent"
        // unambiguous before relying on it.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        manager
            .add_message(&first.id, MessageRole::User, "bump", Map::new())
            .await
            .unwrap();

        manager.delete_chat(&second.id).await.unwrap();
        assert_eq!(manager.current_chat_id(), Some(first.id.as_str()));
    }

    #[tokio::test]
    async fn deleting_last_chat_creates_a_fresh_one() {
        let mut manager = manager().await;
        let only = manager.current().unwrap().id.clone();
        manager.delete_chat(&only).await.unwrap();

        assert_eq!(manager.all().len(), 1);
        let fresh = manager.current().unwrap();
        assert_ne!(fresh.id, only);
        assert!(fresh.messages.is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_chat_is_not_found() {
        let mut manager = manager().await;
        let err = manager.delete_chat("chat_ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn search_matches_title_and_content() {
        let mut manager = manager().await;
        let budget = manager
            .create_chat(Chat::new().with_title("Budget planning"))
            .await
            .unwrap();
        let recipes = manager.create_chat(Chat::new()).await.unwrap();
        manager
            .add_message(&recipes.id, MessageRole::User, "how do I braise leeks?", Map::new())
            .await
            .unwrap();

        let hits = manager.search("BUDGET");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, budget.id);

        let hits = manager.search("braise");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, recipes.id);

        assert!(manager.search("nothing matches this").is_empty());
    }

    #[tokio::test]
    async fn statistics_count_roles_and_extremes() {
        let mut manager = manager().await;
        let chat = manager.current().unwrap().id.clone();
        manager
            .add_message(&chat, MessageRole::User, "q1", Map::new())
            .await
            .unwrap();
        manager
            .add_message(&chat, MessageRole::Assistant, "a1", Map::new())
            .await
            .unwrap();
        manager
            .add_message(&chat, MessageRole::User, "q2", Map::new())
            .await
            .unwrap();

        let stats = manager.statistics();
        assert_eq!(stats.total_chats, 1);
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.user_messages, 2);
        assert_eq!(stats.assistant_messages, 1);
        assert!(stats.oldest_chat.is_some());
        assert_eq!(stats.oldest_chat, stats.newest_chat);
    }

    #[tokio::test]
    async fn stream_reply_accumulates_one_assistant_message() {
        let mut manager = manager().await;
        let chat_id = manager.current().unwrap().id.clone();

        let deltas = stream::iter(vec![
            Ok("Hel".to_string()),
            Ok("lo".to_string()),
            Ok(" there".to_string()),
        ]);
        let reply = manager.stream_reply(&chat_id, deltas).await.unwrap().unwrap();
        assert_eq!(reply.role, MessageRole::Assistant);
        assert_eq!(reply.content, "Hello there");

        let chat = manager.get(&chat_id).unwrap();
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].content, "Hello there");
    }

    #[tokio::test]
    async fn stream_reply_empty_stream_appends_nothing() {
        let mut manager = manager().await;
        let chat_id = manager.current().unwrap().id.clone();

        let deltas = stream::iter(Vec::<Result<String>>::new());
        let reply = manager.stream_reply(&chat_id, deltas).await.unwrap();
        assert!(reply.is_none());
        assert!(manager.get(&chat_id).unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn stream_reply_error_keeps_partial_in_memory() {
        let mut manager = manager().await;
        let chat_id = manager.current().unwrap().id.clone();

        let deltas = stream::iter(vec![
            Ok("partial".to_string()),
            Err(Error::streaming("connection reset", None)),
        ]);
        let err = manager.stream_reply(&chat_id, deltas).await.unwrap_err();
        assert!(err.is_streaming());

        let chat = manager.get(&chat_id).unwrap();
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].content, "partial");
    }

    #[tokio::test]
    async fn message_mutation_round_trip() {
        let mut manager = manager().await;
        let chat_id = manager.current().unwrap().id.clone();
        let message = manager
            .add_message(&chat_id, MessageRole::User, "helo", Map::new())
            .await
            .unwrap();

        manager
            .update_message(&chat_id, message.timestamp, MessagePatch::content("hello"))
            .await
            .unwrap();
        assert_eq!(manager.get(&chat_id).unwrap().messages[0].content, "hello");

        manager
            .delete_message(&chat_id, message.timestamp)
            .await
            .unwrap();
        assert!(manager.get(&chat_id).unwrap().messages.is_empty());

        let err = manager
            .update_message("chat_ghost", 0, MessagePatch::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_chat_patches_fields() {
        let mut manager = manager().await;
        let chat_id = manager.current().unwrap().id.clone();
        let updated = manager
            .update_chat(
                &chat_id,
                ChatUpdate {
                    title: Some("Renamed".to_string()),
                    temperature: Some(0.2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.temperature, 0.2);
    }

    #[tokio::test]
    async fn export_unknown_chat_is_not_found() {
        let manager = manager().await;
        let err = manager.export("chat_ghost", ExportFormat::Json).unwrap_err();
        assert!(err.is_not_found());
    }
}
