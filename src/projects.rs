//! Project ownership and the cascade policy toward dependent chats.
//!
//! Projects group chats through a soft reference on the chat side. Deleting
//! a project either cascades through the chat manager (each chat deletion
//! runs its own current-chat repair) or detaches the chats by clearing
//! their references.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chats::ChatManager;
use crate::error::{Error, Result};
use crate::storage::{CURRENT_PROJECT_KEY, PROJECTS_STORE, Storage};
use crate::types::{ChatUpdate, Project, ProjectUpdate};

/// Aggregate counts for one project's chats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatistics {
    /// Number of chats referencing the project.
    pub total_chats: usize,

    /// Number of messages across those chats.
    pub total_messages: usize,

    /// Latest `updated_at` among those chats. `None` without chats.
    pub last_updated: Option<i64>,
}

/// Owns projects and the current-project selection.
pub struct ProjectManager {
    projects: BTreeMap<String, Project>,
    current_project_id: Option<String>,
    storage: Arc<dyn Storage>,
}

impl ProjectManager {
    /// Create a manager backed by the given storage port.
    ///
    /// Call [`ProjectManager::init`] before use to load persisted projects.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            projects: BTreeMap::new(),
            current_project_id: None,
            storage,
        }
    }

    /// Load persisted projects and the current selection, which may stay
    /// empty.
    pub async fn init(&mut self) -> Result<()> {
        for value in self.storage.get_all(PROJECTS_STORE).await? {
            let project: Project = serde_json::from_value(value)?;
            self.projects.insert(project.id.clone(), project);
        }

        self.current_project_id = self
            .storage
            .get_setting(CURRENT_PROJECT_KEY)
            .await?
            .as_ref()
            .and_then(Value::as_str)
            .map(String::from);

        Ok(())
    }

    /// Persist and insert a project.
    pub async fn create_project(&mut self, project: Project) -> Result<Project> {
        self.storage
            .put(PROJECTS_STORE, serde_json::to_value(&project)?)
            .await?;
        self.projects.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    /// Every project, most recently updated first.
    pub fn all(&self) -> Vec<&Project> {
        let mut projects: Vec<&Project> = self.projects.values().collect();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        projects
    }

    /// One project by id.
    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.get(id)
    }

    /// The current project, if one is selected.
    pub fn current(&self) -> Option<&Project> {
        self.current_project_id
            .as_deref()
            .and_then(|id| self.projects.get(id))
    }

    /// The current project id, if one is selected.
    pub fn current_project_id(&self) -> Option<&str> {
        self.current_project_id.as_deref()
    }

    /// Select the current project, or clear the selection with `None`.
    pub async fn set_current(&mut self, id: Option<&str>) -> Result<()> {
        if let Some(id) = id {
            if !self.projects.contains_key(id) {
                return Err(Self::project_not_found(id));
            }
            self.storage
                .set_setting(CURRENT_PROJECT_KEY, Value::String(id.to_string()))
                .await?;
            self.current_project_id = Some(id.to_string());
        } else {
            self.storage
                .set_setting(CURRENT_PROJECT_KEY, Value::Null)
                .await?;
            self.current_project_id = None;
        }
        Ok(())
    }

    /// Apply a field-level patch to a project and persist it.
    pub async fn update_project(&mut self, id: &str, update: ProjectUpdate) -> Result<Project> {
        let project = self
            .projects
            .get_mut(id)
            .ok_or_else(|| Self::project_not_found(id))?;
        project.apply(update);
        let project = project.clone();
        self.storage
            .put(PROJECTS_STORE, serde_json::to_value(&project)?)
            .await?;
        Ok(project)
    }

    /// Remove a project, applying the cascade policy to its chats.
    ///
    /// With `cascade_delete_chats` every chat referencing the project is
    /// deleted through the chat manager; otherwise each such chat has its
    /// reference cleared. The current-project selection is cleared, never
    /// reassigned, when the deleted project was current.
    pub async fn delete_project(
        &mut self,
        id: &str,
        cascade_delete_chats: bool,
        chats: &mut ChatManager,
    ) -> Result<()> {
        if !self.projects.contains_key(id) {
            return Err(Self::project_not_found(id));
        }

        let member_ids: Vec<String> = chats.by_project(id).iter().map(|c| c.id.clone()).collect();
        if cascade_delete_chats {
            for chat_id in member_ids {
                chats.delete_chat(&chat_id).await?;
            }
        } else {
            for chat_id in member_ids {
                chats
                    .update_chat(
                        &chat_id,
                        ChatUpdate {
                            project_id: Some(None),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
        }

        self.projects.remove(id);
        self.storage.delete(PROJECTS_STORE, id).await?;

        if self.current_project_id.as_deref() == Some(id) {
            self.storage
                .set_setting(CURRENT_PROJECT_KEY, Value::Null)
                .await?;
            self.current_project_id = None;
        }

        Ok(())
    }

    /// Aggregate counts for one project's chats.
    pub fn project_stats(&self, project_id: &str, chats: &ChatManager) -> ProjectStatistics {
        let members = chats.by_project(project_id);
        ProjectStatistics {
            total_chats: members.len(),
            total_messages: members.iter().map(|c| c.messages.len()).sum(),
            last_updated: members.iter().map(|c| c.updated_at).max(),
        }
    }

    /// Case-insensitive substring search over names and descriptions, most
    /// recently updated first.
    pub fn search(&self, query: &str) -> Vec<&Project> {
        let query = query.to_lowercase();
        self.all()
            .into_iter()
            .filter(|project| {
                project.name.to_lowercase().contains(&query)
                    || project.description.to_lowercase().contains(&query)
            })
            .collect()
    }

    fn project_not_found(id: &str) -> Error {
        Error::not_found(
            "project does not exist",
            Some("project".to_string()),
            Some(id.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::Chat;

    async fn managers() -> (ProjectManager, ChatManager) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStore::new());
        let mut projects = ProjectManager::new(Arc::clone(&storage));
        projects.init().await.unwrap();
        let mut chats = ChatManager::new(storage);
        chats.init().await.unwrap();
        (projects, chats)
    }

    #[tokio::test]
    async fn init_leaves_current_empty() {
        let (projects, _) = managers().await;
        assert!(projects.current().is_none());
        assert!(projects.all().is_empty());
    }

    #[tokio::test]
    async fn detach_clears_references_and_keeps_chats() {
        let (mut projects, mut chats) = managers().await;
        let project = projects
            .create_project(Project::new().with_name("Research"))
            .await
            .unwrap();
        let a = chats
            .create_chat(Chat::new().with_project_id(&project.id))
            .await
            .unwrap();
        let b = chats
            .create_chat(Chat::new().with_project_id(&project.id))
            .await
            .unwrap();

        projects
            .delete_project(&project.id, false, &mut chats)
            .await
            .unwrap();

        assert!(projects.get(&project.id).is_none());
        assert!(chats.get(&a.id).unwrap().project_id.is_none());
        assert!(chats.get(&b.id).unwrap().project_id.is_none());
    }

    #[tokio::test]
    async fn cascade_deletes_member_chats() {
        let (mut projects, mut chats) = managers().await;
        let project = projects.create_project(Project::new()).await.unwrap();
        let a = chats
            .create_chat(Chat::new().with_project_id(&project.id))
            .await
            .unwrap();
        let b = chats
            .create_chat(Chat::new().with_project_id(&project.id))
            .await
            .unwrap();
        let outsider = chats.create_chat(Chat::new()).await.unwrap();

        projects
            .delete_project(&project.id, true, &mut chats)
            .await
            .unwrap();

        assert!(chats.get(&a.id).is_none());
        assert!(chats.get(&b.id).is_none());
        assert!(chats.get(&outsider.id).is_some());
        // Chat-side current repair ran as part of each deletion.
        assert!(chats.current().is_some());
    }

    #[tokio::test]
    async fn cascade_deleting_every_chat_leaves_a_fresh_current() {
        let (mut projects, mut chats) = managers().await;
        let project = projects.create_project(Project::new()).await.unwrap();
        // Attach the init-created chat too, so the project owns every chat.
        let seed = chats.current().unwrap().id.clone();
        chats
            .update_chat(
                &seed,
                ChatUpdate {
                    project_id: Some(Some(project.id.clone())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        chats
            .create_chat(Chat::new().with_project_id(&project.id))
            .await
            .unwrap();

        projects
            .delete_project(&project.id, true, &mut chats)
            .await
            .unwrap();

        assert_eq!(chats.all().len(), 1);
        assert!(chats.current().is_some());
        assert!(chats.current().unwrap().project_id.is_none());
    }

    #[tokio::test]
    async fn deleting_current_project_clears_selection() {
        let (mut projects, mut chats) = managers().await;
        let project = projects.create_project(Project::new()).await.unwrap();
        let other = projects.create_project(Project::new()).await.unwrap();
        projects.set_current(Some(&project.id)).await.unwrap();

        projects
            .delete_project(&project.id, false, &mut chats)
            .await
            .unwrap();

        // Cleared, not reassigned.
        assert!(projects.current().is_none());
        assert!(projects.get(&other.id).is_some());
    }

    #[tokio::test]
    async fn set_current_unknown_is_not_found() {
        let (mut projects, _) = managers().await;
        let err = projects.set_current(Some("project_ghost")).await.unwrap_err();
        assert!(err.is_not_found());

        projects.set_current(None).await.unwrap();
        assert!(projects.current().is_none());
    }

    #[tokio::test]
    async fn update_patches_and_persists() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStore::new());
        let mut projects = ProjectManager::new(Arc::clone(&storage));
        projects.init().await.unwrap();
        let project = projects.create_project(Project::new()).await.unwrap();

        projects
            .update_project(
                &project.id,
                ProjectUpdate {
                    name: Some("Renamed".to_string()),
                    description: Some("notes".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut reloaded = ProjectManager::new(storage);
        reloaded.init().await.unwrap();
        let kept = reloaded.get(&project.id).unwrap();
        assert_eq!(kept.name, "Renamed");
        assert_eq!(kept.description, "notes");
    }

    #[tokio::test]
    async fn project_stats_counts_members() {
        let (mut projects, mut chats) = managers().await;
        let project = projects.create_project(Project::new()).await.unwrap();
        let chat = chats
            .create_chat(Chat::new().with_project_id(&project.id))
            .await
            .unwrap();
        chats
            .add_message(&chat.id, crate::types::MessageRole::User, "hi", Default::default())
            .await
            .unwrap();

        let stats = projects.project_stats(&project.id, &chats);
        assert_eq!(stats.total_chats, 1);
        assert_eq!(stats.total_messages, 1);
        assert!(stats.last_updated.is_some());

        let empty = projects.project_stats("project_ghost", &chats);
        assert_eq!(empty.total_chats, 0);
        assert!(empty.last_updated.is_none());
    }

    #[tokio::test]
    async fn search_matches_name_and_description() {
        let (mut projects, _) = managers().await;
        projects
            .create_project(Project::new().with_name("Rust experiments"))
            .await
            .unwrap();
        projects
            .create_project(Project::new().with_description("language benchmarks"))
            .await
            .unwrap();

        assert_eq!(projects.search("RUST").len(), 1);
        assert_eq!(projects.search("benchmarks").len(), 1);
        assert!(projects.search("python").is_empty());
    }
}
