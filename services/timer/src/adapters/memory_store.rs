//! services/timer/src/adapters/memory_store.rs
//!
//! An in-process implementation of the `ProjectStore` port. Every accepted
//! write bumps the document revision and broadcasts a full-collection
//! snapshot to all subscribers, mirroring a hosted real-time document store.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::path::Path;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use worktimer_core::ports::{PortError, PortResult, ProjectSnapshotStream, ProjectStore};
use worktimer_core::{ProjectDocument, TaskAssignment};

const SNAPSHOT_BUFFER: usize = 32;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct InMemoryProjectStore {
    // Insertion order is the collection's iteration order.
    projects: RwLock<Vec<ProjectDocument>>,
    changes: broadcast::Sender<Vec<ProjectDocument>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::with_projects(Vec::new())
    }

    pub fn with_projects(projects: Vec<ProjectDocument>) -> Self {
        let (changes, _rx) = broadcast::channel(SNAPSHOT_BUFFER);
        Self {
            projects: RwLock::new(projects),
            changes,
        }
    }

    /// Loads a JSON array of project documents.
    pub async fn from_seed_file(path: &Path) -> PortResult<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            PortError::Unexpected(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;
        let projects: Vec<ProjectDocument> = serde_json::from_str(&raw).map_err(|e| {
            PortError::Unexpected(format!("Invalid seed file {}: {}", path.display(), e))
        })?;
        info!("Seeded in-memory store with {} projects", projects.len());
        Ok(Self::with_projects(projects))
    }

    /// Inserts or replaces a whole document, as another client would.
    pub async fn put_project(&self, mut project: ProjectDocument) {
        let mut projects = self.projects.write().await;
        match projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => {
                project.revision = existing.revision + 1;
                *existing = project;
            }
            None => projects.push(project),
        }
        self.publish(&projects);
    }

    pub async fn delete_project(&self, project_id: &str) -> PortResult<()> {
        let mut projects = self.projects.write().await;
        let before = projects.len();
        projects.retain(|p| p.id != project_id);
        if projects.len() == before {
            return Err(PortError::NotFound(format!("Project {} not found", project_id)));
        }
        self.publish(&projects);
        Ok(())
    }

    fn publish(&self, projects: &[ProjectDocument]) {
        // No subscribers is not an error.
        if self.changes.send(projects.to_vec()).is_err() {
            debug!("Snapshot dropped, no subscribers");
        }
    }
}

impl Default for InMemoryProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================================
// `ProjectStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn subscribe_projects(&self) -> PortResult<ProjectSnapshotStream> {
        // Subscribe under the read lock so no write slips in between the
        // initial snapshot and the feed.
        let projects = self.projects.read().await;
        let rx = self.changes.subscribe();
        let initial = projects.clone();
        drop(projects);

        let feed = stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(snapshot) => return Some((Ok::<_, PortError>(snapshot), rx)),
                    // Every snapshot is complete, so skipping ahead is safe.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Snapshot subscriber lagged, skipped {} snapshots", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(Box::pin(stream::once(async move { Ok::<_, PortError>(initial) }).chain(feed)))
    }

    async fn list_projects(&self) -> PortResult<Vec<ProjectDocument>> {
        Ok(self.projects.read().await.clone())
    }

    async fn get_project(&self, project_id: &str) -> PortResult<ProjectDocument> {
        self.projects
            .read()
            .await
            .iter()
            .find(|p| p.id == project_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", project_id)))
    }

    async fn update_user_tasks(
        &self,
        project_id: &str,
        user_tasks: &[TaskAssignment],
        expected_revision: u64,
    ) -> PortResult<u64> {
        let mut projects = self.projects.write().await;
        let project = projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", project_id)))?;

        if project.revision != expected_revision {
            return Err(PortError::Conflict(format!(
                "Project {} is at revision {}, write was based on {}",
                project_id, project.revision, expected_revision
            )));
        }

        project.user_tasks = user_tasks.to_vec();
        project.revision += 1;
        let revision = project.revision;
        self.publish(&projects);
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str) -> ProjectDocument {
        ProjectDocument {
            id: id.to_string(),
            name: id.to_uppercase(),
            user_tasks: Vec::new(),
            revision: 1,
        }
    }

    #[tokio::test]
    async fn subscription_starts_with_current_state_then_follows_writes() {
        let store = InMemoryProjectStore::with_projects(vec![project("a")]);
        let mut feed = store.subscribe_projects().await.unwrap();

        let first = feed.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);

        let revision = store.update_user_tasks("a", &[], 1).await.unwrap();
        assert_eq!(revision, 2);

        let second = feed.next().await.unwrap().unwrap();
        assert_eq!(second[0].revision, 2);
    }

    #[tokio::test]
    async fn stale_revision_is_a_conflict() {
        let store = InMemoryProjectStore::with_projects(vec![project("a")]);
        store.update_user_tasks("a", &[], 1).await.unwrap();

        let err = store.update_user_tasks("a", &[], 1).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
        assert_eq!(store.get_project("a").await.unwrap().revision, 2);
    }

    #[tokio::test]
    async fn missing_project_is_not_found() {
        let store = InMemoryProjectStore::new();
        assert!(matches!(store.get_project("nope").await, Err(PortError::NotFound(_))));
        assert!(matches!(
            store.update_user_tasks("nope", &[], 0).await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(store.delete_project("nope").await, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn loads_example_seed_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("seed/projects.example.json");
        let store = InMemoryProjectStore::from_seed_file(&path).await.unwrap();

        let projects = store.list_projects().await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].user_tasks[0].time_log.len(), 3);
        assert_eq!(projects[1].revision, 4);
    }
}
