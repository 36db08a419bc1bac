//! services/timer/src/adapters/pg_store.rs
//!
//! This module contains the PostgreSQL adapter, the concrete implementation of
//! the `ProjectStore` port backed by a `projects` table. Task assignments live
//! in a JSONB column; the real-time feed is driven by `LISTEN/NOTIFY`.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{debug, error};
use worktimer_core::ports::{PortError, PortResult, ProjectSnapshotStream, ProjectStore};
use worktimer_core::{Identity, ProjectDocument, TaskAssignment};

const CHANGES_CHANNEL: &str = "projects_changed";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ProjectStore` port.
#[derive(Clone)]
pub struct PgProjectStore {
    pool: PgPool,
}

impl PgProjectStore {
    /// Creates a new `PgProjectStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProjectRecord {
    id: String,
    name: String,
    user_tasks: Json<Vec<TaskAssignment>>,
    revision: i64,
}

impl ProjectRecord {
    fn to_domain(self) -> ProjectDocument {
        ProjectDocument {
            id: self.id,
            name: self.name,
            user_tasks: self.user_tasks.0,
            revision: u64::try_from(self.revision).unwrap_or(0),
        }
    }
}

fn map_db_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            PortError::Unavailable(e.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

async fn fetch_all_projects(pool: &PgPool) -> PortResult<Vec<ProjectDocument>> {
    let records = sqlx::query_as::<_, ProjectRecord>(
        "SELECT id, name, user_tasks, revision FROM projects ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await
    .map_err(map_db_error)?;
    Ok(records.into_iter().map(ProjectRecord::to_domain).collect())
}

//=========================================================================================
// `ProjectStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn subscribe_projects(&self) -> PortResult<ProjectSnapshotStream> {
        let mut listener = PgListener::connect_with(&self.pool).await.map_err(map_db_error)?;
        listener.listen(CHANGES_CHANNEL).await.map_err(map_db_error)?;

        let initial = fetch_all_projects(&self.pool).await;
        let pool = self.pool.clone();

        // Notifications only say "something changed"; each one re-reads the
        // whole collection so subscribers always get a full snapshot.
        let feed = stream::unfold((listener, pool), |(mut listener, pool)| async move {
            let snapshot = match listener.recv().await {
                Ok(notification) => {
                    debug!("Project {} changed", notification.payload());
                    fetch_all_projects(&pool).await
                }
                Err(e) => {
                    error!("Project change listener failed: {:?}", e);
                    Err(map_db_error(e))
                }
            };
            Some((snapshot, (listener, pool)))
        });

        Ok(Box::pin(stream::once(async move { initial }).chain(feed)))
    }

    async fn list_projects(&self) -> PortResult<Vec<ProjectDocument>> {
        fetch_all_projects(&self.pool).await
    }

    async fn get_project(&self, project_id: &str) -> PortResult<ProjectDocument> {
        let record = sqlx::query_as::<_, ProjectRecord>(
            "SELECT id, name, user_tasks, revision FROM projects WHERE id = $1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| PortError::NotFound(format!("Project {} not found", project_id)))?;
        Ok(record.to_domain())
    }

    async fn update_user_tasks(
        &self,
        project_id: &str,
        user_tasks: &[TaskAssignment],
        expected_revision: u64,
    ) -> PortResult<u64> {
        let expected = i64::try_from(expected_revision)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let updated: Option<(i64,)> = sqlx::query_as(
            "UPDATE projects SET user_tasks = $1, revision = revision + 1, updated_at = now() \
             WHERE id = $2 AND revision = $3 RETURNING revision",
        )
        .bind(Json(user_tasks))
        .bind(project_id)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        if let Some((revision,)) = updated {
            return Ok(u64::try_from(revision).unwrap_or(0));
        }

        // Nothing matched: either the row is gone or someone wrote first.
        let exists: Option<(i64,)> = sqlx::query_as("SELECT revision FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        match exists {
            Some((current,)) => Err(PortError::Conflict(format!(
                "Project {} is at revision {}, write was based on {}",
                project_id, current, expected_revision
            ))),
            None => Err(PortError::NotFound(format!("Project {} not found", project_id))),
        }
    }

    async fn projects_for_user(&self, identity: &Identity) -> PortResult<Vec<ProjectDocument>> {
        let records = sqlx::query_as::<_, ProjectRecord>(
            "SELECT p.id, p.name, p.user_tasks, p.revision FROM projects p \
             WHERE EXISTS ( \
                 SELECT 1 FROM jsonb_array_elements(p.user_tasks) AS t \
                 WHERE t->>'userId' = $1 \
                    OR (t->>'userId' IS NULL AND lower(trim(t->>'userEmail')) = lower(trim($2))) \
             ) \
             ORDER BY p.created_at, p.id",
        )
        .bind(identity.id.as_deref())
        .bind(identity.email.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(records.into_iter().map(ProjectRecord::to_domain).collect())
    }
}
