//! crates/worktimer_core/src/ports.rs
//!
//! Defines the service contracts (traits) the timer core depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! core independent of the concrete document store, identity provider and
//! notification channel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;

use crate::domain::{Identity, Notice, ProjectDocument, TaskAssignment};
use crate::selection::involves;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The stored revision no longer matches the one the write was based on.
    #[error("Write conflict: {0}")]
    Conflict(String),
    #[error("Remote service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Full-collection snapshots, one per change in the store.
pub type ProjectSnapshotStream = Pin<Box<dyn Stream<Item = PortResult<Vec<ProjectDocument>>> + Send>>;

/// Emits the current identity once, then every time it changes.
pub type IdentityStream = Pin<Box<dyn Stream<Item = Identity> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Real-time feed over the project collection. The first item is the
    /// current state of the collection.
    async fn subscribe_projects(&self) -> PortResult<ProjectSnapshotStream>;

    /// Point-in-time read of the whole collection.
    async fn list_projects(&self) -> PortResult<Vec<ProjectDocument>>;

    /// Point read of a single project document.
    async fn get_project(&self, project_id: &str) -> PortResult<ProjectDocument>;

    /// Replaces the `userTasks` field of one project, provided its revision is
    /// still `expected_revision`. Returns the new revision.
    async fn update_user_tasks(
        &self,
        project_id: &str,
        user_tasks: &[TaskAssignment],
        expected_revision: u64,
    ) -> PortResult<u64>;

    /// Projects holding at least one assignment owned by `identity`.
    ///
    /// Stores with server-side queries should override this.
    async fn projects_for_user(&self, identity: &Identity) -> PortResult<Vec<ProjectDocument>> {
        let projects = self.list_projects().await?;
        Ok(projects.into_iter().filter(|p| involves(p, identity)).collect())
    }
}

pub trait IdentityProvider: Send + Sync {
    /// The identity signed in right now. Anonymous when signed out.
    fn current(&self) -> Identity;

    fn changes(&self) -> IdentityStream;
}

pub trait Notifier: Send + Sync {
    /// Surfaces a non-fatal notice to the user.
    fn notify(&self, notice: Notice);
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
