//! crates/worktimer_core/src/selection.rs
//!
//! Picks "my" active timer out of a snapshot of project documents.

use crate::domain::{Identity, ProjectDocument, ProjectId, TaskAssignment, TaskStatus};

/// The task assignment selected as the current identity's running timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTask {
    pub project_id: ProjectId,
    pub project_name: String,
    /// Revision of the project document the assignment was read from.
    pub revision: u64,
    pub assignment: TaskAssignment,
}

/// Whether `assignment` is owned by `identity`.
///
/// The id is authoritative. Email is only compared, case-insensitively, when
/// the record carries no id at all.
pub fn belongs_to(identity: &Identity, assignment: &TaskAssignment) -> bool {
    match &assignment.user_id {
        Some(owner) => identity.id.as_deref() == Some(owner.as_str()),
        None => match (&identity.email, &assignment.user_email) {
            (Some(mine), Some(theirs)) => mine.trim().eq_ignore_ascii_case(theirs.trim()),
            _ => false,
        },
    }
}

/// In progress or paused, and no `end` in the log.
pub fn is_open(assignment: &TaskAssignment) -> bool {
    matches!(assignment.status, TaskStatus::InProgress | TaskStatus::Paused) && !assignment.has_ended()
}

/// Index of the first open assignment in `project` owned by `identity`.
pub fn find_open_task_index(project: &ProjectDocument, identity: &Identity) -> Option<usize> {
    if identity.is_anonymous() {
        return None;
    }
    project
        .user_tasks
        .iter()
        .position(|task| belongs_to(identity, task) && is_open(task))
}

/// Scans every project in iteration order and returns the first open
/// assignment owned by `identity`.
///
/// A user with two open tasks is a data error on the producer's side; the
/// first match wins.
pub fn select_active_task(projects: &[ProjectDocument], identity: &Identity) -> Option<ActiveTask> {
    projects.iter().find_map(|project| {
        find_open_task_index(project, identity).map(|index| ActiveTask {
            project_id: project.id.clone(),
            project_name: project.name.clone(),
            revision: project.revision,
            assignment: project.user_tasks[index].clone(),
        })
    })
}

/// Whether `project` has any assignment owned by `identity`, open or not.
pub fn involves(project: &ProjectDocument, identity: &Identity) -> bool {
    project.user_tasks.iter().any(|task| belongs_to(identity, task))
}
