//! services/timer/src/timer/state.rs
//!
//! Local state owned by one controller instance, and the view it publishes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use worktimer_core::{format_hms, ActiveTask, Identity, ProjectDocument, ProjectId, TaskStatus};

/// What the countdown is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    /// No active timer for the current identity.
    Idle,
    Running,
    Paused,
}

/// The derived timer state consumed by presentation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub status: TimerStatus,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub elapsed_seconds: u64,
    pub remaining_seconds: u64,
    pub estimate_seconds: u64,
    pub pause_reason: Option<String>,
    pub over_budget: bool,
    /// `remaining_seconds` rendered as `HH:MM:SS`.
    pub display: String,
}

impl TimerView {
    pub fn idle() -> Self {
        Self {
            status: TimerStatus::Idle,
            project_id: None,
            project_name: None,
            elapsed_seconds: 0,
            remaining_seconds: 0,
            estimate_seconds: 0,
            pause_reason: None,
            over_budget: false,
            display: format_hms(0),
        }
    }
}

//=========================================================================================
// SessionState (Owned by One Controller)
//=========================================================================================

pub(crate) struct SessionState {
    pub identity: Identity,
    pub active: Option<ActiveTask>,
    pub elapsed_seconds: u64,
    pub remaining_seconds: u64,
    /// Highest revision seen per project, from snapshots and our own writes.
    pub revisions: HashMap<ProjectId, u64>,
    /// Cancels the running ticker, if any.
    pub ticker: Option<CancellationToken>,
}

impl SessionState {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            active: None,
            elapsed_seconds: 0,
            remaining_seconds: 0,
            revisions: HashMap::new(),
            ticker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|task| task.assignment.status == TaskStatus::InProgress)
    }

    /// Records `revision` for `project_id` unless a newer one is known.
    pub fn observe_revision(&mut self, project_id: &str, revision: u64) {
        let seen = self.revisions.entry(project_id.to_string()).or_insert(revision);
        if revision > *seen {
            *seen = revision;
        }
    }

    /// True when `revision` is older than what this session already saw.
    pub fn is_stale(&self, project_id: &str, revision: u64) -> bool {
        self.revisions
            .get(project_id)
            .is_some_and(|&seen| revision < seen)
    }

    /// Replaces the revision record with the projects of an accepted
    /// snapshot, keeping the higher of the known and delivered revision.
    /// Projects missing from the snapshot are forgotten, so one that is
    /// deleted and recreated starts over from its new revision.
    pub fn track_revisions(&mut self, projects: &[ProjectDocument]) {
        let revisions = projects
            .iter()
            .map(|p| {
                let seen = self.revisions.get(&p.id).copied().unwrap_or(0);
                (p.id.clone(), seen.max(p.revision))
            })
            .collect();
        self.revisions = revisions;
    }

    pub fn stop_ticker(&mut self) {
        if let Some(token) = self.ticker.take() {
            token.cancel();
        }
    }

    pub fn view(&self) -> TimerView {
        let Some(task) = &self.active else {
            return TimerView::idle();
        };
        let estimate_seconds = task.assignment.estimate().total_seconds();
        let status = match task.assignment.status {
            TaskStatus::InProgress => TimerStatus::Running,
            TaskStatus::Paused => TimerStatus::Paused,
            TaskStatus::Completed => TimerStatus::Idle,
        };
        TimerView {
            status,
            project_id: Some(task.project_id.clone()),
            project_name: Some(task.project_name.clone()),
            elapsed_seconds: self.elapsed_seconds,
            remaining_seconds: self.remaining_seconds,
            estimate_seconds,
            pause_reason: task.assignment.pause_reason().map(str::to_string),
            over_budget: self.elapsed_seconds > estimate_seconds,
            display: format_hms(self.remaining_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str, revision: u64) -> ProjectDocument {
        ProjectDocument {
            id: id.to_string(),
            name: String::new(),
            user_tasks: Vec::new(),
            revision,
        }
    }

    #[test]
    fn revisions_follow_the_latest_accepted_snapshot() {
        let mut session = SessionState::new(Identity::anonymous());
        session.track_revisions(&[project("a", 5), project("b", 2)]);
        assert!(session.is_stale("a", 4));

        // An older copy of "a" does not lower the record.
        session.track_revisions(&[project("a", 3), project("b", 2)]);
        assert!(session.is_stale("a", 4));

        // "a" disappears, then comes back from scratch.
        session.track_revisions(&[project("b", 2)]);
        assert!(!session.is_stale("a", 1));
        session.track_revisions(&[project("a", 1), project("b", 2)]);
        assert!(!session.is_stale("a", 1));
        assert!(session.is_stale("a", 0));
    }
}
