//! crates/worktimer_core/src/domain.rs
//!
//! Defines the pure, core data structures for the work-timer.
//! Field names on the wire follow the project documents held by the remote
//! store (`userTasks`, `timeLog`, `estimatedHours`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a project document in the remote store.
pub type ProjectId = String;

//=========================================================================================
// Event Log Model
//=========================================================================================

/// The lifecycle transition recorded by a single log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerEventKind {
    Start,
    Pause,
    Resume,
    End,
}

impl TimerEventKind {
    /// `start` and `resume` open an active interval.
    pub fn opens_interval(self) -> bool {
        matches!(self, TimerEventKind::Start | TimerEventKind::Resume)
    }
}

/// One entry in a task's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEvent {
    #[serde(rename = "type")]
    pub kind: TimerEventKind,
    pub timestamp: DateTime<Utc>,
    /// Only ever present on `pause` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TimerEvent {
    pub fn start(at: DateTime<Utc>) -> Self {
        Self { kind: TimerEventKind::Start, timestamp: at, reason: None }
    }

    pub fn pause(at: DateTime<Utc>, reason: impl Into<String>) -> Self {
        Self { kind: TimerEventKind::Pause, timestamp: at, reason: Some(reason.into()) }
    }

    pub fn resume(at: DateTime<Utc>) -> Self {
        Self { kind: TimerEventKind::Resume, timestamp: at, reason: None }
    }

    pub fn end(at: DateTime<Utc>) -> Self {
        Self { kind: TimerEventKind::End, timestamp: at, reason: None }
    }
}

//=========================================================================================
// Task Assignments and Projects
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    InProgress,
    Paused,
    Completed,
}

/// The planned duration of a task. Fixed at creation, never touched by the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Estimate {
    pub hours: u32,
    pub minutes: u32,
}

impl Estimate {
    pub fn total_seconds(self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60
    }
}

/// The record of one identity's work on one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    // Legacy records only carry the email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub time_log: Vec<TimerEvent>,
    #[serde(default)]
    pub estimated_hours: u32,
    #[serde(default)]
    pub estimated_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seconds_at_completion: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskAssignment {
    pub fn estimate(&self) -> Estimate {
        Estimate {
            hours: self.estimated_hours,
            minutes: self.estimated_minutes,
        }
    }

    /// True once the log holds an `end` event, whatever `status` says.
    pub fn has_ended(&self) -> bool {
        self.time_log.iter().any(|e| e.kind == TimerEventKind::End)
    }

    /// Reason attached to the most recent `pause`, if the task is paused.
    pub fn pause_reason(&self) -> Option<&str> {
        match self.time_log.last() {
            Some(event) if event.kind == TimerEventKind::Pause => event.reason.as_deref(),
            _ => None,
        }
    }
}

/// A project document as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user_tasks: Vec<TaskAssignment>,
    /// Bumped by the store on every accepted write.
    #[serde(default)]
    pub revision: u64,
}

//=========================================================================================
// Identity and Notifications
//=========================================================================================

/// The currently authenticated user, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Identity {
    pub id: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: Option<String>, email: Option<String>) -> Self {
        let id = id.filter(|s| !s.trim().is_empty());
        let email = email.filter(|s| !s.trim().is_empty());
        Self { id, email }
    }

    /// The signed-out identity.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient, user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}
