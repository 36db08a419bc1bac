//! crates/worktimer_core/src/time_log.rs
//!
//! Validated appends to a task's event log.
//!
//! Replay stays lenient (see `calculator`), but new entries are only appended
//! when they fit the current phase of the log, so the controller never makes a
//! well-formed log malformed. `status` is rewritten after every append to stay
//! consistent with the last event.

use chrono::{DateTime, Utc};

use crate::calculator::{elapsed_active_seconds, remaining_seconds};
use crate::domain::{TaskAssignment, TaskStatus, TimerEvent, TimerEventKind};

/// Why an append was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeLogError {
    #[error("the task has already been completed")]
    Completed,
    #[error("the timer is not running")]
    NotRunning,
    #[error("the timer is not paused")]
    NotPaused,
    #[error("the timer was never started")]
    NoStart,
}

/// Where a log currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogPhase {
    Empty,
    Running,
    Paused,
    Ended,
}

/// Derives the phase from the events alone, ignoring the stored `status`.
pub fn log_phase(log: &[TimerEvent]) -> LogPhase {
    if log.iter().any(|e| e.kind == TimerEventKind::End) {
        return LogPhase::Ended;
    }
    match log.last().map(|e| e.kind) {
        None => LogPhase::Empty,
        Some(TimerEventKind::Start | TimerEventKind::Resume) => LogPhase::Running,
        Some(TimerEventKind::Pause) => LogPhase::Paused,
        Some(TimerEventKind::End) => LogPhase::Ended,
    }
}

impl TaskAssignment {
    /// Appends a `pause` carrying `reason` and marks the task paused.
    pub fn pause(&mut self, at: DateTime<Utc>, reason: impl Into<String>) -> Result<(), TimeLogError> {
        match log_phase(&self.time_log) {
            LogPhase::Running => {}
            LogPhase::Ended => return Err(TimeLogError::Completed),
            LogPhase::Empty => return Err(TimeLogError::NoStart),
            LogPhase::Paused => return Err(TimeLogError::NotRunning),
        }
        self.time_log.push(TimerEvent::pause(at, reason));
        self.status = TaskStatus::Paused;
        Ok(())
    }

    /// Appends a `resume` and marks the task in progress.
    pub fn resume(&mut self, at: DateTime<Utc>) -> Result<(), TimeLogError> {
        match log_phase(&self.time_log) {
            LogPhase::Paused => {}
            LogPhase::Ended => return Err(TimeLogError::Completed),
            LogPhase::Empty => return Err(TimeLogError::NoStart),
            LogPhase::Running => return Err(TimeLogError::NotPaused),
        }
        self.time_log.push(TimerEvent::resume(at));
        self.status = TaskStatus::InProgress;
        Ok(())
    }

    /// Appends the final `end` event and completes the task.
    ///
    /// Records the remaining time at completion and returns it.
    pub fn finish(&mut self, at: DateTime<Utc>) -> Result<u64, TimeLogError> {
        match log_phase(&self.time_log) {
            LogPhase::Running | LogPhase::Paused => {}
            LogPhase::Ended => return Err(TimeLogError::Completed),
            LogPhase::Empty => return Err(TimeLogError::NoStart),
        }
        self.time_log.push(TimerEvent::end(at));
        let elapsed = elapsed_active_seconds(&self.time_log, at);
        let remaining = remaining_seconds(self.estimate(), elapsed);
        self.status = TaskStatus::Completed;
        self.remaining_seconds_at_completion = Some(remaining);
        self.completed_at = Some(at);
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn running_task() -> TaskAssignment {
        TaskAssignment {
            user_id: Some("u-1".to_string()),
            user_email: None,
            status: TaskStatus::InProgress,
            time_log: vec![TimerEvent::start(t(0))],
            estimated_hours: 1,
            estimated_minutes: 0,
            remaining_seconds_at_completion: None,
            completed_at: None,
        }
    }

    #[test]
    fn pause_resume_finish_round_trip() {
        let mut task = running_task();
        let before = elapsed_active_seconds(&task.time_log, t(0));

        task.pause(t(300), "Break").unwrap();
        assert_eq!(task.status, TaskStatus::Paused);
        assert_eq!(elapsed_active_seconds(&task.time_log, t(300)), before + 300);
        assert_eq!(task.pause_reason(), Some("Break"));

        task.resume(t(1000)).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);

        let remaining = task.finish(t(1120)).unwrap();
        assert_eq!(elapsed_active_seconds(&task.time_log, t(5000)), before + 300 + 120);
        assert_eq!(remaining, 3600 - 420);
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.remaining_seconds_at_completion, Some(3180));
        assert_eq!(task.completed_at, Some(t(1120)));
        assert_eq!(log_phase(&task.time_log), LogPhase::Ended);
    }

    #[test]
    fn rejects_transitions_that_do_not_fit() {
        let mut task = running_task();
        assert_eq!(task.resume(t(10)), Err(TimeLogError::NotPaused));

        task.pause(t(20), "Break").unwrap();
        assert_eq!(task.pause(t(30), "Again"), Err(TimeLogError::NotRunning));

        task.finish(t(40)).unwrap();
        assert_eq!(task.pause(t(50), "Late"), Err(TimeLogError::Completed));
        assert_eq!(task.resume(t(50)), Err(TimeLogError::Completed));
        assert_eq!(task.finish(t(50)), Err(TimeLogError::Completed));
        assert_eq!(task.time_log.len(), 3);
    }

    #[test]
    fn empty_log_cannot_be_appended_to() {
        let mut task = running_task();
        task.time_log.clear();
        assert_eq!(task.pause(t(1), "x"), Err(TimeLogError::NoStart));
        assert_eq!(task.finish(t(1)), Err(TimeLogError::NoStart));
    }
}
