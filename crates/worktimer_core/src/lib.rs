pub mod calculator;
pub mod domain;
pub mod ports;
pub mod selection;
pub mod time_log;

pub use calculator::{elapsed_active_seconds, format_hms, is_interval_open, remaining_seconds};
pub use domain::{
    Estimate, Identity, Notice, NoticeLevel, ProjectDocument, ProjectId, TaskAssignment,
    TaskStatus, TimerEvent, TimerEventKind,
};
pub use ports::{
    Clock, IdentityProvider, IdentityStream, Notifier, PortError, PortResult, ProjectSnapshotStream,
    ProjectStore,
};
pub use selection::{select_active_task, ActiveTask};
pub use time_log::{log_phase, LogPhase, TimeLogError};
