//! services/timer/src/timer/controller.rs
//!
//! The Timer Session Controller. Bridges the multi-user project feed and the
//! single countdown that belongs to the signed-in identity.
//!
//! The remote event log is the source of truth. Local state is rebuilt from
//! it on every snapshot; the ticker only interpolates between snapshots.
//! Mutations are read-modify-write against a fresh copy of the project and
//! are guarded by the document revision, retrying on conflict.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use worktimer_core::ports::{Clock, IdentityProvider, IdentityStream, Notifier, ProjectStore};
use worktimer_core::selection::find_open_task_index;
use worktimer_core::{
    elapsed_active_seconds, is_interval_open, remaining_seconds, select_active_task, ActiveTask, Identity, Notice,
    PortError, ProjectDocument, TaskStatus,
};

use crate::error::TimerError;
use crate::timer::state::{SessionState, TimerView};
use crate::timer::sync_task::sync_process;
use crate::timer::ticker::ticker_process;

/// Tunables for a controller instance.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    /// How many times a write is re-read and retried after a revision conflict.
    pub max_write_retries: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self { max_write_retries: 3 }
    }
}

/// What the caller supplies when asking to start a timer.
#[derive(Debug, Clone)]
pub struct StartContext {
    pub project_id: String,
}

#[derive(Debug, Clone)]
enum TimerAction {
    Pause { reason: String },
    Resume,
    Stop,
}

impl TimerAction {
    fn label(&self) -> &'static str {
        match self {
            TimerAction::Pause { .. } => "pause",
            TimerAction::Resume => "resume",
            TimerAction::Stop => "stop",
        }
    }
}

pub struct TimerController {
    store: Arc<dyn ProjectStore>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: ControllerSettings,
    session: Mutex<SessionState>,
    view_tx: watch::Sender<TimerView>,
    shutdown: CancellationToken,
}

impl TimerController {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: ControllerSettings,
    ) -> Arc<Self> {
        let (view_tx, _rx) = watch::channel(TimerView::idle());
        Arc::new(Self {
            store,
            identity,
            notifier,
            clock,
            settings,
            session: Mutex::new(SessionState::new(Identity::anonymous())),
            view_tx,
            shutdown: CancellationToken::new(),
        })
    }

    /// Spawns the background sync loop. Runs until `shutdown` is called.
    pub fn spawn_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move { sync_process(controller).await })
    }

    /// Tears down the subscription and the ticker.
    pub fn shutdown(&self) {
        info!("Timer controller shutting down.");
        self.shutdown.cancel();
    }

    /// The latest published view.
    pub fn view(&self) -> TimerView {
        self.view_tx.borrow().clone()
    }

    /// Receives every published view.
    pub fn subscribe(&self) -> watch::Receiver<TimerView> {
        self.view_tx.subscribe()
    }

    //=====================================================================================
    // Operations
    //=====================================================================================

    /// Starting is owned by whoever creates the task assignment; the
    /// controller picks the timer up from the next snapshot.
    pub fn start(&self, context: StartContext) -> TimerView {
        info!(
            "Start requested for project {}; the initial start event is created elsewhere.",
            context.project_id
        );
        self.view()
    }

    pub async fn pause(self: &Arc<Self>, reason: &str) -> Result<TimerView, TimerError> {
        self.mutate(TimerAction::Pause {
            reason: reason.to_string(),
        })
        .await
    }

    pub async fn resume(self: &Arc<Self>) -> Result<TimerView, TimerError> {
        self.mutate(TimerAction::Resume).await
    }

    pub async fn stop(self: &Arc<Self>) -> Result<TimerView, TimerError> {
        self.mutate(TimerAction::Stop).await
    }

    async fn mutate(self: &Arc<Self>, action: TimerAction) -> Result<TimerView, TimerError> {
        let (identity, project_id) = {
            let session = self.session.lock().await;
            match &session.active {
                Some(task) => (session.identity.clone(), task.project_id.clone()),
                None => return Err(TimerError::NoActiveTimer),
            }
        };

        match self.write_action(&identity, &project_id, &action).await {
            Ok(project) => {
                let mut session = self.session.lock().await;
                if session.identity != identity {
                    debug!("Identity changed while a {} was in flight.", action.label());
                    return Ok(session.view());
                }
                if session.is_stale(&project.id, project.revision) {
                    // A newer snapshot of this project was reconciled while
                    // the write was in flight; it already covers this write.
                    debug!(
                        "Skipping local update for {}: project {} is past revision {}.",
                        action.label(),
                        project.id,
                        project.revision
                    );
                } else {
                    session.observe_revision(&project.id, project.revision);

                    // Optimistic local update ahead of the echoed snapshot.
                    let selected = match action {
                        TimerAction::Stop => None,
                        _ => select_active_task(std::slice::from_ref(&project), &identity),
                    };
                    self.apply_selection(&mut session, selected);
                }
                let view = session.view();
                drop(session);

                info!("Timer {} applied to project {}.", action.label(), project_id);
                self.notifier.notify(Notice::info(match action {
                    TimerAction::Pause { .. } => "Timer paused",
                    TimerAction::Resume => "Timer resumed",
                    TimerAction::Stop => "Timer stopped",
                }));
                Ok(view)
            }
            Err(TimerError::TaskNotFound(project)) => {
                warn!(
                    "Timer {} skipped: assignment no longer exists in project {}.",
                    action.label(),
                    project
                );
                Err(TimerError::TaskNotFound(project))
            }
            Err(e) => {
                error!("Timer {} failed: {}", action.label(), e);
                self.notifier
                    .notify(Notice::error(format!("Could not {} the timer: {}", action.label(), e)));
                Err(e)
            }
        }
    }

    /// Fetches the project fresh, appends the event and writes it back,
    /// retrying when another writer got there first.
    async fn write_action(
        &self,
        identity: &Identity,
        project_id: &str,
        action: &TimerAction,
    ) -> Result<ProjectDocument, TimerError> {
        let mut attempt: u32 = 0;
        loop {
            let mut project = self.store.get_project(project_id).await.map_err(|e| match e {
                PortError::NotFound(_) => TimerError::TaskNotFound(project_id.to_string()),
                e => TimerError::Port(e),
            })?;
            let index = find_open_task_index(&project, identity)
                .ok_or_else(|| TimerError::TaskNotFound(project_id.to_string()))?;

            let now = self.clock.now();
            let assignment = &mut project.user_tasks[index];
            match action {
                TimerAction::Pause { reason } => assignment.pause(now, reason.as_str())?,
                TimerAction::Resume => assignment.resume(now)?,
                TimerAction::Stop => {
                    let remaining = assignment.finish(now)?;
                    debug!("Stopping with {} seconds remaining.", remaining);
                }
            }

            match self
                .store
                .update_user_tasks(project_id, &project.user_tasks, project.revision)
                .await
            {
                Ok(revision) => {
                    project.revision = revision;
                    return Ok(project);
                }
                Err(PortError::Conflict(reason)) if attempt < self.settings.max_write_retries => {
                    attempt += 1;
                    warn!("Write conflict on project {} (attempt {}): {}", project_id, attempt, reason);
                }
                Err(PortError::Conflict(_)) => {
                    return Err(TimerError::ConflictRetriesExhausted {
                        project_id: project_id.to_string(),
                        attempts: attempt + 1,
                    });
                }
                Err(PortError::NotFound(_)) => {
                    return Err(TimerError::TaskNotFound(project_id.to_string()));
                }
                Err(e) => return Err(TimerError::Port(e)),
            }
        }
    }

    //=====================================================================================
    // Reconciliation
    //=====================================================================================

    /// Rebuilds local state from a snapshot of the project collection.
    ///
    /// Snapshots for a different identity than the current one are dropped.
    /// A project older than one already seen is left out of selection; when
    /// it holds the active task, the current state is kept as it is.
    pub async fn reconcile(self: &Arc<Self>, identity: &Identity, projects: Vec<ProjectDocument>) {
        let mut session = self.session.lock().await;
        if session.identity != *identity {
            debug!("Dropping snapshot for a previous identity.");
            return;
        }

        let stale: HashSet<String> = projects
            .iter()
            .filter(|p| session.is_stale(&p.id, p.revision))
            .map(|p| p.id.clone())
            .collect();
        for id in &stale {
            debug!("Ignoring out-of-order copy of project {}.", id);
        }
        let active_is_stale = session
            .active
            .as_ref()
            .is_some_and(|task| stale.contains(&task.project_id));
        session.track_revisions(&projects);
        if active_is_stale {
            return;
        }

        let current: Vec<ProjectDocument> = projects
            .into_iter()
            .filter(|p| !stale.contains(&p.id))
            .collect();
        let selected = select_active_task(&current, identity);
        self.apply_selection(&mut session, selected);
    }

    /// Switches to `identity`, forgetting everything known about the previous one.
    pub(crate) async fn reset_identity(&self, identity: Identity) {
        let mut session = self.session.lock().await;
        session.stop_ticker();
        *session = SessionState::new(identity);
        self.publish(&session);
    }

    fn apply_selection(self: &Arc<Self>, session: &mut SessionState, selected: Option<ActiveTask>) {
        match selected {
            None => {
                if session.active.is_some() {
                    info!("No active timer.");
                }
                session.stop_ticker();
                session.active = None;
                session.elapsed_seconds = 0;
                session.remaining_seconds = 0;
            }
            Some(task) => {
                let now = self.clock.now();
                let elapsed = elapsed_active_seconds(&task.assignment.time_log, now);
                session.elapsed_seconds = elapsed;
                session.remaining_seconds = remaining_seconds(task.assignment.estimate(), elapsed);
                let running = task.assignment.status == TaskStatus::InProgress
                    && is_interval_open(&task.assignment.time_log);
                session.active = Some(task);

                if running && session.ticker.is_none() {
                    let token = self.shutdown.child_token();
                    let controller = self.clone();
                    let ticker_token = token.clone();
                    tokio::spawn(async move { ticker_process(controller, ticker_token).await });
                    session.ticker = Some(token);
                } else if !running {
                    session.stop_ticker();
                }
            }
        }
        self.publish(session);
    }

    /// One local tick: count the display down by a second.
    pub(crate) async fn tick(&self, ticker: &CancellationToken) {
        let mut session = self.session.lock().await;
        if ticker.is_cancelled() || !session.is_running() {
            return;
        }
        session.elapsed_seconds += 1;
        session.remaining_seconds = session.remaining_seconds.saturating_sub(1);
        self.publish(&session);
    }

    fn publish(&self, session: &SessionState) {
        self.view_tx.send_replace(session.view());
    }

    //=====================================================================================
    // Accessors for the sync loop
    //=====================================================================================

    pub(crate) fn store(&self) -> &Arc<dyn ProjectStore> {
        &self.store
    }

    pub(crate) fn identity_changes(&self) -> IdentityStream {
        self.identity.changes()
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Read failures are non-fatal: log, tell the user, keep the last state.
    pub(crate) fn report_port_failure(&self, context: &str, e: &PortError) {
        error!("{}: {:?}", context, e);
        self.notifier.notify(Notice::error(format!("{}: {}", context, e)));
    }
}
