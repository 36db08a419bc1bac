//! Shared fixtures for the controller integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use timer_lib::adapters::{BroadcastNotifier, InMemoryProjectStore, ManualClock, WatchIdentityProvider};
use timer_lib::timer::{ControllerSettings, TimerController, TimerView};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use worktimer_core::ports::{PortError, PortResult, ProjectSnapshotStream, ProjectStore};
use worktimer_core::{Identity, Notice, ProjectDocument, TaskAssignment, TaskStatus, TimerEvent};

pub fn t(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::seconds(seconds)
}

pub fn me() -> Identity {
    Identity::new(Some("u-1".to_string()), Some("me@agency.io".to_string()))
}

pub fn colleague() -> Identity {
    Identity::new(Some("u-2".to_string()), Some("them@agency.io".to_string()))
}

pub fn assignment(user_id: &str, status: TaskStatus, time_log: Vec<TimerEvent>) -> TaskAssignment {
    TaskAssignment {
        user_id: Some(user_id.to_string()),
        user_email: None,
        status,
        time_log,
        estimated_hours: 1,
        estimated_minutes: 0,
        remaining_seconds_at_completion: None,
        completed_at: None,
    }
}

pub fn project(id: &str, user_tasks: Vec<TaskAssignment>) -> ProjectDocument {
    ProjectDocument {
        id: id.to_string(),
        name: format!("Project {}", id),
        user_tasks,
        revision: 1,
    }
}

//=========================================================================================
// A store wrapper that can be told to misbehave
//=========================================================================================

pub struct ScriptedStore {
    pub inner: Arc<InMemoryProjectStore>,
    pub reject_writes: AtomicBool,
    pub hide_projects: AtomicBool,
    /// Before the next write, bump the target project as a concurrent writer would.
    pub interleave_write: AtomicBool,
    /// After the next successful write, finish my task from elsewhere and
    /// let the feed deliver it before the write returns.
    pub finish_after_write: AtomicBool,
    pub writes: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(inner: Arc<InMemoryProjectStore>) -> Self {
        Self {
            inner,
            reject_writes: AtomicBool::new(false),
            hide_projects: AtomicBool::new(false),
            interleave_write: AtomicBool::new(false),
            finish_after_write: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProjectStore for ScriptedStore {
    async fn subscribe_projects(&self) -> PortResult<ProjectSnapshotStream> {
        self.inner.subscribe_projects().await
    }

    async fn list_projects(&self) -> PortResult<Vec<ProjectDocument>> {
        self.inner.list_projects().await
    }

    async fn get_project(&self, project_id: &str) -> PortResult<ProjectDocument> {
        if self.hide_projects.load(Ordering::SeqCst) {
            return Err(PortError::NotFound(project_id.to_string()));
        }
        self.inner.get_project(project_id).await
    }

    async fn update_user_tasks(
        &self,
        project_id: &str,
        user_tasks: &[TaskAssignment],
        expected_revision: u64,
    ) -> PortResult<u64> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("store offline".to_string()));
        }
        if self.interleave_write.swap(false, Ordering::SeqCst) {
            let mut other = self.inner.get_project(project_id).await?;
            other.user_tasks.push(assignment(
                "u-3",
                TaskStatus::InProgress,
                vec![TimerEvent::start(t(0))],
            ));
            self.inner.put_project(other).await;
        }
        let revision = self
            .inner
            .update_user_tasks(project_id, user_tasks, expected_revision)
            .await?;
        if self.finish_after_write.swap(false, Ordering::SeqCst) {
            let mut other = self.inner.get_project(project_id).await?;
            if let Some(task) = other.user_tasks.iter_mut().find(|task| task.user_id.as_deref() == Some("u-1")) {
                task.finish(t(120)).map_err(|e| PortError::Unexpected(e.to_string()))?;
            }
            self.inner.put_project(other).await;
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        Ok(revision)
    }
}

//=========================================================================================
// Harness
//=========================================================================================

pub struct Harness {
    pub memory: Arc<InMemoryProjectStore>,
    pub store: Arc<ScriptedStore>,
    pub identity: Arc<WatchIdentityProvider>,
    pub notices: Arc<BroadcastNotifier>,
    pub notice_rx: broadcast::Receiver<Notice>,
    pub clock: Arc<ManualClock>,
    pub controller: Arc<TimerController>,
    pub views: watch::Receiver<TimerView>,
    pub sync: JoinHandle<()>,
}

impl Harness {
    pub fn start(projects: Vec<ProjectDocument>, identity: Identity, now: DateTime<Utc>) -> Self {
        let memory = Arc::new(InMemoryProjectStore::with_projects(projects));
        let store = Arc::new(ScriptedStore::new(memory.clone()));
        let identity = Arc::new(WatchIdentityProvider::new(identity));
        let notices = Arc::new(BroadcastNotifier::new());
        let notice_rx = notices.subscribe();
        let clock = Arc::new(ManualClock::new(now));
        let controller = TimerController::new(
            store.clone(),
            identity.clone(),
            notices.clone(),
            clock.clone(),
            ControllerSettings::default(),
        );
        let views = controller.subscribe();
        let sync = controller.spawn_sync();
        Self {
            memory,
            store,
            identity,
            notices,
            notice_rx,
            clock,
            controller,
            views,
            sync,
        }
    }

    /// Waits until the published view satisfies `pred`.
    pub async fn wait_for<F>(&mut self, pred: F) -> TimerView
    where
        F: Fn(&TimerView) -> bool,
    {
        let views = &mut self.views;
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                {
                    let view = views.borrow_and_update();
                    if pred(&view) {
                        return view.clone();
                    }
                }
                views.changed().await.expect("controller dropped");
            }
        })
        .await
        .expect("timed out waiting for the timer view")
    }

    /// Drains notices received so far.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.notice_rx.try_recv() {
            out.push(notice);
        }
        out
    }

    pub async fn stored_task(&self, project_id: &str, user_id: &str) -> TaskAssignment {
        self.memory
            .get_project(project_id)
            .await
            .unwrap()
            .user_tasks
            .into_iter()
            .find(|task| task.user_id.as_deref() == Some(user_id))
            .unwrap()
    }

    pub async fn shutdown(self) {
        self.controller.shutdown();
        self.sync.await.unwrap();
    }
}
