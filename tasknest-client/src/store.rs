//! The task store: the in-memory list every screen reads, its persistence
//! to the device cache and, when signed in, its mirror on the hosted table.

use std::sync::Arc;

use chrono::Utc;
use tasknest_core::rows::TaskPatch;
use tasknest_core::{SyncError, Task, TaskDraft};

use crate::auth::Session;
use crate::database::LocalStore;
use crate::errors::ClientResult;
use crate::events::{EventDispatcher, LoadSource, TaskEvent};
use crate::notifications::{NotificationService, REMINDER_TITLE};
use crate::remote::RemoteStore;

pub const SCHEDULE_WARNING: &str = "Could not schedule notification. Check permissions.";

/// Where the list is read from and mirrored to.
#[derive(Clone)]
pub enum Backing {
    LocalBacked,
    RemoteBacked {
        remote: Arc<dyn RemoteStore>,
        session: Session,
    },
}

impl std::fmt::Debug for Backing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backing::LocalBacked => f.write_str("LocalBacked"),
            Backing::RemoteBacked { session, .. } => f
                .debug_struct("RemoteBacked")
                .field("user_id", &session.user_id)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Loaded,
}

pub struct TaskStore {
    tasks: Vec<Task>,
    state: LoadState,
    backing: Backing,
    remote: Option<Arc<dyn RemoteStore>>,
    local: Arc<LocalStore>,
    notifications: NotificationService,
    events: Arc<EventDispatcher>,
}

impl TaskStore {
    /// A signed-out store. Call [`TaskStore::load`] before reading.
    pub fn new(
        local: Arc<LocalStore>,
        notifications: NotificationService,
        events: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            tasks: Vec::new(),
            state: LoadState::Loading,
            backing: Backing::LocalBacked,
            remote: None,
            local,
            notifications,
            events,
        }
    }

    /// Make a hosted backend available; it is used once a session is set.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.backing, Backing::RemoteBacked { .. })
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.backing {
            Backing::RemoteBacked { session, .. } => Some(session),
            Backing::LocalBacked => None,
        }
    }

    pub fn events(&self) -> Arc<EventDispatcher> {
        self.events.clone()
    }

    /// Switch backing for a new (or no) session and reload the list.
    pub async fn set_session(&mut self, session: Option<Session>) -> LoadSource {
        let email = session.as_ref().and_then(|s| s.email.clone());
        self.backing = match (session, &self.remote) {
            (Some(session), Some(remote)) => Backing::RemoteBacked {
                remote: remote.clone(),
                session,
            },
            (Some(session), None) => {
                tracing::warn!(
                    "STORE: Session for {} ignored, no remote backend configured",
                    session.user_id
                );
                Backing::LocalBacked
            }
            (None, _) => Backing::LocalBacked,
        };
        tracing::info!("STORE: Backing is now {:?}", self.backing);

        self.events.emit(TaskEvent::SessionChanged {
            signed_in: self.is_remote(),
            email: if self.is_remote() { email } else { None },
        });
        self.load().await
    }

    /// Swap in a refreshed session for the same user without reloading.
    /// Returns `false` when the store is not remote-backed.
    pub fn replace_session(&mut self, fresh: Session) -> bool {
        match &mut self.backing {
            Backing::RemoteBacked { session, .. } => {
                tracing::debug!("STORE: Session for {} replaced", fresh.user_id);
                *session = fresh;
                true
            }
            Backing::LocalBacked => false,
        }
    }

    /// Replace the list from the current backing. Never fails: a remote
    /// failure falls back to the device cache.
    pub async fn load(&mut self) -> LoadSource {
        self.state = LoadState::Loading;

        let (tasks, source) = match &self.backing {
            Backing::RemoteBacked { remote, session } => match remote.fetch_tasks(session).await {
                Ok(tasks) => {
                    self.local.write_tasks(&tasks).await;
                    (tasks, LoadSource::Remote)
                }
                Err(e) => {
                    tracing::warn!("STORE: Remote load failed, using local cache: {}", e);
                    (self.local.read_tasks().await, LoadSource::LocalFallback)
                }
            },
            Backing::LocalBacked => (self.local.read_tasks().await, LoadSource::LocalCache),
        };

        tracing::info!("STORE: Loaded {} tasks from {:?}", tasks.len(), source);
        self.tasks = tasks;
        self.state = LoadState::Loaded;
        self.events.emit(TaskEvent::TasksLoaded {
            count: self.tasks.len(),
            source,
        });
        source
    }

    /// Create a task from a submitted form. A blank title is ignored.
    pub async fn add(&mut self, draft: TaskDraft) -> ClientResult<Option<Task>> {
        if draft.is_blank() {
            tracing::debug!("STORE: Ignoring add with blank title");
            return Ok(None);
        }

        let title = draft.title.trim();
        let mut notification_id = None;
        if let Some(due) = draft.due_date {
            notification_id = self
                .notifications
                .schedule(REMINDER_TITLE, &format!("Reminder: {title}"), due)
                .await;
            if notification_id.is_none() {
                self.warn(SCHEDULE_WARNING);
            }
        }

        let local_task = Task::from_draft(self.next_local_id(), &draft, notification_id);
        let task = match &self.backing {
            Backing::RemoteBacked { remote, session } => {
                match remote.insert_task(session, &local_task).await {
                    Ok(stored) => stored,
                    Err(e) => {
                        self.remote_write_failed("insert", &e.to_string());
                        self.warn(&format!("Could not save task online: {e}"));
                        local_task
                    }
                }
            }
            Backing::LocalBacked => local_task,
        };

        tracing::info!("STORE: Added task {} ({})", task.id, task.title);
        self.tasks.push(task.clone());
        self.persist().await;
        self.events.emit(TaskEvent::TaskCreated { task: task.clone() });
        Ok(Some(task))
    }

    /// Replace the task with the same id. Reminders are left as they are.
    pub async fn update(&mut self, task: Task) -> ClientResult<Task> {
        let slot = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| SyncError::TaskNotFound(task.id.clone()))?;
        *slot = task.clone();

        if let Backing::RemoteBacked { remote, session } = &self.backing {
            if let Err(e) = remote.update_task(session, &task.id, &TaskPatch::full(&task)).await {
                self.remote_write_failed("update", &e.to_string());
            }
        }

        tracing::info!("STORE: Updated task {}", task.id);
        self.persist().await;
        self.events.emit(TaskEvent::TaskUpdated { task: task.clone() });
        Ok(task)
    }

    /// Apply an edit form to an existing task.
    pub async fn edit(&mut self, id: &str, draft: &TaskDraft) -> ClientResult<Task> {
        let current = self
            .get(id)
            .ok_or_else(|| SyncError::TaskNotFound(id.to_string()))?;
        let edited = draft.apply_to(current)?;
        self.update(edited).await
    }

    pub async fn delete(&mut self, id: &str) -> ClientResult<Task> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| SyncError::TaskNotFound(id.to_string()))?;

        if let Some(notification_id) = &self.tasks[index].notification_id {
            self.notifications.cancel(notification_id).await;
        }

        if let Backing::RemoteBacked { remote, session } = &self.backing {
            if let Err(e) = remote.delete_task(session, id).await {
                self.remote_write_failed("delete", &e.to_string());
            }
        }

        let removed = self.tasks.remove(index);
        tracing::info!("STORE: Deleted task {}", removed.id);
        self.persist().await;
        self.events.emit(TaskEvent::TaskDeleted {
            id: removed.id.clone(),
        });
        Ok(removed)
    }

    /// Flip completion. Completing a task cancels its reminder for good.
    pub async fn toggle_complete(&mut self, id: &str) -> ClientResult<Task> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| SyncError::TaskNotFound(id.to_string()))?;

        let completing = !self.tasks[index].is_completed;
        let mut cleared = false;
        if completing {
            if let Some(notification_id) = self.tasks[index].notification_id.take() {
                self.notifications.cancel(&notification_id).await;
                cleared = true;
            }
        }
        self.tasks[index].is_completed = completing;
        let task = self.tasks[index].clone();

        if let Backing::RemoteBacked { remote, session } = &self.backing {
            let patch = TaskPatch::completion(completing, cleared);
            if let Err(e) = remote.update_task(session, id, &patch).await {
                self.remote_write_failed("toggle", &e.to_string());
            }
        }

        tracing::info!("STORE: Task {} completed={}", id, completing);
        self.persist().await;
        self.events.emit(TaskEvent::TaskUpdated { task: task.clone() });
        Ok(task)
    }

    async fn persist(&self) {
        self.local.write_tasks(&self.tasks).await;
    }

    fn warn(&self, message: &str) {
        self.events.emit(TaskEvent::Warning {
            message: message.to_string(),
        });
    }

    fn remote_write_failed(&self, operation: &'static str, message: &str) {
        tracing::error!("STORE: Remote {} failed, keeping local change: {}", operation, message);
        self.events.emit(TaskEvent::RemoteWriteFailed {
            operation,
            message: message.to_string(),
        });
    }

    /// Millisecond timestamp, bumped past any id already in the list.
    fn next_local_id(&self) -> String {
        let mut candidate = Utc::now().timestamp_millis();
        while self.tasks.iter().any(|t| t.id == candidate.to_string()) {
            candidate += 1;
        }
        candidate.to_string()
    }
}
