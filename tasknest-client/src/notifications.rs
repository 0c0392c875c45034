//! Local reminder scheduling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::{PermissionPolicy, DEFAULT_REMINDER_LEAD};
use crate::errors::{ClientError, ClientResult};
use crate::events::{EventDispatcher, TaskEvent};

pub const REMINDER_TITLE: &str = "Task Reminder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

/// Platform notification facility.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn permission_status(&self) -> PermissionStatus;

    async fn request_permission(&self) -> PermissionStatus;

    /// Schedule a one-shot notification; returns its handle.
    async fn schedule_at(&self, content: NotificationContent, at: DateTime<Utc>) -> ClientResult<String>;

    async fn cancel_scheduled(&self, id: &str) -> ClientResult<()>;
}

/// If `date` is not strictly after `now`, move it to `now + lead`.
pub fn clamp_to_future(date: DateTime<Utc>, now: DateTime<Utc>, lead: Duration) -> DateTime<Utc> {
    if date > now {
        return date;
    }
    let lead = chrono::Duration::from_std(lead).unwrap_or_else(|_| chrono::Duration::seconds(5));
    now + lead
}

/// Reminder adapter used by the task store. Never fails: problems are
/// logged and reported as "no reminder".
#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    lead: Duration,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            lead: DEFAULT_REMINDER_LEAD,
        }
    }

    pub fn with_lead(mut self, lead: Duration) -> Self {
        self.lead = lead;
        self
    }

    pub async fn ensure_permission(&self) -> bool {
        match self.notifier.permission_status().await {
            PermissionStatus::Granted => true,
            _ => self.notifier.request_permission().await == PermissionStatus::Granted,
        }
    }

    /// Schedule a reminder at `date`; past dates are pulled forward to now plus the lead.
    pub async fn schedule(&self, title: &str, body: &str, date: DateTime<Utc>) -> Option<String> {
        if !self.ensure_permission().await {
            tracing::warn!("NOTIFY: Permission not granted, reminder not scheduled");
            return None;
        }

        let now = Utc::now();
        let at = clamp_to_future(date, now, self.lead);
        if at != date {
            tracing::warn!(
                "NOTIFY: Reminder date {} is not in the future, firing at {} instead",
                date,
                at
            );
        }

        let content = NotificationContent {
            title: title.to_string(),
            body: body.to_string(),
        };
        match self.notifier.schedule_at(content, at).await {
            Ok(id) => {
                tracing::info!("NOTIFY: Scheduled reminder {} for {}", id, at);
                Some(id)
            }
            Err(e) => {
                tracing::error!("NOTIFY: Error scheduling reminder: {}", e);
                None
            }
        }
    }

    pub async fn cancel(&self, id: &str) {
        match self.notifier.cancel_scheduled(id).await {
            Ok(()) => tracing::info!("NOTIFY: Cancelled reminder {}", id),
            Err(e) => tracing::error!("NOTIFY: Error cancelling reminder {}: {}", id, e),
        }
    }
}

/// In-process [`Notifier`]: one tokio timer per reminder, delivered as
/// [`TaskEvent::ReminderDue`].
pub struct TimerNotifier {
    events: Arc<EventDispatcher>,
    policy: Mutex<PermissionPolicy>,
    timers: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl TimerNotifier {
    pub fn new(events: Arc<EventDispatcher>, policy: PermissionPolicy) -> Self {
        Self {
            events,
            policy: Mutex::new(policy),
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn pending(&self) -> usize {
        self.timers.lock().map(|t| t.len()).unwrap_or_default()
    }

    fn current_policy(&self) -> PermissionPolicy {
        self.policy
            .lock()
            .map(|p| *p)
            .unwrap_or(PermissionPolicy::Denied)
    }
}

#[async_trait]
impl Notifier for TimerNotifier {
    async fn permission_status(&self) -> PermissionStatus {
        match self.current_policy() {
            PermissionPolicy::Granted => PermissionStatus::Granted,
            PermissionPolicy::Denied => PermissionStatus::Denied,
            PermissionPolicy::Prompt => PermissionStatus::Undetermined,
        }
    }

    async fn request_permission(&self) -> PermissionStatus {
        let Ok(mut policy) = self.policy.lock() else {
            return PermissionStatus::Denied;
        };
        if *policy == PermissionPolicy::Prompt {
            *policy = PermissionPolicy::Granted;
        }
        match *policy {
            PermissionPolicy::Denied => PermissionStatus::Denied,
            _ => PermissionStatus::Granted,
        }
    }

    async fn schedule_at(&self, content: NotificationContent, at: DateTime<Utc>) -> ClientResult<String> {
        let id = Uuid::new_v4().to_string();
        let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        let events = self.events.clone();
        let timers = self.timers.clone();
        let timer_id = id.clone();
        let mut registry = self
            .timers
            .lock()
            .map_err(|_| ClientError::LockError("timers".into()))?;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(mut timers) = timers.lock() {
                timers.remove(&timer_id);
            }
            tracing::info!("NOTIFY: Reminder {} due: {}", timer_id, content.body);
            events.emit(TaskEvent::ReminderDue {
                notification_id: timer_id,
                title: content.title,
                body: content.body,
            });
        });
        registry.insert(id.clone(), handle);
        Ok(id)
    }

    async fn cancel_scheduled(&self, id: &str) -> ClientResult<()> {
        let handle = self
            .timers
            .lock()
            .map_err(|_| ClientError::LockError("timers".into()))?
            .remove(id);
        match handle {
            Some(handle) => {
                handle.abort();
                Ok(())
            }
            None => Err(ClientError::Notification(format!("no pending reminder {id}"))),
        }
    }
}
