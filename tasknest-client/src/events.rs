//! Change notifications for the task store.
//!
//! Events may be emitted from any thread (the reminder timers run on the
//! tokio pool) and are queued on a channel. Callbacks only run when
//! [`EventDispatcher::process_events`] is called, and only on the thread that
//! registered the first callback, so UI code never sees a callback from a
//! background thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Mutex};
use std::thread::{self, ThreadId};

use tasknest_core::Task;

use crate::errors::{ClientError, ClientResult};

/// Discriminant of [`TaskEvent`], used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    TasksLoaded,
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    RemoteWriteFailed,
    Warning,
    SessionChanged,
    ReminderDue,
}

/// Where a `load()` got its list from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    LocalCache,
    /// The remote fetch failed and the local cache was used instead.
    LocalFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    TasksLoaded { count: usize, source: LoadSource },
    TaskCreated { task: Task },
    TaskUpdated { task: Task },
    TaskDeleted { id: String },
    /// A remote mirror write failed; the local change stands.
    RemoteWriteFailed { operation: &'static str, message: String },
    /// Something the user should be told about, e.g. a reminder that could not be scheduled.
    Warning { message: String },
    SessionChanged { signed_in: bool, email: Option<String> },
    ReminderDue {
        notification_id: String,
        title: String,
        body: String,
    },
}

impl TaskEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            TaskEvent::TasksLoaded { .. } => EventType::TasksLoaded,
            TaskEvent::TaskCreated { .. } => EventType::TaskCreated,
            TaskEvent::TaskUpdated { .. } => EventType::TaskUpdated,
            TaskEvent::TaskDeleted { .. } => EventType::TaskDeleted,
            TaskEvent::RemoteWriteFailed { .. } => EventType::RemoteWriteFailed,
            TaskEvent::Warning { .. } => EventType::Warning,
            TaskEvent::SessionChanged { .. } => EventType::SessionChanged,
            TaskEvent::ReminderDue { .. } => EventType::ReminderDue,
        }
    }
}

/// Events kept while nobody has subscribed. Later ones are dropped.
pub const MAX_UNSUBSCRIBED_BACKLOG: usize = 256;

type Callback = Box<dyn Fn(&TaskEvent) + Send + 'static>;

struct CallbackEntry {
    callback: Callback,
    event_filter: Option<EventType>,
}

impl CallbackEntry {
    fn accepts(&self, event: &TaskEvent) -> bool {
        self.event_filter
            .map_or(true, |filter| filter == event.event_type())
    }
}

/// Queues [`TaskEvent`]s and delivers them to registered callbacks.
///
/// ```
/// use tasknest_client::events::{EventDispatcher, TaskEvent};
///
/// let dispatcher = EventDispatcher::new();
/// dispatcher
///     .register_callback(|event| {
///         if let TaskEvent::Warning { message } = event {
///             println!("warning: {message}");
///         }
///     })
///     .unwrap();
///
/// dispatcher.emit(TaskEvent::Warning { message: "heads up".into() });
/// assert_eq!(dispatcher.process_events().unwrap(), 1);
/// ```
pub struct EventDispatcher {
    callbacks: Mutex<Vec<CallbackEntry>>,
    event_queue: Mutex<mpsc::Receiver<TaskEvent>>,
    event_sender: mpsc::Sender<TaskEvent>,
    undelivered: AtomicUsize,
    callback_thread_id: Mutex<Option<ThreadId>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            callbacks: Mutex::new(Vec::new()),
            event_queue: Mutex::new(receiver),
            event_sender: sender,
            undelivered: AtomicUsize::new(0),
            callback_thread_id: Mutex::new(None),
        }
    }

    fn ensure_callback_thread(&self) -> ClientResult<()> {
        let mut thread_id = self
            .callback_thread_id
            .lock()
            .map_err(|_| ClientError::LockError("thread ID".into()))?;
        if thread_id.is_none() {
            *thread_id = Some(thread::current().id());
            tracing::debug!(
                "STORE: Event callbacks will be processed on thread {:?}",
                thread::current().id()
            );
        }
        Ok(())
    }

    /// Receive every event.
    pub fn register_callback<F>(&self, callback: F) -> ClientResult<()>
    where
        F: Fn(&TaskEvent) + Send + 'static,
    {
        self.push_callback(Box::new(callback), None)
    }

    /// Receive only events of one type.
    pub fn register_callback_filtered<F>(&self, callback: F, event_filter: EventType) -> ClientResult<()>
    where
        F: Fn(&TaskEvent) + Send + 'static,
    {
        self.push_callback(Box::new(callback), Some(event_filter))
    }

    fn push_callback(&self, callback: Callback, event_filter: Option<EventType>) -> ClientResult<()> {
        self.ensure_callback_thread()?;
        self.callbacks
            .lock()
            .map_err(|_| ClientError::LockError("callbacks".into()))?
            .push(CallbackEntry {
                callback,
                event_filter,
            });
        Ok(())
    }

    fn has_subscribers(&self) -> bool {
        self.callback_thread_id
            .lock()
            .map(|thread_id| thread_id.is_some())
            .unwrap_or(true)
    }

    /// Queue an event. Safe to call from any thread.
    pub fn emit(&self, event: TaskEvent) {
        if !self.has_subscribers()
            && self.undelivered.load(Ordering::Relaxed) >= MAX_UNSUBSCRIBED_BACKLOG
        {
            tracing::trace!("STORE: No subscribers, dropped {:?}", event.event_type());
            return;
        }

        tracing::trace!("STORE: Queued {:?}", event.event_type());
        // counted before sending so a concurrent drain never underflows
        self.undelivered.fetch_add(1, Ordering::Relaxed);
        if self.event_sender.send(event).is_err() {
            self.undelivered.fetch_sub(1, Ordering::Relaxed);
            tracing::error!("STORE: Failed to queue event, receiver dropped");
        }
    }

    /// Deliver all queued events. Must be called on the registration thread.
    /// Returns how many events were drained.
    pub fn process_events(&self) -> ClientResult<usize> {
        {
            let thread_id = self
                .callback_thread_id
                .lock()
                .map_err(|_| ClientError::LockError("thread ID".into()))?;
            match *thread_id {
                Some(expected) if thread::current().id() != expected => {
                    return Err(ClientError::ThreadSafetyViolation)
                }
                Some(_) => {}
                None => return Err(ClientError::NoCallbacksRegistered),
            }
        }

        let callbacks = self
            .callbacks
            .lock()
            .map_err(|_| ClientError::LockError("callbacks".into()))?;
        let queue = self
            .event_queue
            .lock()
            .map_err(|_| ClientError::LockError("event queue".into()))?;

        let mut processed = 0;
        while let Ok(event) = queue.try_recv() {
            self.undelivered.fetch_sub(1, Ordering::Relaxed);
            for entry in callbacks.iter().filter(|entry| entry.accepts(&event)) {
                (entry.callback)(&event);
            }
            processed += 1;
        }
        Ok(processed)
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
