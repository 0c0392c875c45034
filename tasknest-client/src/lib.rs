pub mod auth;
pub mod client;
pub mod config;
pub mod database;
pub mod errors;
pub mod events;
pub mod notifications;
pub mod queries;
pub mod remote;
pub mod store;

pub use auth::{AuthClient, Session, SessionVault, SignUpOutcome};
pub use client::Client;
pub use config::{ClientConfig, PermissionPolicy, RemoteConfig};
pub use database::LocalStore;
pub use errors::{ClientError, ClientResult};
pub use events::{EventDispatcher, EventType, LoadSource, TaskEvent};
pub use notifications::{NotificationService, Notifier, TimerNotifier};
pub use remote::{RemoteStore, RestRemote};
pub use store::{Backing, LoadState, TaskStore};
