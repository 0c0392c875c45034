//! TaskNest: a personal task list with an offline device cache, reminders
//! and optional hosted sync.
//!
//! This crate provides a unified API over the core model and the client.
//!
//! # Example
//!
//! ```ignore
//! use tasknest::{Client, ClientConfig, TaskDraft};
//!
//! let mut client = Client::open(&ClientConfig::from_env()?).await?;
//! client.start().await;
//! client.store_mut().add(TaskDraft::new("Buy milk")).await?;
//! ```

pub mod forms;
pub mod render;

pub use tasknest_client::{
    Client, ClientConfig, ClientError, ClientResult, EventType, LoadSource, LoadState,
    PermissionPolicy, RemoteConfig, Session, TaskEvent, TaskStore,
};

pub use tasknest_core::views;
pub use tasknest_core::{Priority, SyncError, SyncResult, Task, TaskDraft, Theme, ThemeMode};
