use tasknest_core::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Failed to acquire lock: {0}")]
    LockError(String),

    #[error("Thread safety violation: process_events() must be called on the registration thread")]
    ThreadSafetyViolation,

    #[error("No callbacks registered yet")]
    NoCallbacksRegistered,
}

impl ClientError {
    /// The domain error behind this failure, if any.
    pub fn as_sync(&self) -> Option<&SyncError> {
        match self {
            ClientError::Sync(e) => Some(e),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
