use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Remote request failed with status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl SyncError {
    /// True for failures that came from the hosted backend or the network path to it.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SyncError::NetworkError(_)
                | SyncError::Remote { .. }
                | SyncError::AuthenticationFailed(_)
        )
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationError(err.to_string())
    }
}

impl From<chrono::ParseError> for SyncError {
    fn from(err: chrono::ParseError) -> Self {
        SyncError::SerializationError(err.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
