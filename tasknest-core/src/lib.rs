pub mod errors;
pub mod models;
pub mod rows;
pub mod views;

pub use errors::{SyncError, SyncResult};
pub use models::{Priority, Task, TaskDraft, Theme, ThemeMode};
