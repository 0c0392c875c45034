//! Remote Store Adapter: the hosted `tasks` table behind a PostgREST endpoint.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tasknest_core::rows::{NewTaskRow, TaskPatch, TaskRow};
use tasknest_core::{SyncError, Task};

use crate::auth::Session;
use crate::config::RemoteConfig;
use crate::errors::ClientResult;

const TASKS_PATH: &str = "/rest/v1/tasks";

/// Request/response operations on the remote task table.
///
/// Every method logs its failure and hands it back; callers decide whether
/// it is fatal (fetch) or best-effort (writes).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All tasks visible to the session's user, newest first.
    async fn fetch_tasks(&self, session: &Session) -> ClientResult<Vec<Task>>;

    /// Insert one task; the returned task carries the server-assigned id.
    async fn insert_task(&self, session: &Session, task: &Task) -> ClientResult<Task>;

    async fn update_task(&self, session: &Session, id: &str, patch: &TaskPatch) -> ClientResult<Task>;

    async fn delete_task(&self, session: &Session, id: &str) -> ClientResult<()>;
}

/// [`RemoteStore`] over HTTP.
pub struct RestRemote {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestRemote {
    pub fn new(config: &RemoteConfig) -> ClientResult<Self> {
        Ok(Self {
            http: config.http_client()?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn tasks_url(&self) -> String {
        format!("{}{}", self.base_url, TASKS_PATH)
    }

    fn request(&self, method: reqwest::Method, session: &Session) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.tasks_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
    }

    async fn single_row(response: Response, id: &str) -> ClientResult<Task> {
        let rows: Vec<TaskRow> = response.json().await.map_err(transport_error)?;
        rows.into_iter()
            .next()
            .map(TaskRow::into_task)
            .ok_or_else(|| SyncError::TaskNotFound(id.to_string()).into())
    }
}

#[async_trait]
impl RemoteStore for RestRemote {
    async fn fetch_tasks(&self, session: &Session) -> ClientResult<Vec<Task>> {
        let result: ClientResult<Vec<Task>> = async {
            let response = self
                .request(reqwest::Method::GET, session)
                .query(&[("select", "*"), ("order", "created_at.desc")])
                .send()
                .await
                .map_err(transport_error)?;
            let response = ensure_success(response).await?;
            let rows: Vec<TaskRow> = response.json().await.map_err(transport_error)?;
            Ok(rows.into_iter().map(TaskRow::into_task).collect())
        }
        .await;

        match &result {
            Ok(tasks) => tracing::debug!("REMOTE: Fetched {} tasks", tasks.len()),
            Err(e) => tracing::error!("REMOTE: Error fetching tasks: {}", e),
        }
        result
    }

    async fn insert_task(&self, session: &Session, task: &Task) -> ClientResult<Task> {
        let row = NewTaskRow::from_task(task, &session.user_id);
        let result: ClientResult<Task> = async {
            let response = self
                .request(reqwest::Method::POST, session)
                .header("Prefer", "return=representation")
                .json(&[row])
                .send()
                .await
                .map_err(transport_error)?;
            let response = ensure_success(response).await?;
            Self::single_row(response, &task.id).await
        }
        .await;

        match &result {
            Ok(created) => tracing::info!("REMOTE: Created task {}", created.id),
            Err(e) => tracing::error!("REMOTE: Error creating task: {}", e),
        }
        result
    }

    async fn update_task(&self, session: &Session, id: &str, patch: &TaskPatch) -> ClientResult<Task> {
        let result: ClientResult<Task> = async {
            let response = self
                .request(reqwest::Method::PATCH, session)
                .query(&[("id", format!("eq.{id}"))])
                .header("Prefer", "return=representation")
                .json(patch)
                .send()
                .await
                .map_err(transport_error)?;
            let response = ensure_success(response).await?;
            Self::single_row(response, id).await
        }
        .await;

        match &result {
            Ok(_) => tracing::info!("REMOTE: Updated task {}", id),
            Err(e) => tracing::error!("REMOTE: Error updating task {}: {}", id, e),
        }
        result
    }

    async fn delete_task(&self, session: &Session, id: &str) -> ClientResult<()> {
        let result: ClientResult<()> = async {
            let response = self
                .request(reqwest::Method::DELETE, session)
                .query(&[("id", format!("eq.{id}"))])
                .send()
                .await
                .map_err(transport_error)?;
            ensure_success(response).await?;
            Ok(())
        }
        .await;

        match &result {
            Ok(()) => tracing::info!("REMOTE: Deleted task {}", id),
            Err(e) => tracing::error!("REMOTE: Error deleting task {}: {}", id, e),
        }
        result
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

pub(crate) fn transport_error(err: reqwest::Error) -> SyncError {
    if err.is_decode() {
        SyncError::SerializationError(err.to_string())
    } else {
        SyncError::NetworkError(err.to_string())
    }
}

/// Pass 2xx responses through; turn anything else into a [`SyncError`].
pub(crate) async fn ensure_success(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(status_error(status, &text))
}

pub(crate) fn status_error(status: StatusCode, body: &str) -> SyncError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error_description.or(b.msg).or(b.message).or(b.error))
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                body.to_string()
            }
        });

    SyncError::Remote {
        status: status.as_u16(),
        message,
    }
}
