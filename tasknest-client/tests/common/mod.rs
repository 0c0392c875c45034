#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tasknest_client::notifications::{NotificationContent, PermissionStatus};
use tasknest_client::{
    ClientError, ClientResult, EventDispatcher, LocalStore, NotificationService, Notifier,
    RemoteConfig, RemoteStore, Session, TaskStore,
};
use tasknest_core::rows::TaskPatch;
use tasknest_core::{SyncError, Task};

pub const API_KEY: &str = "anon-key";
pub const ACCESS_TOKEN: &str = "access-token";
pub const PASSWORD: &str = "secret";

pub fn session() -> Session {
    Session {
        access_token: ACCESS_TOKEN.into(),
        refresh_token: "refresh-token".into(),
        user_id: "user-1".into(),
        email: Some("ada@example.com".into()),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

pub async fn memory_local() -> Arc<LocalStore> {
    Arc::new(LocalStore::open("sqlite::memory:").await.unwrap())
}

// ---------------------------------------------------------------------------
// In-process fakes for the store's seams
// ---------------------------------------------------------------------------

/// Remote table kept in memory. `set_offline(true)` makes every call fail
/// the way an unreachable host does.
#[derive(Default)]
pub struct MemoryRemote {
    rows: Mutex<Vec<Task>>,
    next_id: Mutex<u64>,
    offline: Mutex<bool>,
    pub calls: Mutex<Vec<String>>,
}

impl MemoryRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: Mutex::new(100),
            ..Default::default()
        })
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn rows(&self) -> Vec<Task> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, task: Task) {
        self.rows.lock().unwrap().push(task);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) -> ClientResult<()> {
        self.calls.lock().unwrap().push(call.to_string());
        if *self.offline.lock().unwrap() {
            return Err(SyncError::NetworkError("connection refused".into()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch_tasks(&self, _session: &Session) -> ClientResult<Vec<Task>> {
        self.record("fetch")?;
        Ok(self.rows.lock().unwrap().iter().rev().cloned().collect())
    }

    async fn insert_task(&self, _session: &Session, task: &Task) -> ClientResult<Task> {
        self.record("insert")?;
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let stored = Task {
            id: next_id.to_string(),
            ..task.clone()
        };
        self.rows.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn update_task(&self, _session: &Session, id: &str, patch: &TaskPatch) -> ClientResult<Task> {
        self.record("update")?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ClientError::from(SyncError::TaskNotFound(id.to_string())))?;
        if let Some(title) = &patch.title {
            row.title = title.clone();
        }
        if let Some(description) = &patch.description {
            row.description = description.clone();
        }
        if let Some(priority) = patch.priority {
            row.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            row.due_date = due_date;
        }
        if let Some(is_completed) = patch.is_completed {
            row.is_completed = is_completed;
        }
        if let Some(notification_id) = &patch.notification_id {
            row.notification_id = notification_id.clone();
        }
        Ok(row.clone())
    }

    async fn delete_task(&self, _session: &Session, id: &str) -> ClientResult<()> {
        self.record("delete")?;
        self.rows.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }
}

/// Notifier that records what was scheduled and canceled.
pub struct RecordingNotifier {
    granted: bool,
    next: Mutex<u32>,
    pub scheduled: Mutex<Vec<(String, NotificationContent, DateTime<Utc>)>>,
    pub canceled: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new(granted: bool) -> Arc<Self> {
        Arc::new(Self {
            granted,
            next: Mutex::new(0),
            scheduled: Mutex::new(Vec::new()),
            canceled: Mutex::new(Vec::new()),
        })
    }

    pub fn scheduled(&self) -> Vec<(String, NotificationContent, DateTime<Utc>)> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn canceled(&self) -> Vec<String> {
        self.canceled.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn permission_status(&self) -> PermissionStatus {
        if self.granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Undetermined
        }
    }

    async fn request_permission(&self) -> PermissionStatus {
        if self.granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    async fn schedule_at(&self, content: NotificationContent, at: DateTime<Utc>) -> ClientResult<String> {
        let mut next = self.next.lock().unwrap();
        *next += 1;
        let id = format!("notif-{next}");
        self.scheduled.lock().unwrap().push((id.clone(), content, at));
        Ok(id)
    }

    async fn cancel_scheduled(&self, id: &str) -> ClientResult<()> {
        self.canceled.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub store: TaskStore,
    pub local: Arc<LocalStore>,
    pub remote: Arc<MemoryRemote>,
    pub notifier: Arc<RecordingNotifier>,
    pub events: Arc<EventDispatcher>,
}

/// A store wired to in-memory fakes, loaded and signed out.
pub async fn harness(granted: bool) -> Harness {
    let local = memory_local().await;
    let remote = MemoryRemote::new();
    let notifier = RecordingNotifier::new(granted);
    let events = Arc::new(EventDispatcher::new());
    let mut store = TaskStore::new(
        local.clone(),
        NotificationService::new(notifier.clone()),
        events.clone(),
    )
    .with_remote(remote.clone());
    store.load().await;

    Harness {
        store,
        local,
        remote,
        notifier,
        events,
    }
}

// ---------------------------------------------------------------------------
// Mock hosted backend
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Backend {
    pub rows: Vec<Value>,
    pub next_id: i64,
    pub fail_with: Option<StatusCode>,
    pub requests: Vec<String>,
}

pub type SharedBackend = Arc<Mutex<Backend>>;

pub struct MockServer {
    pub config: RemoteConfig,
    pub backend: SharedBackend,
}

impl MockServer {
    pub async fn start() -> Self {
        let backend: SharedBackend = Arc::new(Mutex::new(Backend {
            next_id: 1,
            ..Default::default()
        }));

        let app = Router::new()
            .route(
                "/rest/v1/tasks",
                get(list_tasks)
                    .post(insert_tasks)
                    .patch(patch_task)
                    .delete(delete_task),
            )
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/logout", post(logout))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            config: RemoteConfig::new(format!("http://{addr}"), API_KEY),
            backend,
        }
    }

    pub fn fail_with(&self, status: StatusCode) {
        self.backend.lock().unwrap().fail_with = Some(status);
    }

    pub fn rows(&self) -> Vec<Value> {
        self.backend.lock().unwrap().rows.clone()
    }

    pub fn requests(&self) -> Vec<String> {
        self.backend.lock().unwrap().requests.clone()
    }

    pub fn seed(&self, row: Value) {
        let mut backend = self.backend.lock().unwrap();
        let id = backend.next_id;
        backend.next_id += 1;
        let mut row = row;
        row["id"] = json!(id);
        backend.rows.push(row);
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    let key_ok = headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(API_KEY);
    let bearer = format!("Bearer {ACCESS_TOKEN}");
    let token_ok =
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(bearer.as_str());
    key_ok && token_ok
}

fn guard(backend: &mut Backend, label: String, headers: &HeaderMap) -> Option<Response> {
    backend.requests.push(label);
    if let Some(status) = backend.fail_with {
        return Some((status, Json(json!({ "message": "backend unavailable" }))).into_response());
    }
    if !authorized(headers) {
        return Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "JWT expired" })),
            )
                .into_response(),
        );
    }
    None
}

fn id_filter(query: &HashMap<String, String>) -> Option<i64> {
    query.get("id")?.strip_prefix("eq.")?.parse().ok()
}

async fn list_tasks(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    let order = query.get("order").cloned().unwrap_or_default();
    if let Some(rejected) = guard(&mut backend, format!("GET order={order}"), &headers) {
        return rejected;
    }
    let rows: Vec<Value> = backend.rows.iter().rev().cloned().collect();
    Json(rows).into_response()
}

async fn insert_tasks(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Json(body): Json<Vec<Value>>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    let prefer = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if let Some(rejected) = guard(&mut backend, format!("POST prefer={prefer}"), &headers) {
        return rejected;
    }

    let mut created = Vec::new();
    for mut row in body {
        row["id"] = json!(backend.next_id);
        backend.next_id += 1;
        backend.rows.push(row.clone());
        created.push(row);
    }
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn patch_task(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    if let Some(rejected) = guard(&mut backend, format!("PATCH {body}"), &headers) {
        return rejected;
    }
    let Some(id) = id_filter(&query) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let mut updated = Vec::new();
    if let Some(row) = backend.rows.iter_mut().find(|r| r["id"] == json!(id)) {
        if let (Some(target), Some(changes)) = (row.as_object_mut(), body.as_object()) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }
        updated.push(row.clone());
    }
    Json(updated).into_response()
}

async fn delete_task(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    if let Some(rejected) = guard(&mut backend, "DELETE".to_string(), &headers) {
        return rejected;
    }
    if let Some(id) = id_filter(&query) {
        backend.rows.retain(|r| r["id"] != json!(id));
    }
    StatusCode::NO_CONTENT.into_response()
}

fn token_body(email: &str) -> Value {
    json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh-token",
        "user": { "id": "user-1", "email": email }
    })
}

async fn token(
    State(backend): State<SharedBackend>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let grant = query.get("grant_type").cloned().unwrap_or_default();
    backend
        .lock()
        .unwrap()
        .requests
        .push(format!("TOKEN {grant}"));

    match grant.as_str() {
        "password" if body["password"] == PASSWORD => {
            let email = body["email"].as_str().unwrap_or_default();
            Json(token_body(email)).into_response()
        }
        "password" => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })),
        )
            .into_response(),
        "refresh_token" if body["refresh_token"] == "refresh-token" => {
            Json(token_body("ada@example.com")).into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error_description": "Invalid Refresh Token" })),
        )
            .into_response(),
    }
}

async fn signup(State(backend): State<SharedBackend>, Json(body): Json<Value>) -> Response {
    backend.lock().unwrap().requests.push("SIGNUP".into());
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if email.starts_with("confirm") {
        // confirmation required: the service returns the bare user
        return Json(json!({ "id": "user-2", "email": email })).into_response();
    }
    if email.starts_with("taken") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "msg": "User already registered" })),
        )
            .into_response();
    }
    Json(token_body(&email)).into_response()
}

async fn logout(State(backend): State<SharedBackend>, headers: HeaderMap) -> StatusCode {
    let mut backend = backend.lock().unwrap();
    backend.requests.push("LOGOUT".into());
    if authorized(&headers) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::UNAUTHORIZED
    }
}
