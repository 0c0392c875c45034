use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tasknest_core::{Task, ThemeMode};

use crate::errors::ClientResult;
use crate::queries::Queries;

/// Key holding the serialized task list.
pub const TASKS_KEY: &str = "@tasks_v1";
/// Key holding the serialized auth session.
pub const SESSION_KEY: &str = "@session_v1";
/// Key holding the appearance preference (`light`, `dark` or `system`).
pub const THEME_KEY: &str = "@theme_preference";

/// Device key-value storage backed by sqlite.
///
/// The task list lives under a single key as one JSON array; every write
/// replaces the whole value.
pub struct LocalStore {
    pub pool: SqlitePool,
}

impl LocalStore {
    pub async fn new(database_url: &str) -> ClientResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // each connection to an in-memory database is its own database
        let pool = if is_memory_url(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        Ok(Self { pool })
    }

    /// Connect and bring the schema up to date.
    pub async fn open(database_url: &str) -> ClientResult<Self> {
        let store = Self::new(database_url).await?;
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn run_migrations(&self) -> ClientResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn get_item(&self, key: &str) -> ClientResult<Option<String>> {
        let row = sqlx::query(Queries::GET_ITEM)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get("value")?),
            None => None,
        })
    }

    pub async fn set_item(&self, key: &str, value: &str) -> ClientResult<()> {
        sqlx::query(Queries::SET_ITEM)
            .bind(key)
            .bind(value)
            .bind(chrono::Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn remove_item(&self, key: &str) -> ClientResult<()> {
        sqlx::query(Queries::REMOVE_ITEM)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_items(&self) -> ClientResult<i64> {
        let count: i64 = sqlx::query_scalar(Queries::COUNT_ITEMS)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Read the cached task list. A missing key or unreadable value yields an empty list.
    pub async fn read_tasks(&self) -> Vec<Task> {
        match self.try_read_tasks().await {
            Ok(tasks) => {
                tracing::debug!("LOCAL: Loaded {} cached tasks", tasks.len());
                tasks
            }
            Err(e) => {
                tracing::error!("LOCAL: Failed to load tasks: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_read_tasks(&self) -> ClientResult<Vec<Task>> {
        match self.get_item(TASKS_KEY).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Overwrite the cached task list. Failures are logged, never raised.
    pub async fn write_tasks(&self, tasks: &[Task]) {
        if let Err(e) = self.try_write_tasks(tasks).await {
            tracing::error!("LOCAL: Failed to save tasks: {}", e);
        }
    }

    async fn try_write_tasks(&self, tasks: &[Task]) -> ClientResult<()> {
        let json = serde_json::to_string(tasks)?;
        self.set_item(TASKS_KEY, &json).await?;
        tracing::debug!("LOCAL: Saved {} tasks", tasks.len());
        Ok(())
    }

    /// The saved theme preference, `System` when none is stored or it is unreadable.
    pub async fn read_theme_mode(&self) -> ThemeMode {
        match self.get_item(THEME_KEY).await {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("LOCAL: Ignoring unknown theme preference {:?}", raw);
                ThemeMode::default()
            }),
            Ok(None) => ThemeMode::default(),
            Err(e) => {
                tracing::error!("LOCAL: Failed to load theme preference: {}", e);
                ThemeMode::default()
            }
        }
    }

    pub async fn write_theme_mode(&self, mode: ThemeMode) -> ClientResult<()> {
        self.set_item(THEME_KEY, &mode.to_string()).await?;
        tracing::debug!("LOCAL: Saved theme preference {}", mode);
        Ok(())
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
