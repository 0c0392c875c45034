//! Client configuration.
//!
//! Values come from environment variables; the binary layers its command
//! line flags on top through clap's `env` support.
//!
//! ```text
//! TASKNEST_DATABASE_URL=sqlite:tasknest.sqlite3?mode=rwc
//! TASKNEST_REMOTE_URL=https://project.example.co
//! TASKNEST_REMOTE_KEY=<anon key>
//! TASKNEST_NOTIFICATIONS=granted|denied|prompt
//! TASKNEST_REMINDER_LEAD_SECS=5
//! TASKNEST_HTTP_TIMEOUT_SECS=15
//! ```

use std::str::FromStr;
use std::time::Duration;

use crate::errors::{ClientError, ClientResult};

pub const ENV_DATABASE_URL: &str = "TASKNEST_DATABASE_URL";
pub const ENV_REMOTE_URL: &str = "TASKNEST_REMOTE_URL";
pub const ENV_REMOTE_KEY: &str = "TASKNEST_REMOTE_KEY";
pub const ENV_NOTIFICATIONS: &str = "TASKNEST_NOTIFICATIONS";
pub const ENV_REMINDER_LEAD_SECS: &str = "TASKNEST_REMINDER_LEAD_SECS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "TASKNEST_HTTP_TIMEOUT_SECS";

pub const DEFAULT_DATABASE_URL: &str = "sqlite:tasknest.sqlite3?mode=rwc";
pub const DEFAULT_REMINDER_LEAD: Duration = Duration::from_secs(5);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// How the in-process notifier answers permission requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionPolicy {
    Granted,
    Denied,
    /// Undetermined until the first request, which is granted.
    #[default]
    Prompt,
}

impl FromStr for PermissionPolicy {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "granted" | "on" | "true" => Ok(PermissionPolicy::Granted),
            "denied" | "off" | "false" => Ok(PermissionPolicy::Denied),
            "prompt" => Ok(PermissionPolicy::Prompt),
            other => Err(ClientError::Config(format!(
                "unknown notification policy '{other}' (expected granted, denied or prompt)"
            ))),
        }
    }
}

/// Hosted backend endpoint. The same base URL serves `/rest/v1` and `/auth/v1`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub(crate) fn http_client(&self) -> ClientResult<reqwest::Client> {
        Ok(reqwest::Client::builder().timeout(self.timeout).build()?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub database_url: String,
    pub remote: Option<RemoteConfig>,
    pub notifications: PermissionPolicy,
    pub reminder_lead: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::local(DEFAULT_DATABASE_URL)
    }
}

impl ClientConfig {
    /// Local-only configuration: no hosted backend.
    pub fn local(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            remote: None,
            notifications: PermissionPolicy::default(),
            reminder_lead: DEFAULT_REMINDER_LEAD,
        }
    }

    pub fn with_remote(mut self, remote: RemoteConfig) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config =
            Self::local(get(ENV_DATABASE_URL).unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()));

        let timeout = match get(ENV_HTTP_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_secs(ENV_HTTP_TIMEOUT_SECS, &raw)?),
            None => DEFAULT_HTTP_TIMEOUT,
        };

        config.remote = match (get(ENV_REMOTE_URL), get(ENV_REMOTE_KEY)) {
            (Some(url), Some(key)) => Some(RemoteConfig {
                timeout,
                ..RemoteConfig::new(url, key)
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ClientError::Config(format!(
                    "{ENV_REMOTE_URL} is set but {ENV_REMOTE_KEY} is missing"
                )))
            }
            (None, Some(_)) => {
                return Err(ClientError::Config(format!(
                    "{ENV_REMOTE_KEY} is set but {ENV_REMOTE_URL} is missing"
                )))
            }
        };

        if let Some(raw) = get(ENV_NOTIFICATIONS) {
            config.notifications = raw.parse()?;
        }
        if let Some(raw) = get(ENV_REMINDER_LEAD_SECS) {
            config.reminder_lead = Duration::from_secs(parse_secs(ENV_REMINDER_LEAD_SECS, &raw)?);
        }

        Ok(config)
    }
}

fn parse_secs(key: &str, raw: &str) -> ClientResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| ClientError::Config(format!("{key} must be a whole number of seconds, got '{raw}'")))
}
