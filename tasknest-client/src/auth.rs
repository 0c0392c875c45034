//! Email/password authentication against the hosted auth service.
//!
//! A [`Session`] is the only thing the rest of the client looks at: with one
//! the task store mirrors writes remotely, without one it stays local.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tasknest_core::SyncError;

use crate::config::RemoteConfig;
use crate::database::{LocalStore, SESSION_KEY};
use crate::errors::ClientResult;
use crate::remote::{status_error, transport_error};

const TOKEN_PATH: &str = "/auth/v1/token";
const SIGNUP_PATH: &str = "/auth/v1/signup";
const LOGOUT_PATH: &str = "/auth/v1/logout";

/// Lifetime assumed when the auth service omits one.
const DEFAULT_EXPIRES_IN: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    SignedIn(Session),
    /// The account exists but the email address has to be confirmed first.
    ConfirmationRequired { email: String },
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: AuthUser,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN)));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user_id: self.user.id,
            email: self.user.email,
            expires_at,
        }
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AuthClient {
    pub fn new(config: &RemoteConfig) -> ClientResult<Self> {
        Ok(Self {
            http: config.http_client()?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session> {
        check_credentials(email, password)?;
        tracing::info!("AUTH: Signing in {}", email);

        let body = self
            .post(TOKEN_PATH, &[("grant_type", "password")], &Credentials { email, password })
            .await
            .inspect_err(|e| tracing::warn!("AUTH: Sign in failed for {}: {}", email, e))?;
        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(token.into_session(Utc::now()))
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> ClientResult<SignUpOutcome> {
        check_credentials(email, password)?;
        tracing::info!("AUTH: Signing up {}", email);

        let body = self
            .post(SIGNUP_PATH, &[], &Credentials { email, password })
            .await
            .inspect_err(|e| tracing::warn!("AUTH: Sign up failed for {}: {}", email, e))?;

        // with confirmation enabled the service answers with the bare user
        match serde_json::from_str::<TokenResponse>(&body) {
            Ok(token) => Ok(SignUpOutcome::SignedIn(token.into_session(Utc::now()))),
            Err(_) => Ok(SignUpOutcome::ConfirmationRequired {
                email: email.to_string(),
            }),
        }
    }

    pub async fn refresh(&self, session: &Session) -> ClientResult<Session> {
        #[derive(Serialize)]
        struct RefreshBody<'a> {
            refresh_token: &'a str,
        }

        let body = self
            .post(
                TOKEN_PATH,
                &[("grant_type", "refresh_token")],
                &RefreshBody {
                    refresh_token: &session.refresh_token,
                },
            )
            .await?;
        let token: TokenResponse = serde_json::from_str(&body)?;
        tracing::info!("AUTH: Refreshed session for user {}", token.user.id);
        Ok(token.into_session(Utc::now()))
    }

    /// Revoke the session server-side. Local state is the caller's business.
    pub async fn sign_out(&self, session: &Session) -> ClientResult<()> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, LOGOUT_PATH))
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(transport_error)?;
        crate::remote::ensure_success(response).await?;
        Ok(())
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> ClientResult<String> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if status.is_success() {
            return Ok(text);
        }

        Err(match status_error(status, &text) {
            SyncError::Remote { status, message } if (400..500).contains(&status) => {
                SyncError::AuthenticationFailed(message)
            }
            other => other,
        }
        .into())
    }
}

fn check_credentials(email: &str, password: &str) -> Result<(), SyncError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(SyncError::InvalidOperation("Please fill in all fields".into()));
    }
    Ok(())
}

/// Keeps the current session in the device store across restarts.
#[derive(Clone)]
pub struct SessionVault {
    local: Arc<LocalStore>,
}

impl SessionVault {
    pub fn new(local: Arc<LocalStore>) -> Self {
        Self { local }
    }

    pub async fn load(&self) -> Option<Session> {
        let raw = match self.local.get_item(SESSION_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::error!("AUTH: Failed to read stored session: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::error!("AUTH: Discarding unreadable stored session: {}", e);
                None
            }
        }
    }

    pub async fn save(&self, session: &Session) -> ClientResult<()> {
        let json = serde_json::to_string(session)?;
        self.local.set_item(SESSION_KEY, &json).await
    }

    pub async fn clear(&self) -> ClientResult<()> {
        self.local.remove_item(SESSION_KEY).await
    }

    /// Load the stored session, refreshing it if it has expired.
    /// A session that cannot be refreshed is dropped.
    pub async fn restore(&self, auth: &AuthClient, now: DateTime<Utc>) -> Option<Session> {
        let session = self.load().await?;
        if !session.is_expired(now) {
            return Some(session);
        }

        match auth.refresh(&session).await {
            Ok(fresh) => {
                if let Err(e) = self.save(&fresh).await {
                    tracing::warn!("AUTH: Could not persist refreshed session: {}", e);
                }
                Some(fresh)
            }
            Err(e) => {
                tracing::warn!("AUTH: Stored session expired and refresh failed: {}", e);
                if let Err(e) = self.clear().await {
                    tracing::warn!("AUTH: Could not clear stale session: {}", e);
                }
                None
            }
        }
    }
}
