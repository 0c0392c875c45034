use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tasknest_core::ThemeMode;

use crate::auth::{AuthClient, Session, SessionVault, SignUpOutcome};
use crate::config::ClientConfig;
use crate::database::LocalStore;
use crate::errors::{ClientError, ClientResult};
use crate::events::{EventDispatcher, LoadSource, TaskEvent};
use crate::notifications::{NotificationService, TimerNotifier};
use crate::remote::RestRemote;
use crate::store::TaskStore;

/// Sessions this close to expiry are refreshed before the next remote call.
const REFRESH_MARGIN_SECS: i64 = 60;

pub const SESSION_EXPIRED_WARNING: &str = "Your session expired. Sign in again to sync.";

/// Everything an app session needs, wired from one [`ClientConfig`]:
/// the device store, the task store, the reminder timers and, when a
/// hosted backend is configured, authentication.
pub struct Client {
    store: TaskStore,
    auth: Option<AuthClient>,
    vault: SessionVault,
    local: Arc<LocalStore>,
    events: Arc<EventDispatcher>,
}

impl Client {
    pub async fn open(config: &ClientConfig) -> ClientResult<Self> {
        let local = Arc::new(LocalStore::open(&config.database_url).await?);
        tracing::info!("LOCAL: Opened {}", config.database_url);

        let events = Arc::new(EventDispatcher::new());
        let notifier = Arc::new(TimerNotifier::new(events.clone(), config.notifications));
        let notifications = NotificationService::new(notifier).with_lead(config.reminder_lead);

        let mut store = TaskStore::new(local.clone(), notifications, events.clone());
        let auth = match &config.remote {
            Some(remote) => {
                tracing::info!("REMOTE: Using backend {}", remote.base_url);
                store = store.with_remote(Arc::new(RestRemote::new(remote)?));
                Some(AuthClient::new(remote)?)
            }
            None => None,
        };

        Ok(Self {
            store,
            auth,
            vault: SessionVault::new(local.clone()),
            local,
            events,
        })
    }

    /// Restore any stored session and perform the initial load.
    pub async fn start(&mut self) -> LoadSource {
        let session = match &self.auth {
            Some(auth) => self.vault.restore(auth, Utc::now()).await,
            None => None,
        };
        self.store.set_session(session).await
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore {
        &mut self.store
    }

    /// The store, after making sure its session is still good for remote calls.
    pub async fn writable_store(&mut self) -> &mut TaskStore {
        if let Err(e) = self.refresh_session(Utc::now()).await {
            tracing::warn!("AUTH: Session check failed: {}", e);
        }
        &mut self.store
    }

    /// Refresh the session if it expires within a minute of `now`. A session
    /// that cannot be refreshed is dropped and the store goes back to the device.
    pub async fn refresh_session(&mut self, now: DateTime<Utc>) -> ClientResult<()> {
        let (Some(auth), Some(session)) = (&self.auth, self.store.session()) else {
            return Ok(());
        };
        if !session.is_expired(now + Duration::seconds(REFRESH_MARGIN_SECS)) {
            return Ok(());
        }

        tracing::info!("AUTH: Session for {} is expiring, refreshing", session.user_id);
        match auth.refresh(session).await {
            Ok(fresh) => {
                self.vault.save(&fresh).await?;
                self.store.replace_session(fresh);
            }
            Err(e) => {
                tracing::warn!("AUTH: Refresh failed, signing out locally: {}", e);
                self.events.emit(TaskEvent::Warning {
                    message: SESSION_EXPIRED_WARNING.to_string(),
                });
                self.vault.clear().await?;
                self.store.set_session(None).await;
            }
        }
        Ok(())
    }

    pub async fn theme_mode(&self) -> ThemeMode {
        self.local.read_theme_mode().await
    }

    pub async fn set_theme_mode(&self, mode: ThemeMode) -> ClientResult<()> {
        self.local.write_theme_mode(mode).await
    }

    pub fn events(&self) -> Arc<EventDispatcher> {
        self.events.clone()
    }

    pub fn has_remote(&self) -> bool {
        self.auth.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.store.session()
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> ClientResult<LoadSource> {
        let session = self.auth()?.sign_in(email.trim(), password).await?;
        self.adopt(session).await
    }

    pub async fn sign_up(&mut self, email: &str, password: &str) -> ClientResult<Option<LoadSource>> {
        match self.auth()?.sign_up(email.trim(), password).await? {
            SignUpOutcome::SignedIn(session) => Ok(Some(self.adopt(session).await?)),
            SignUpOutcome::ConfirmationRequired { email } => {
                tracing::info!("AUTH: Confirmation email sent to {}", email);
                Ok(None)
            }
        }
    }

    /// Forget the session locally; server-side revocation is best effort.
    pub async fn sign_out(&mut self) -> ClientResult<LoadSource> {
        if let (Some(auth), Some(session)) = (&self.auth, self.store.session()) {
            if let Err(e) = auth.sign_out(session).await {
                tracing::warn!("AUTH: Sign out request failed: {}", e);
            }
        }
        self.vault.clear().await?;
        Ok(self.store.set_session(None).await)
    }

    async fn adopt(&mut self, session: Session) -> ClientResult<LoadSource> {
        tracing::info!("AUTH: Signed in as {}", session.user_id);
        self.vault.save(&session).await?;
        Ok(self.store.set_session(Some(session)).await)
    }

    fn auth(&self) -> ClientResult<&AuthClient> {
        self.auth
            .as_ref()
            .ok_or_else(|| ClientError::Config("no remote backend configured".into()))
    }
}
