use crate::auth::password::CredentialHasher;
use crate::config::Settings;
use crate::directory::{RegistrationProfile, Session, UserDirectory, UserRecord};
use crate::error::{AppError, AuthError};
use crate::stats::{StatsTracker, UsageSummary};
use crate::storage::{
    PersistedSlot, StorageArea, StorageEvent, StorageEvents, TabId, SESSION_KEY,
};
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

pub const SESSION: PersistedSlot<Session> = PersistedSlot::new(SESSION_KEY);

/// Where a session slot value came from. Malformed values are handled
/// differently for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotSource {
    Startup,
    OtherTab,
}

struct LoadingState {
    tx: watch::Sender<bool>,
    in_flight: AtomicUsize,
}

/// Holds `loading` up while alive. Dropping it, including during a panic,
/// releases it.
struct LoadingGuard<'a> {
    state: &'a LoadingState,
}

impl<'a> LoadingGuard<'a> {
    fn engage(state: &'a LoadingState) -> Self {
        state.in_flight.fetch_add(1, Ordering::SeqCst);
        state.tx.send_replace(true);
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let remaining = self.state.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        self.state.tx.send_replace(remaining > 0);
    }
}

/// One tab's authority over the session, the user directory and the usage
/// statistics of a profile.
///
/// Views share it behind an `Arc`, call the operations below and watch
/// [`subscribe_session`](Self::subscribe_session) /
/// [`subscribe_loading`](Self::subscribe_loading). None of the boolean
/// operations ever return an error.
pub struct SessionStore {
    area: StorageArea,
    directory: UserDirectory,
    stats: StatsTracker,
    hasher: CredentialHasher,
    latency: Duration,
    session: watch::Sender<Option<Session>>,
    loading: LoadingState,
    sync_task: Mutex<Option<AbortHandle>>,
}

impl SessionStore {
    pub fn new(area: StorageArea, settings: &Settings) -> Result<Self, AppError> {
        let hasher = CredentialHasher::from_config(&settings.auth)?;
        let (session, _) = watch::channel(None);
        let (loading, _) = watch::channel(true);

        Ok(Self {
            directory: UserDirectory::new(area.clone()),
            stats: StatsTracker::new(area.clone(), settings.stats.seed_demo_data),
            area,
            hasher,
            latency: settings.auth.simulated_latency(),
            session,
            loading: LoadingState {
                tx: loading,
                in_flight: AtomicUsize::new(0),
            },
            sync_task: Mutex::new(None),
        })
    }

    pub fn tab_id(&self) -> TabId {
        self.area.tab_id()
    }

    /// Adopts the persisted session, if any. A malformed slot is cleared.
    pub async fn initialize(&self) {
        let _loading = LoadingGuard::engage(&self.loading);
        match self.area.get(SESSION.key()).await {
            Ok(raw) => {
                self.apply_session_slot(raw.as_deref(), SlotSource::Startup)
                    .await
            }
            Err(e) => error!("Failed to load persisted session: {}", e),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> bool {
        match self.try_login(email, password).await {
            Ok(_) => true,
            Err(e) if e.is_business_failure() => {
                info!("Login rejected for {}: {}", email, e);
                false
            }
            Err(e) => {
                error!("Login failed for {}: {}", email, e);
                false
            }
        }
    }

    pub async fn try_login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::EmptyCredential.into());
        }

        let _loading = LoadingGuard::engage(&self.loading);
        self.simulate_latency().await;

        let record = self
            .directory
            .find_by_credentials(email, password, &self.hasher)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let now = Utc::now();
        let rehash = if record.has_legacy_password() {
            Some(self.hasher.hash(password)?)
        } else {
            None
        };
        let updated = self
            .directory
            .record_login(record.id(), now, rehash)
            .await?
            .unwrap_or_else(|| {
                let mut record = record.clone();
                record.account.last_login = now;
                record
            });

        let session = updated.to_session();
        SESSION.store(&self.area, &session).await?;
        self.set_session(Some(session.clone()));

        if let Err(e) = self.stats.record_login(now.date_naive()).await {
            error!("Failed to track login: {}", e);
        }

        info!("User {} signed in", session.id);
        Ok(session)
    }

    pub async fn register(&self, profile: &RegistrationProfile) -> bool {
        match self.try_register(profile).await {
            Ok(_) => true,
            Err(e) if e.is_business_failure() => {
                info!("Registration rejected for {}: {}", profile.email, e);
                false
            }
            Err(e) => {
                error!("Registration failed for {}: {}", profile.email, e);
                false
            }
        }
    }

    pub async fn try_register(&self, profile: &RegistrationProfile) -> Result<Session, AppError> {
        let _loading = LoadingGuard::engage(&self.loading);

        if profile.email.is_empty() || profile.password.is_empty() {
            return Err(AuthError::EmptyCredential.into());
        }
        if profile.name.trim().is_empty() {
            return Err(AppError::ValidationError("Name is required".into()));
        }

        self.simulate_latency().await;

        // insert_unique decides under the lock; this only skips the hash
        if self.directory.contains_email(&profile.email).await? {
            return Err(AuthError::DuplicateEmail.into());
        }

        let now = Utc::now();
        let hash = self.hasher.hash(&profile.password)?;
        let record = UserRecord::new(profile, hash, now);
        let session = record.to_session();

        self.directory.insert_unique(record).await?;

        SESSION.store(&self.area, &session).await?;
        self.set_session(Some(session.clone()));

        if let Err(e) = self.stats.record_registration(now.date_naive()).await {
            error!("Failed to track registration: {}", e);
        }

        info!("Registered user {}", session.id);
        Ok(session)
    }

    pub async fn logout(&self) {
        if let Err(e) = SESSION.clear(&self.area).await {
            error!("Failed to clear persisted session: {}", e);
        }
        self.set_session(None);
        info!("Signed out of tab {}", self.tab_id());
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_some()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.tx.borrow()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.tx.subscribe()
    }

    pub async fn stats_summary(&self) -> UsageSummary {
        self.stats.summary(Utc::now().date_naive()).await
    }

    /// Applies a write made by another tab of the profile.
    pub async fn handle_storage_event(&self, event: StorageEvent) {
        match event.key.as_deref() {
            None => {
                info!("Profile storage cleared by tab {}", event.origin);
                self.apply_session_slot(None, SlotSource::OtherTab).await;
            }
            Some(key) if key == SESSION.key() => {
                self.apply_session_slot(event.new_value.as_deref(), SlotSource::OtherTab)
                    .await;
            }
            Some(key) => debug!("Ignoring change to '{}' from tab {}", key, event.origin),
        }
    }

    /// Initializes the store and then follows the other tabs.
    ///
    /// The subscription is taken before the session slot is read, so a write
    /// landing while `initialize` runs is replayed afterwards.
    pub async fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let events = self.area.subscribe();
        self.initialize().await;
        self.follow(events)
    }

    /// Follows writes from the other tabs until the store is dropped.
    fn follow(self: &Arc<Self>, mut events: StorageEvents) -> JoinHandle<()> {
        let store = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            loop {
                let received = events.recv().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                match received {
                    Ok(event) => store.handle_storage_event(event).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Missed {} storage events, re-reading session", missed);
                        store.resync().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        if let Ok(mut task) = self.sync_task.lock() {
            if let Some(previous) = task.replace(handle.abort_handle()) {
                previous.abort();
            }
        }
        handle
    }

    async fn resync(&self) {
        match self.area.get(SESSION.key()).await {
            Ok(raw) => {
                self.apply_session_slot(raw.as_deref(), SlotSource::OtherTab)
                    .await
            }
            Err(e) => error!("Failed to re-read persisted session: {}", e),
        }
    }

    /// Adopt-or-clear transition shared by startup and cross-tab updates.
    async fn apply_session_slot(&self, raw: Option<&str>, source: SlotSource) {
        let Some(raw) = raw else {
            debug!("No persisted session ({:?})", source);
            self.set_session(None);
            return;
        };

        match SESSION.parse(raw) {
            Ok(session) => {
                debug!("Adopting session for user {} ({:?})", session.id, source);
                self.set_session(Some(session));
            }
            Err(e) => match source {
                SlotSource::Startup => {
                    warn!("{}; clearing persisted session", e);
                    if let Err(e) = SESSION.clear(&self.area).await {
                        error!("Failed to clear malformed session: {}", e);
                    }
                    self.set_session(None);
                }
                SlotSource::OtherTab => {
                    warn!("Ignoring session written by another tab: {}", e);
                }
            },
        }
    }

    fn set_session(&self, next: Option<Session>) {
        self.session.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        if let Ok(task) = self.sync_task.get_mut() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}
