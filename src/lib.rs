pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod stats;
pub mod storage;

use std::sync::Arc;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

pub use auth::{RegistrationForm, SessionStore};
pub use directory::{RegistrationProfile, Role, Session, UserRecord};
pub use stats::{DailyUsageStat, StatsWindow, UsageSummary};
pub use storage::{Profile, StorageArea};

use crate::config::StorageBackendKind;
use storage::{FileBackend, MemoryBackend, StorageBackend};
use tracing::info;

/// Application state shared across all tabs of one profile
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub profile: Profile,
}

impl AppState {
    pub fn new(config: Settings) -> Result<Self> {
        let backend: Arc<dyn StorageBackend> = match config.storage.backend {
            StorageBackendKind::Memory => Arc::new(MemoryBackend::new()),
            StorageBackendKind::File => {
                Arc::new(FileBackend::new(config.storage.directory.clone()))
            }
        };
        info!(
            "Opened {:?} profile storage for environment {}",
            config.storage.backend, config.environment
        );

        Ok(Self {
            config: Arc::new(config),
            profile: Profile::new(backend),
        })
    }

    /// Starts a new tab: an initialized store that follows the other tabs.
    pub async fn open_tab(&self) -> Result<Arc<SessionStore>> {
        let store = Arc::new(SessionStore::new(self.profile.open_tab(), &self.config)?);
        store.start().await;
        Ok(store)
    }
}
