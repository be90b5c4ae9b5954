use crate::auth::CredentialHasher;
use crate::directory::models::UserRecord;
use crate::error::{AppError, AuthError, StorageError};
use crate::storage::{PersistedSlot, StorageArea, USERS_KEY};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Entries stay untyped at rest so one unreadable record cannot take the
/// rest of the directory down with it.
pub const USERS: PersistedSlot<Vec<Value>> = PersistedSlot::new(USERS_KEY);

/// The `users` collection of one profile.
///
/// Every write is a read-modify-write of the whole array, taken under the
/// profile write lock. Entries that do not parse as a [`UserRecord`] are
/// skipped by lookups and written back untouched.
#[derive(Clone)]
pub struct UserDirectory {
    area: StorageArea,
}

impl UserDirectory {
    pub fn new(area: StorageArea) -> Self {
        Self { area }
    }

    pub async fn records(&self) -> Result<Vec<UserRecord>, StorageError> {
        Ok(self.entries().await?.iter().filter_map(parse_entry).collect())
    }

    pub async fn contains_email(&self, email: &str) -> Result<bool, StorageError> {
        Ok(self.entries().await?.iter().any(|e| entry_email(e) == Some(email)))
    }

    /// First record whose email matches exactly and whose credential verifies.
    pub async fn find_by_credentials(
        &self,
        email: &str,
        password: &str,
        hasher: &CredentialHasher,
    ) -> Result<Option<UserRecord>, AppError> {
        for record in self.records().await? {
            if record.email() != email {
                continue;
            }
            if verify_record(&record, password, hasher) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Appends `record` unless its email is already taken.
    ///
    /// The check and the append run under the profile write lock, so two tabs
    /// of the same profile cannot both register one email.
    pub async fn insert_unique(&self, record: UserRecord) -> Result<(), AppError> {
        let _lock = self.area.lock_writes().await;
        let mut entries = self.entries().await?;

        if entries.iter().any(|e| entry_email(e) == Some(record.email())) {
            info!("Rejected registration for existing email: {}", record.email());
            return Err(AuthError::DuplicateEmail.into());
        }

        debug!("Adding user {} to directory", record.id());
        entries.push(serde_json::to_value(&record).map_err(StorageError::from)?);
        USERS.store(&self.area, &entries).await?;
        Ok(())
    }

    /// Stamps `last_login` on the record with `id`, replacing its credential
    /// hash when `rehash` is given. Returns the updated record.
    pub async fn record_login(
        &self,
        id: &str,
        at: DateTime<Utc>,
        rehash: Option<String>,
    ) -> Result<Option<UserRecord>, StorageError> {
        let _lock = self.area.lock_writes().await;
        let mut entries = self.entries().await?;

        let found = entries
            .iter_mut()
            .find_map(|e| parse_entry(e).filter(|r| r.id() == id).map(|r| (e, r)));
        let Some((entry, mut record)) = found else {
            warn!("User {} disappeared from directory before login was recorded", id);
            return Ok(None);
        };

        record.account.last_login = at;
        if let Some(hash) = rehash {
            info!("Upgrading legacy credential for user {}", id);
            record.set_password_hash(hash);
        }
        *entry = serde_json::to_value(&record)?;

        USERS.store(&self.area, &entries).await?;
        Ok(Some(record))
    }

    /// Raw entries. A blob that is not a JSON array is discarded.
    async fn entries(&self) -> Result<Vec<Value>, StorageError> {
        Ok(USERS.load_or_reset(&self.area).await?.unwrap_or_default())
    }
}

fn parse_entry(entry: &Value) -> Option<UserRecord> {
    match UserRecord::deserialize(entry) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping unreadable directory entry: {}", e);
            None
        }
    }
}

fn entry_email(entry: &Value) -> Option<&str> {
    entry.get("email").and_then(Value::as_str)
}

fn verify_record(record: &UserRecord, password: &str, hasher: &CredentialHasher) -> bool {
    if let Some(hash) = record.password_hash() {
        return match hasher.verify(password, hash) {
            Ok(matched) => matched,
            Err(e) => {
                warn!("Unreadable credential for user {}: {}", record.id(), e);
                false
            }
        };
    }
    match record.legacy_password() {
        Some(stored) => stored == password,
        None => false,
    }
}
