//! Persisted collections for the session store.
//!
//! A [`Profile`] is one persisted key/value namespace (the equivalent of a
//! browser profile's local storage). Every tab opens its own [`StorageArea`]
//! on the profile; writes made through one area are announced to the others
//! as [`StorageEvent`]s.

pub mod backend;
mod profile;
mod slot;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use profile::{Profile, StorageArea, StorageEvent, StorageEvents, TabId};
pub use slot::PersistedSlot;

/// Current session, credential stripped.
pub const SESSION_KEY: &str = "user";
/// Registered user directory, credential included.
pub const USERS_KEY: &str = "users";
/// Rolling seven day usage statistics.
pub const STATS_KEY: &str = "authStats";
