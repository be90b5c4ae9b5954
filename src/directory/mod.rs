//! User directory for the session store
//!
//! This module holds the registered account records and the
//! operations the session store runs against them.

pub mod models;
pub mod operations;

pub use models::{RegistrationProfile, Role, Session, UserRecord};
pub use operations::UserDirectory;
