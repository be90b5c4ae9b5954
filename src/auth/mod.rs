//! Authentication module for the storefront
//!
//! This module handles sign-up, sign-in, credential hashing
//! and the per-tab session state.

mod password;
mod service;
mod validation;

pub use password::CredentialHasher;
pub use service::{SessionStore, SESSION};
pub use validation::{is_valid_email, RegistrationForm};
