//! Argon2id credential hashing and verification.
//!
//! Hashes are stored as PHC strings, so the salt and the parameters they were
//! produced with travel with the hash. Verification reads them back from the
//! string, which keeps old hashes valid after the configured cost changes.

use crate::config::AuthConfig;
use crate::error::AppError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| AppError::ConfigError(format!("Invalid Argon2 parameters: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AppError> {
        Self::new(config.argon2_memory_kib, config.argon2_iterations)
    }

    /// Hash with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(hash)?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(1024, 1).expect("valid params")
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("password1").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("password1"));
        assert!(hasher.verify("password1", &hash).unwrap());
        assert!(!hasher.verify("password2", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let hasher = hasher();
        let first = hasher.hash("same-secret").unwrap();
        let second = hasher.hash("same-secret").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_hash_from_other_params_still_verifies() {
        let old = CredentialHasher::new(2048, 2).unwrap();
        let hash = old.hash("password1").unwrap();
        assert!(hasher().verify("password1", &hash).unwrap());
    }

    #[test]
    fn test_garbage_hash_is_error() {
        assert!(hasher().verify("password1", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_invalid_params() {
        let result = CredentialHasher::new(1, 1);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
