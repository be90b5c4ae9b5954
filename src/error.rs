use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

// Implement conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AppError::AuthError(AuthError::HashingError(err.to_string()))
    }
}

impl AppError {
    /// True for failures that come from the caller's input rather than
    /// from storage or the runtime.
    pub fn is_business_failure(&self) -> bool {
        matches!(
            self,
            AppError::AuthError(
                AuthError::InvalidCredentials
                    | AuthError::EmptyCredential
                    | AuthError::DuplicateEmail
            ) | AppError::ValidationError(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email and password are required")]
    EmptyCredential,

    #[error("An account with this email already exists")]
    DuplicateEmail,

    #[error("Credential hashing failed: {0}")]
    HashingError(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Malformed persisted state under '{key}': {reason}")]
    MalformedPersistedState { key: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}
