use crate::directory::RegistrationProfile;
use crate::error::AppError;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// The registration form as a view collects it.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Checks run before the store is called. The message is meant for
    /// display.
    pub fn validate(&self, min_password_length: usize) -> Result<(), AppError> {
        let required = [
            &self.name,
            &self.email,
            &self.phone,
            &self.password,
            &self.confirm_password,
        ];
        if required.iter().any(|field| field.is_empty()) {
            return Err(AppError::ValidationError(
                "Please fill in all required fields".into(),
            ));
        }

        if self.password != self.confirm_password {
            return Err(AppError::ValidationError("Passwords do not match".into()));
        }

        if self.password.chars().count() < min_password_length {
            return Err(AppError::ValidationError(format!(
                "Password must be at least {} characters long",
                min_password_length
            )));
        }

        if !is_valid_email(&self.email) {
            return Err(AppError::ValidationError(
                "Please enter a valid email address".into(),
            ));
        }

        Ok(())
    }

    pub fn into_profile(self) -> RegistrationProfile {
        RegistrationProfile {
            name: self.name,
            email: self.email,
            phone: Some(self.phone).filter(|p| !p.is_empty()),
            address: Some(self.address).filter(|a| !a.is_empty()),
            password: self.password,
        }
    }
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

/// `local@domain.tld`: no whitespace, a single `@`, and a dot in the domain
/// with text on both sides.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}
