use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// A registered account without any credential material.
///
/// This is what the `user` slot persists and what views get to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub account_created: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

/// A directory entry: the account plus its credential.
///
/// Entries written by earlier releases carry a plaintext `password`
/// instead of `passwordHash`; they still verify and get upgraded on the
/// next successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(flatten)]
    pub account: Session,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_hash: Option<String>,
    #[serde(default, rename = "password", skip_serializing_if = "Option::is_none")]
    legacy_password: Option<String>,
}

impl UserRecord {
    pub fn new(profile: &RegistrationProfile, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            account: Session {
                id: Uuid::new_v4().to_string(),
                name: profile.name.clone(),
                email: profile.email.clone(),
                phone: profile.phone.clone(),
                address: profile.address.clone(),
                role: Role::User,
                account_created: now,
                last_login: now,
            },
            password_hash: Some(password_hash),
            legacy_password: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_legacy_password(account: Session, password: &str) -> Self {
        Self {
            account,
            password_hash: None,
            legacy_password: Some(password.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        &self.account.id
    }

    pub fn email(&self) -> &str {
        &self.account.email
    }

    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }

    pub(crate) fn legacy_password(&self) -> Option<&str> {
        self.legacy_password.as_deref()
    }

    pub fn has_legacy_password(&self) -> bool {
        self.password_hash.is_none() && self.legacy_password.is_some()
    }

    pub fn set_password_hash(&mut self, hash: String) {
        self.password_hash = Some(hash);
        self.legacy_password = None;
    }

    pub fn to_session(&self) -> Session {
        self.account.clone()
    }
}

/// Fields a new account is registered with.
#[derive(Clone, Deserialize)]
pub struct RegistrationProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub password: String,
}

impl fmt::Debug for RegistrationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationProfile")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("address", &self.address)
            .field("password", &"<redacted>")
            .finish()
    }
}
