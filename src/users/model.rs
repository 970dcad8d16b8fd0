/// User Records
///
/// The shape of a user as the token core sees it. Records are owned by the
/// persistence collaborator; the token core reads id, email, name and role.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::error::{AppError, ValidationError};

/// Authorization role carried in every token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(ValidationError::InvalidFormat("role".to_string())),
        }
    }
}

/// Stored emails are trimmed and lowercased so lookups match the form
/// sign-in normalises to.
pub fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A stored user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
}

/// Payload for creating a user. The password is plaintext until
/// `into_record` hashes it.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl NewUser {
    /// Hash the password and assign a fresh id.
    ///
    /// # Errors
    /// Returns a validation error if the password fails the strength policy
    pub fn into_record(self) -> Result<UserRecord, AppError> {
        let password_hash = hash_password(&self.password)?;
        Ok(UserRecord {
            id: Uuid::new_v4(),
            email: normalise_email(&self.email),
            password_hash,
            full_name: self.full_name,
            role: self.role.unwrap_or_default(),
        })
    }
}

/// Partial update of a stored user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl UserChanges {
    pub(crate) fn apply(self, record: &mut UserRecord) {
        if let Some(email) = self.email {
            record.email = normalise_email(&email);
        }
        if let Some(full_name) = self.full_name {
            record.full_name = full_name;
        }
        if let Some(password_hash) = self.password_hash {
            record.password_hash = password_hash;
        }
        if let Some(role) = self.role {
            record.role = role;
        }
    }
}
