/// JWT Claims structure
///
/// The payload carried by both access and refresh tokens: who the user is,
/// which class of token this is, and a unique id used as the revocation key.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::users::{Role, UserRecord};

/// Token class. Selects the signing secret and the lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Access,
    Refresh,
}

impl TokenClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenClass::Access => "access",
            TokenClass::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (user id)
    pub sub: Uuid,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub role: Role,
    /// Unique per issued token; the blacklist key
    pub jti: Uuid,
    #[serde(rename = "type")]
    pub token_type: TokenClass,
    /// Issuer
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl TokenClaims {
    /// Claims for `user` with a freshly generated jti.
    pub fn new(user: &UserRecord, token_type: TokenClass, expiry_seconds: i64, issuer: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            jti: Uuid::new_v4(),
            token_type,
            iss: issuer.to_string(),
            iat: now,
            exp: now + expiry_seconds,
        }
    }

    /// Expired once the current second reaches `exp`.
    pub fn is_expired(&self) -> bool {
        self.exp <= chrono::Utc::now().timestamp()
    }

    /// Seconds of validity left, zero once expired.
    pub fn remaining_ttl(&self) -> u64 {
        let now = chrono::Utc::now().timestamp();
        (self.exp - now).max(0) as u64
    }
}
