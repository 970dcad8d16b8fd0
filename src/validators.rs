/// Input validators for sign-in and refresh payloads
///
/// Rejects malformed requests before they reach the token core:
/// 1. DoS Protection: input length limits
/// 2. Email format validation
/// 3. Null-byte and control-character rejection

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_PASSWORD_LENGTH: usize = 128;
// A JWT carrying our claims stays well under this
const MAX_TOKEN_LENGTH: usize = 4096;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates and normalises an email address (trimmed, lowercased)
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    Ok(trimmed.to_lowercase())
}

/// Checks a sign-in password is present and bounded. Strength rules apply
/// only when a password is set, not when one is presented.
pub fn is_present_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_LENGTH));
    }

    if password.contains('\0') {
        return Err(ValidationError::SuspiciousContent("password".to_string()));
    }

    Ok(())
}

/// Checks a presented token is non-empty, bounded, and shaped like a JWT.
pub fn is_well_formed_token(token: &str) -> Result<(), ValidationError> {
    let trimmed = token.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("refresh_token".to_string()));
    }

    if trimmed.len() > MAX_TOKEN_LENGTH {
        return Err(ValidationError::TooLong("refresh_token".to_string(), MAX_TOKEN_LENGTH));
    }

    if trimmed.split('.').count() != 3 {
        return Err(ValidationError::InvalidFormat("refresh_token".to_string()));
    }

    Ok(())
}

/// Detects suspicious patterns in email addresses
fn has_suspicious_email_patterns(email: &str) -> bool {
    // Local part longer than RFC 5321 allows
    if let Some(at_pos) = email.find('@') {
        if email[..at_pos].len() > 64 {
            return true;
        }
    }

    if email.matches('@').count() != 1 {
        return true;
    }

    email.contains('\0')
}
