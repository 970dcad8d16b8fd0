/// Password Hashing and Verification
///
/// bcrypt with a fixed work factor. Verification never fails on mismatch;
/// it answers yes or no.

use bcrypt::{hash, verify};
use lazy_static::lazy_static;

use crate::error::{AppError, ValidationError};

/// Work factor for every hash this crate produces
pub const HASH_COST: u32 = 10;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

lazy_static! {
    // Compared against when the user does not exist, so unknown-email and
    // wrong-password sign-ins cost the same.
    static ref DUMMY_HASH: Option<String> = hash("timing-equaliser-Passw0rd", HASH_COST).ok();
}

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if:
/// - Password fails validation (too short, weak, etc.)
/// - Bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_strength(password)?;

    hash(password, HASH_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a candidate password against a stored bcrypt hash.
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match verify(password, hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be checked");
            false
        }
    }
}

/// Spend the same bcrypt work as a real verification and discard the result.
pub fn verify_against_dummy(password: &str) {
    if let Some(dummy) = DUMMY_HASH.as_ref() {
        let _ = verify(password, dummy);
    }
}

/// Validate password strength requirements
///
/// Requirements:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - At least one digit
/// - At least one lowercase letter
/// - At least one uppercase letter
fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        ));
    }

    // bcrypt only reads 72 bytes; the cap also bounds hashing cost
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        ));
    }

    Ok(())
}
