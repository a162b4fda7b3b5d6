//! Input checks applied before account requests leave the client.
//!
//! The backend validates again; these exist so obviously bad input is
//! reported without a round trip.

use crate::error::CoreError;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Check a new password and its confirmation.
///
/// Both must be present, at least [`MIN_PASSWORD_LENGTH`] characters long
/// and identical.
pub fn validate_new_password(new_password: &str, confirmation: &str) -> Result<(), CoreError> {
    if new_password.is_empty() || confirmation.is_empty() {
        return Err(CoreError::Validation(
            "Please fill in both password fields".into(),
        ));
    }

    if new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }

    if new_password != confirmation {
        return Err(CoreError::Validation("Passwords do not match".into()));
    }

    Ok(())
}

/// Check that an e-mail address was supplied.
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(CoreError::Validation(
            "Please enter your e-mail address".into(),
        ));
    }
    if !email.contains('@') {
        return Err(CoreError::Validation(format!(
            "'{email}' is not a valid e-mail address"
        )));
    }
    Ok(())
}
