use serde::{Deserialize, Serialize};
use crate::utils::errors::{ErrorCode, RecoveryError};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_BYTES: usize = 72; // bcrypt ignores anything longer.

///
/// The "forgot my password" submission.
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ForgotForm {
    pub email: String,
}

impl ForgotForm {
    pub fn validate(&self) -> Result<(), RecoveryError> {
        let email = self.email.trim();

        if email.is_empty() {
            return Err(ErrorCode::EmailNotSpecified.with_msg("An email address is required"))
        }

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(()),
            _ => Err(ErrorCode::InvalidEmail.with_msg("The email address is not valid")),
        }
    }
}

///
/// The "choose a new password" submission, carrying the token from the link.
///
#[derive(Clone, Deserialize, Serialize)]
pub struct ResetForm {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl std::fmt::Debug for ResetForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetForm")
            .field("token", &"[REDACTED]")
            .field("new_password", &"[REDACTED]")
            .field("confirm_password", &"[REDACTED]")
            .finish()
    }
}

///
/// Counts UTF-8 bytes, not characters. bcrypt ignores everything past byte 72.
///
pub fn check_max_bytes(password: &str) -> Result<(), RecoveryError> {
    match password.len() > MAX_PASSWORD_BYTES {
        true  => Err(ErrorCode::PasswordTooLong
            .with_msg(&format!("The password must be at most {} bytes", MAX_PASSWORD_BYTES))),
        false => Ok(()),
    }
}

impl ResetForm {
    pub fn validate(&self) -> Result<(), RecoveryError> {
        if self.token.trim().is_empty() {
            return Err(ErrorCode::TokenNotSpecified.with_msg("The reset link is incomplete"))
        }

        if self.new_password.trim().is_empty() {
            return Err(ErrorCode::PasswordNotSpecified.with_msg("A new password is required"))
        }

        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ErrorCode::PasswordTooShort
                .with_msg(&format!("The password must be at least {} characters", MIN_PASSWORD_LEN)))
        }

        check_max_bytes(&self.new_password)?;

        if self.new_password != self.confirm_password {
            return Err(ErrorCode::PasswordMismatch.with_msg("The passwords do not match"))
        }

        Ok(())
    }
}
