pub mod memory;
pub mod mongo;
pub mod token;
pub mod user;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::model::{token::{ResetToken, TokenDigest}, user::User};
use crate::utils::errors::RecoveryError;

pub mod prelude {
    // Collection names.
    pub const RESET_TOKENS: &str = "ResetTokens";
    pub const USERS:        &str = "Users";

    // Field names.
    pub const ACCOUNT_NON_LOCKED:    &str = "account_non_locked";
    pub const EMAIL:                 &str = "email";
    pub const EXPIRES_AT:            &str = "expires_at";
    pub const FAILED_LOGIN_ATTEMPTS: &str = "failed_login_attempts";
    pub const LAST_PASSWORD_CHANGE:  &str = "last_password_change";
    pub const MUST_CHANGE_PASSWORD:  &str = "must_change_password";
    pub const PASSWORD_EXPIRES_AT:   &str = "password_expires_at";
    pub const PHC:                   &str = "phc";
    pub const TOKEN_DIGEST:          &str = "token_digest";
    pub const TOKEN_ID:              &str = "token_id";
    pub const USED_AT:               &str = "used_at";
    pub const USER_ID:               &str = "user_id";
}

///
/// Persistence for reset tokens. Tokens are only ever found by digest, never by raw value.
///
/// Every error is a storage failure and must be propagated - swallowing one in the
/// invalidate/save sequence would break the one-live-token-per-user rule.
///
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert or replace the token with the same token_id.
    async fn save(&self, token: &ResetToken) -> Result<(), RecoveryError>;

    async fn find_by_digest(&self, digest: &TokenDigest) -> Result<Option<ResetToken>, RecoveryError>;

    /// Mark every unused, unexpired token of the user as used at now. Returns how many were live.
    async fn invalidate_all_live_for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64, RecoveryError>;

    ///
    /// Invalidate the user's live tokens then save token. Stores that can do this atomically
    /// should override it.
    ///
    async fn replace_live_for_user(&self, token: &ResetToken, now: DateTime<Utc>) -> Result<(), RecoveryError> {
        self.invalidate_all_live_for_user(&token.user_id, now).await?;
        self.save(token).await
    }

    ///
    /// Set used_at only if it is still unset. Exactly one caller gets true for a given token.
    ///
    async fn mark_used(&self, token_id: &str, now: DateTime<Utc>) -> Result<bool, RecoveryError>;

    /// Delete tokens that expired at or before now. Returns the number removed.
    async fn purge_inert(&self, now: DateTime<Utc>) -> Result<u64, RecoveryError>;
}

///
/// The admin app's user accounts, as far as password recovery needs them.
///
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Case-insensitive.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RecoveryError>;

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, RecoveryError>;

    /// Persist the credential fields of the user (hash, change/expiry dates, lock-out state).
    async fn update_credential(&self, user: &User) -> Result<(), RecoveryError>;
}
