use std::collections::HashMap;
use parking_lot::Mutex;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use super::{CredentialStore, TokenStore};
use crate::model::{token::{ResetToken, TokenDigest}, user::{normalise_email, User}};
use crate::utils::errors::{ErrorCode, RecoveryError};

///
/// Process-local token store. Every operation runs under one lock, so invalidate-then-save and
/// mark-used are atomic.
///
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, ResetToken>>, // Keyed on token_id.
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }

    /// A copy of every token held for the user.
    pub fn tokens_for_user(&self, user_id: &str) -> Vec<ResetToken> {
        self.tokens.lock()
            .values()
            .filter(|token| token.user_id == user_id)
            .cloned()
            .collect()
    }
}

fn insert(tokens: &mut HashMap<String, ResetToken>, token: &ResetToken) -> Result<(), RecoveryError> {
    let clash = tokens.values()
        .any(|existing| existing.token_digest == token.token_digest && existing.token_id != token.token_id);

    if clash {
        return Err(ErrorCode::DuplicateTokenDigest.with_msg("A reset token with the same digest already exists"))
    }

    tokens.insert(token.token_id.clone(), token.clone());
    Ok(())
}

fn invalidate(tokens: &mut HashMap<String, ResetToken>, user_id: &str, now: DateTime<Utc>) -> u64 {
    let mut count = 0;
    for token in tokens.values_mut().filter(|token| token.user_id == user_id && token.is_live(now)) {
        token.used_at = Some(now);
        count += 1;
    }
    count
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn save(&self, token: &ResetToken) -> Result<(), RecoveryError> {
        insert(&mut self.tokens.lock(), token)
    }

    async fn find_by_digest(&self, digest: &TokenDigest) -> Result<Option<ResetToken>, RecoveryError> {
        Ok(self.tokens.lock()
            .values()
            .find(|token| &token.token_digest == digest)
            .cloned())
    }

    async fn invalidate_all_live_for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64, RecoveryError> {
        Ok(invalidate(&mut self.tokens.lock(), user_id, now))
    }

    async fn replace_live_for_user(&self, token: &ResetToken, now: DateTime<Utc>) -> Result<(), RecoveryError> {
        let mut tokens = self.tokens.lock();
        invalidate(&mut tokens, &token.user_id, now);
        insert(&mut tokens, token)
    }

    async fn mark_used(&self, token_id: &str, now: DateTime<Utc>) -> Result<bool, RecoveryError> {
        let mut tokens = self.tokens.lock();
        match tokens.get_mut(token_id) {
            Some(token) if token.used_at.is_none() => {
                token.used_at = Some(now);
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn purge_inert(&self, now: DateTime<Utc>) -> Result<u64, RecoveryError> {
        let mut tokens = self.tokens.lock();
        let before = tokens.len();
        tokens.retain(|_, token| token.expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}

///
/// Process-local user accounts, keyed on user_id.
///
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<HashMap<String, User>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an account.
    pub fn insert(&self, user: User) {
        self.users.lock().insert(user.user_id.clone(), user);
    }

    pub fn get(&self, user_id: &str) -> Option<User> {
        self.users.lock().get(user_id).cloned()
    }

    pub fn remove(&self, user_id: &str) -> Option<User> {
        self.users.lock().remove(user_id)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RecoveryError> {
        let email = normalise_email(email);
        Ok(self.users.lock()
            .values()
            .find(|user| normalise_email(&user.email) == email)
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, RecoveryError> {
        Ok(self.get(user_id))
    }

    async fn update_credential(&self, user: &User) -> Result<(), RecoveryError> {
        let mut users = self.users.lock();
        match users.get_mut(&user.user_id) {
            Some(existing) => {
                existing.phc = user.phc.clone();
                existing.last_password_change = user.last_password_change;
                existing.password_expires_at = user.password_expires_at;
                existing.must_change_password = user.must_change_password;
                existing.failed_login_attempts = user.failed_login_attempts;
                existing.account_non_locked = user.account_non_locked;
                Ok(())
            },
            None => Err(ErrorCode::CredentialUpdateFailed.with_msg(&format!("User {} no longer exists", user.user_id))),
        }
    }
}
