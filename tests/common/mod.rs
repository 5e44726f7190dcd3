#![allow(dead_code)] // Each test binary only uses part of the harness.

use url::Url;
use std::sync::Arc;
use parking_lot::Mutex;
use serde_json::Value;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use recovery::{PasswordResetService, ResetSettings};
use recovery::db::{CredentialStore, TokenStore, memory::{MemoryCredentialStore, MemoryTokenStore}};
use recovery::model::{algorithm::{PasswordAlgorithm, bcrypt::BCryptPolicy}, token::{ResetToken, TokenDigest}, user::User};
use recovery::notify::NotificationGateway;
use recovery::utils::{errors::{ErrorCode, RecoveryError}, token_codec::TokenCodec, urls::{AppUrls, TOKEN_PARAM}};

pub const ALICE_ID: &str = "6b1f3a52-2f0e-4d5a-9a51-3c1d1c0e7a11";
pub const ALICE_EMAIL: &str = "alice@example.com";
pub const ALICE_OLD_PASSWORD: &str = "0ldPassw0rd!";
pub const RESET_BASE: &str = "https://tickets.example.com";
pub const RESET_PATH: &str = "/auth/reset-password";

///
/// A fixed start time so tests can step forward from it.
///
pub fn t0() -> DateTime<Utc> {
    Utc.ymd(2024, 3, 1).and_hms(9, 0, 0)
}

///
/// A mail the service asked to be sent.
///
#[derive(Clone, Debug)]
pub struct SentMail {
    pub to: String,
    pub subject_key: String,
    pub template_name: String,
    pub variables: Value,
    pub locale: String,
}

impl SentMail {
    pub fn reset_url(&self) -> Option<String> {
        self.variables["resetUrl"].as_str().map(str::to_string)
    }

    ///
    /// Pull the raw token back out of the link - what the user's browser would do.
    ///
    pub fn raw_token(&self) -> Option<String> {
        let url = Url::parse(&self.reset_url()?).ok()?;
        let token = url.query_pairs()
            .find(|(key, _)| key == TOKEN_PARAM)
            .map(|(_, value)| value.into_owned());
        token
    }
}

///
/// Captures every send. Can be told to fail.
///
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
}

impl RecordingGateway {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<SentMail> {
        self.sent.lock().last().cloned()
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn send_template(
        &self,
        to: &str,
        subject_key: &str,
        template_name: &str,
        variables: &Value,
        locale: &str) -> Result<(), RecoveryError> {

        if self.failing.load(Ordering::SeqCst) {
            return Err(ErrorCode::NotificationFailed.with_msg("The mail relay is down"))
        }

        self.sent.lock().push(SentMail {
            to: to.to_string(),
            subject_key: subject_key.to_string(),
            template_name: template_name.to_string(),
            variables: variables.clone(),
            locale: locale.to_string(),
        });
        Ok(())
    }
}

///
/// The in-memory token store, counting writes and able to simulate an outage.
///
#[derive(Default)]
pub struct TestTokenStore {
    pub inner: MemoryTokenStore,
    saves: AtomicUsize,
    down: AtomicBool,
    claims_down: AtomicBool,
}

impl TestTokenStore {
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn go_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    ///
    /// Fail only `mark_used`, so lookups work but the claim can't be written.
    ///
    pub fn fail_claims(&self, failing: bool) {
        self.claims_down.store(failing, Ordering::SeqCst);
    }

    fn check_up(&self) -> Result<(), RecoveryError> {
        match self.down.load(Ordering::SeqCst) {
            true  => Err(ErrorCode::MongoDBError.with_msg("Token storage is unreachable")),
            false => Ok(()),
        }
    }
}

#[async_trait]
impl TokenStore for TestTokenStore {
    async fn save(&self, token: &ResetToken) -> Result<(), RecoveryError> {
        self.check_up()?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(token).await
    }

    async fn find_by_digest(&self, digest: &TokenDigest) -> Result<Option<ResetToken>, RecoveryError> {
        self.check_up()?;
        self.inner.find_by_digest(digest).await
    }

    async fn invalidate_all_live_for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64, RecoveryError> {
        self.check_up()?;
        self.inner.invalidate_all_live_for_user(user_id, now).await
    }

    async fn replace_live_for_user(&self, token: &ResetToken, now: DateTime<Utc>) -> Result<(), RecoveryError> {
        self.check_up()?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.replace_live_for_user(token, now).await
    }

    async fn mark_used(&self, token_id: &str, now: DateTime<Utc>) -> Result<bool, RecoveryError> {
        self.check_up()?;
        if self.claims_down.load(Ordering::SeqCst) {
            return Err(ErrorCode::MongoDBError.with_msg("Token claim write timed out"))
        }
        self.inner.mark_used(token_id, now).await
    }

    async fn purge_inert(&self, now: DateTime<Utc>) -> Result<u64, RecoveryError> {
        self.check_up()?;
        self.inner.purge_inert(now).await
    }
}

///
/// The in-memory credential store, counting updates and able to refuse them.
///
#[derive(Default)]
pub struct TestCredentialStore {
    pub inner: MemoryCredentialStore,
    updates: AtomicUsize,
    refuse_updates: AtomicBool,
}

impl TestCredentialStore {
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn refuse_updates(&self, refuse: bool) {
        self.refuse_updates.store(refuse, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialStore for TestCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RecoveryError> {
        self.inner.find_user_by_email(email).await
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, RecoveryError> {
        self.inner.find_user_by_id(user_id).await
    }

    async fn update_credential(&self, user: &User) -> Result<(), RecoveryError> {
        if self.refuse_updates.load(Ordering::SeqCst) {
            return Err(ErrorCode::MongoDBError.with_msg("Users collection is unreachable"))
        }

        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_credential(user).await
    }
}

///
/// Alice's account before any reset, with a password that has to be changed.
///
pub fn alice() -> User {
    User {
        user_id: ALICE_ID.to_string(),
        username: "alice".to_string(),
        email: ALICE_EMAIL.to_string(),
        phc: hasher().hash_into_phc(ALICE_OLD_PASSWORD).expect("unable to hash alice's password"),
        active: true,
        account_non_locked: false,
        last_password_change: Some(t0() - chrono::Duration::days(400)),
        password_expires_at: Some(t0() - chrono::Duration::days(310)),
        failed_login_attempts: 3,
        email_verified: true,
        must_change_password: true,
    }
}

/// Cheap bcrypt for tests - always chose a stronger cost in prod.
pub fn hasher() -> PasswordAlgorithm {
    PasswordAlgorithm::BCrypt(BCryptPolicy { cost: 4 })
}

///
/// A reset service over in-memory stores with alice already registered.
///
pub struct Harness {
    pub tokens: Arc<TestTokenStore>,
    pub credentials: Arc<TestCredentialStore>,
    pub mail: Arc<RecordingGateway>,
    pub service: Arc<PasswordResetService>,
}

impl Harness {
    pub fn new() -> Self {
        let tokens = Arc::new(TestTokenStore::default());
        let credentials = Arc::new(TestCredentialStore::default());
        let mail = Arc::new(RecordingGateway::default());

        credentials.inner.insert(alice());

        let service = Arc::new(PasswordResetService::new(
            TokenCodec,
            tokens.clone(),
            credentials.clone(),
            mail.clone(),
            Arc::new(AppUrls::new(RESET_BASE, RESET_PATH).expect("bad test urls")),
            hasher(),
            ResetSettings::default()));

        Harness { tokens, credentials, mail, service }
    }

    ///
    /// Request a reset for alice and return the raw token from the mailed link.
    ///
    pub async fn request_alice(&self, now: DateTime<Utc>) -> String {
        self.service.request_reset(ALICE_EMAIL, Some("203.0.113.7"), Some("Mozilla/5.0"), now)
            .await
            .expect("request_reset failed");

        self.mail.last()
            .and_then(|mail| mail.raw_token())
            .expect("no reset link was mailed")
    }

    pub fn alice(&self) -> User {
        self.credentials.inner.get(ALICE_ID).expect("alice has gone")
    }

    pub fn alice_tokens(&self) -> Vec<ResetToken> {
        self.tokens.inner.tokens_for_user(ALICE_ID)
    }
}
